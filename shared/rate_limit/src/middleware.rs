//! Axum layer applying the auth-endpoint token bucket

use crate::limiter::{KeyGenerator, RateLimiter};
use crate::memory_limiter::InMemoryRateLimiter;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use shared_jwt::JwtSecret;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};
use tracing::{info, warn};

/// Authentication-family endpoints subject to the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEndpoint {
    Login,
    Refresh,
    ChangePassword,
}

impl AuthEndpoint {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Login => "rate_limit:login:ip",
            Self::Refresh => "rate_limit:refresh:ip",
            Self::ChangePassword => "rate_limit:change_password:user",
        }
    }

    /// Change-password runs on an authenticated channel and buckets per user;
    /// the unauthenticated endpoints bucket per remote address.
    pub fn is_username_based(&self) -> bool {
        matches!(self, Self::ChangePassword)
    }
}

/// Shared limiter state handed to every auth-route layer
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<dyn RateLimiter>,
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitState {
    pub fn new(enabled: bool, max_requests: u32, window: Duration) -> Self {
        Self {
            limiter: Arc::new(InMemoryRateLimiter::new()),
            enabled,
            max_requests,
            window,
        }
    }

    pub fn with_limiter(
        limiter: Arc<dyn RateLimiter>,
        enabled: bool,
        max_requests: u32,
        window: Duration,
    ) -> Self {
        Self {
            limiter,
            enabled,
            max_requests,
            window,
        }
    }
}

/// Layer applying the bucket for one endpoint
#[derive(Clone)]
pub struct RateLimitLayer {
    state: RateLimitState,
    endpoint: AuthEndpoint,
    /// Needed to resolve the username for user-based buckets
    jwt_secret: Option<JwtSecret>,
}

impl RateLimitLayer {
    pub fn new(state: RateLimitState, endpoint: AuthEndpoint) -> Self {
        Self {
            state,
            endpoint,
            jwt_secret: None,
        }
    }

    pub fn with_jwt_secret(
        state: RateLimitState,
        endpoint: AuthEndpoint,
        jwt_secret: JwtSecret,
    ) -> Self {
        Self {
            state,
            endpoint,
            jwt_secret: Some(jwt_secret),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            state: self.state.clone(),
            endpoint: self.endpoint,
            jwt_secret: self.jwt_secret.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    state: RateLimitState,
    endpoint: AuthEndpoint,
    jwt_secret: Option<JwtSecret>,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let endpoint = self.endpoint;
        let jwt_secret = self.jwt_secret.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !state.enabled {
                return inner.call(req).await;
            }

            let ip = remote_ip(&req);
            let key = if endpoint.is_username_based() {
                match bearer_username(&req, jwt_secret.as_ref()) {
                    Some(username) => KeyGenerator::username_key(endpoint.key_prefix(), &username),
                    // Unauthenticated callers still get bucketed, per source
                    None => KeyGenerator::ip_key(endpoint.key_prefix(), &ip),
                }
            } else {
                KeyGenerator::ip_key(endpoint.key_prefix(), &ip)
            };

            match state.limiter.check_rate_limit(&key, state.max_requests, state.window).await {
                Ok(result) if result.allowed => inner.call(req).await,
                Ok(result) => {
                    info!(
                        endpoint = ?endpoint,
                        limit = result.limit,
                        "Auth endpoint rate limit exceeded"
                    );
                    Ok(too_many_requests(result.retry_after))
                },
                Err(e) => {
                    // Fail open: availability of login beats a broken limiter
                    warn!("Rate limit check failed: {}. Allowing request.", e);
                    inner.call(req).await
                },
            }
        })
    }
}

fn bearer_username<B>(req: &Request<B>, jwt_secret: Option<&JwtSecret>) -> Option<String> {
    let secret = jwt_secret?;
    let token = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    shared_jwt::decode_jwt(token, secret).ok().map(|claims| claims.sub)
}

fn remote_ip<B>(req: &Request<B>) -> String {
    // X-Forwarded-For carries "client, proxy1, proxy2"; the leftmost entry is
    // the original client when the service sits behind the platform proxy.
    if let Some(xff) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = xff.to_str() {
            if let Some(client) = value.split(',').next() {
                let client = client.trim();
                if !client.is_empty() {
                    return client.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            return value.trim().to_string();
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

fn too_many_requests(retry_after: u64) -> Response<Body> {
    let body = serde_json::json!({
        "error": "RATE_LIMITED",
        "message": format!("Too many requests. Retry after {} seconds.", retry_after),
    });

    let mut response = Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default();

    if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, v);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_key_prefixes() {
        assert_eq!(AuthEndpoint::Login.key_prefix(), "rate_limit:login:ip");
        assert_eq!(AuthEndpoint::Refresh.key_prefix(), "rate_limit:refresh:ip");
        assert_eq!(
            AuthEndpoint::ChangePassword.key_prefix(),
            "rate_limit:change_password:user"
        );
    }

    #[test]
    fn test_endpoint_scopes() {
        assert!(!AuthEndpoint::Login.is_username_based());
        assert!(!AuthEndpoint::Refresh.is_username_based());
        assert!(AuthEndpoint::ChangePassword.is_username_based());
    }

    #[test]
    fn test_remote_ip_prefers_forwarded_for() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.1, 198.51.100.7")
            .header("x-real-ip", "198.51.100.7")
            .body(())
            .unwrap();
        assert_eq!(remote_ip(&req), "203.0.113.1");
    }

    #[test]
    fn test_remote_ip_unknown_without_headers() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(remote_ip(&req), "unknown");
    }

    #[tokio::test]
    async fn test_disabled_state_constructs() {
        let state = RateLimitState::new(false, 5, Duration::from_secs(60));
        assert!(!state.enabled);
        assert_eq!(state.max_requests, 5);
    }
}
