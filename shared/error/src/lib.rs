use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Closed error taxonomy for the security core.
///
/// Every fallible operation in the workspace returns `Result<_, AppError>`.
/// The mapping to HTTP status codes is fixed here and nowhere else.
#[derive(Debug)]
pub enum AppError {
    // Database errors
    Database(sqlx::Error),

    /// No token, bad signature, expired, revoked, or user disabled/locked.
    /// Login failures collapse into this variant with a generic message;
    /// the specific cause is only ever logged server-side.
    Unauthenticated(String),

    /// Authenticated but lacks the required permission, or violates the
    /// owner-or-admin rule on a mutation.
    Forbidden(String),

    /// Validation failure, including itemized password-policy violations.
    InvalidInput(String),

    /// Expense event not legal in the record's current state.
    InvalidTransition(String),

    /// Target entity absent, or hidden from a non-owner non-admin.
    NotFound(String),

    /// Auth-endpoint token bucket exceeded.
    RateLimited { retry_after: u64 },

    /// Request deadline hit before the operation completed.
    DeadlineExceeded,

    /// No database connection available within the deadline.
    ResourceExhausted,

    // Internal errors
    Internal(String),
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::RateLimited { retry_after } => {
                write!(f, "Rate limited, retry after {}s", retry_after)
            },
            AppError::DeadlineExceeded => write!(f, "Deadline exceeded"),
            AppError::ResourceExhausted => write!(f, "Resource exhausted"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// The stable machine-readable kind carried in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            AppError::ResourceExhausted => "RESOURCE_EXHAUSTED",
            AppError::Database(_) | AppError::Internal(_) | AppError::Config(_) => "INTERNAL",
        }
    }

    /// Generic 401 used for every login/verification failure surfaced to clients.
    pub fn invalid_credentials() -> Self {
        AppError::Unauthenticated("Invalid credentials".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            },
            AppError::Unauthenticated(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidInput(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidTransition(ref msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many requests. Retry after {} seconds.", retry_after),
            ),
            AppError::DeadlineExceeded => {
                (StatusCode::GATEWAY_TIMEOUT, "Request deadline exceeded".to_string())
            },
            AppError::ResourceExhausted => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            },
            AppError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            },
        };

        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

// From implementations for common error types
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // A request that cannot obtain a connection within its deadline
            // fails with RESOURCE_EXHAUSTED, not a generic 500.
            sqlx::Error::PoolTimedOut => AppError::ResourceExhausted,
            other => AppError::Database(other),
        }
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(AppError::Unauthenticated("x".into()).kind(), "UNAUTHENTICATED");
        assert_eq!(AppError::Forbidden("x".into()).kind(), "FORBIDDEN");
        assert_eq!(AppError::InvalidInput("x".into()).kind(), "INVALID_INPUT");
        assert_eq!(AppError::InvalidTransition("x".into()).kind(), "INVALID_TRANSITION");
        assert_eq!(AppError::NotFound("x".into()).kind(), "NOT_FOUND");
        assert_eq!(AppError::RateLimited { retry_after: 1 }.kind(), "RATE_LIMITED");
        assert_eq!(AppError::DeadlineExceeded.kind(), "DEADLINE_EXCEEDED");
        assert_eq!(AppError::ResourceExhausted.kind(), "RESOURCE_EXHAUSTED");
        assert_eq!(AppError::Internal("x".into()).kind(), "INTERNAL");
    }

    #[test]
    fn http_mapping() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (AppError::Unauthenticated("no token".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("denied".into()), StatusCode::FORBIDDEN),
            (AppError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::InvalidTransition("no".into()), StatusCode::CONFLICT),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (AppError::RateLimited { retry_after: 30 }, StatusCode::TOO_MANY_REQUESTS),
            (AppError::DeadlineExceeded, StatusCode::GATEWAY_TIMEOUT),
            (AppError::ResourceExhausted, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn pool_timeout_maps_to_resource_exhausted() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), "RESOURCE_EXHAUSTED");
    }

    #[test]
    fn internal_errors_never_leak_detail() {
        let resp = AppError::Internal("secret detail".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
