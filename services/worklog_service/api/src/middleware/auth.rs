//! The request gate
//!
//! Every authenticated route passes through here: bearer extraction,
//! signature and expiry verification, token-type check, revocation-ledger
//! membership, the password-change invalidation boundary, and the principal
//! load. The resulting `Principal` rides the request extensions into the
//! handler.

use crate::extractors::bearer_token;
use crate::state::AppState;
use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use shared_error::AppError;
use shared_jwt::{decode_jwt, Claims, TokenType};
use worklog_service_core::domains::auth::domain::authorization::Principal;

/// Gate for application routes: ACCESS tokens only.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&state, request, next, &[TokenType::Access]).await
}

/// Gate for the CI hook: a SERVICE_ACCOUNT credential or a regular ACCESS
/// token, verified identically otherwise.
pub async fn require_auth_or_service(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&state, request, next, &[TokenType::Access, TokenType::ServiceAccount]).await
}

async fn authenticate(
    state: &AppState,
    mut request: Request,
    next: Next,
    allowed_types: &[TokenType],
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    // Signature first, then expiry; both collapse into 401.
    let claims: Claims = decode_jwt(token, &state.jwt_secret)?;

    if !allowed_types.contains(&claims.token_type) {
        tracing::debug!(username = %claims.sub, token_type = %claims.token_type, "Rejected token type");
        return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
    }

    // Revocation is absolute: a ledgered jti never passes, whatever else holds.
    if state.revoked_tokens.is_revoked(claims.jti).await? {
        tracing::debug!(username = %claims.sub, jti = %claims.jti, "Rejected revoked token");
        return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
    }

    let user = state
        .user_repo
        .find_by_username(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid or expired token".to_string()))?;

    if !user.can_authenticate() {
        tracing::debug!(username = %user.username, "Rejected token for disabled or locked account");
        return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
    }

    // Tokens issued before the user's last password change are dead.
    if let Some(boundary) = user.tokens_invalid_before {
        if claims.issued_at() < boundary {
            tracing::debug!(username = %user.username, "Rejected token predating password change");
            return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
        }
    }

    let role = state
        .role_repo
        .find_by_id(user.role_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Unknown role id {}", user.role_id)))?;

    request.extensions_mut().insert(Principal {
        user_id: user.id,
        username: user.username,
        role_id: role.id,
        role_name: role.name,
    });

    Ok(next.run(request).await)
}
