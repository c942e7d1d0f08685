use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use shared_error::AppError;
use validator::Validate;
use worklog_service_core::domains::auth::dto::auth_dto::{
    AuthResp, ChangePasswordReq, ErrorResp, HealthResp, LoginReq, LogoutReq, RefreshReq,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    operation_id = "health_check",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResp),
    )
)]
pub async fn health_check() -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Verify credentials and mint a token pair
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    operation_id = "login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Login successful", body = AuthResp),
        (status = 401, description = "Invalid credentials", body = ErrorResp),
        (status = 429, description = "Too many login attempts", body = ErrorResp),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginReq>,
) -> Result<Json<AuthResp>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let resp = state.auth_service.login(payload).await?;
    Ok(Json(resp))
}

/// Rotate the token pair using a refresh token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    operation_id = "refresh_token",
    request_body = RefreshReq,
    responses(
        (status = 200, description = "Token pair rotated", body = AuthResp),
        (status = 401, description = "Invalid refresh token", body = ErrorResp),
        (status = 429, description = "Too many attempts", body = ErrorResp),
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshReq>,
) -> Result<Json<AuthResp>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let resp = state.auth_service.refresh(payload).await?;
    Ok(Json(resp))
}

/// Revoke a token. Idempotent: revoking twice is indistinguishable.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    operation_id = "logout",
    request_body = LogoutReq,
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Unauthenticated", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<LogoutReq>,
) -> Result<StatusCode, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    state.auth_service.logout(&payload.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change the caller's password; invalidates every outstanding token
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "auth",
    operation_id = "change_password",
    request_body = ChangePasswordReq,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Policy violation", body = ErrorResp),
        (status = 401, description = "Unauthenticated", body = ErrorResp),
        (status = 403, description = "Self-service change not available", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<ChangePasswordReq>,
) -> Result<StatusCode, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    state.auth_service.change_password(&principal, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
