use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use shared_error::AppError;
use validator::Validate;
use worklog_service_core::domains::auth::domain::authorization::{actions, resources, PermissionCode};
use worklog_service_core::domains::auth::dto::admin_dto::{
    CreateUserReq, RevokeTokenReq, ServiceTokenReq, ServiceTokenResp,
};
use worklog_service_core::domains::auth::dto::auth_dto::{ErrorResp, UserInfo};
use worklog_service_infra::scheduler::run_expiration_scan;

/// Create a user with an assigned role and provisional password
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    operation_id = "admin_create_user",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Invalid input", body = ErrorResp),
        (status = 403, description = "Missing USER:ADMIN", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<CreateUserReq>,
) -> Result<(StatusCode, Json<UserInfo>), AppError> {
    state
        .authorizer
        .require_permission(&principal, &PermissionCode::new(resources::USER, actions::ADMIN))
        .await?;

    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let created = state.admin_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Clear a lockout; the only path out of a locked account
#[utoipa::path(
    post,
    path = "/api/admin/users/{username}/unlock",
    tag = "admin",
    operation_id = "admin_unlock_user",
    params(("username" = String, Path, description = "Account to unlock")),
    responses(
        (status = 204, description = "Account unlocked"),
        (status = 403, description = "Missing USER:ADMIN", body = ErrorResp),
        (status = 404, description = "No such user", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn unlock_user(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(username): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .authorizer
        .require_permission(&principal, &PermissionCode::new(resources::USER, actions::ADMIN))
        .await?;

    state.admin_service.unlock_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mint a long-lived SERVICE_ACCOUNT token for a CI integration
#[utoipa::path(
    post,
    path = "/api/admin/tokens/service",
    tag = "admin",
    operation_id = "admin_mint_service_token",
    request_body = ServiceTokenReq,
    responses(
        (status = 200, description = "Token minted", body = ServiceTokenResp),
        (status = 403, description = "Missing USER:ADMIN", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn mint_service_token(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<ServiceTokenReq>,
) -> Result<Json<ServiceTokenResp>, AppError> {
    state
        .authorizer
        .require_permission(&principal, &PermissionCode::new(resources::USER, actions::ADMIN))
        .await?;

    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let resp = state.admin_service.mint_service_token(payload).await?;
    Ok(Json(resp))
}

/// Revoke a presented token ahead of its natural expiry
#[utoipa::path(
    post,
    path = "/api/admin/tokens/revoke",
    tag = "admin",
    operation_id = "admin_revoke_token",
    request_body = RevokeTokenReq,
    responses(
        (status = 204, description = "Token revoked"),
        (status = 403, description = "Missing USER:ADMIN", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn revoke_token(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<RevokeTokenReq>,
) -> Result<StatusCode, AppError> {
    state
        .authorizer
        .require_permission(&principal, &PermissionCode::new(resources::USER, actions::ADMIN))
        .await?;

    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    state.admin_service.revoke_token(&payload.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Manually trigger the password-expiration scan.
/// Safe to run any number of times per day.
#[utoipa::path(
    post,
    path = "/api/admin/jobs/password-expiration-scan",
    tag = "admin",
    operation_id = "admin_run_expiration_scan",
    responses(
        (status = 200, description = "Scan completed"),
        (status = 403, description = "Missing USER:ADMIN", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn trigger_expiration_scan(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .authorizer
        .require_permission(&principal, &PermissionCode::new(resources::USER, actions::ADMIN))
        .await?;

    let emitted = run_expiration_scan(state.user_repo.as_ref(), state.notifier.as_ref()).await?;
    Ok(Json(json!({ "emitted": emitted })))
}
