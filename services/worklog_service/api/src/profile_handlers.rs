use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{extract::State, Json};
use shared_error::AppError;
use validator::Validate;
use worklog_service_core::domains::auth::domain::model::{ProfileUpdate, User};
use worklog_service_core::domains::auth::dto::auth_dto::{ErrorResp, UpdateProfileReq, UserInfo};

fn user_info(user: User, role_name: &str) -> UserInfo {
    UserInfo {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        company: user.company,
        role: role_name.to_string(),
        enabled: user.enabled,
        locked: user.locked,
        password_expires_at: user.password_expires_at,
        force_password_change: user.force_password_change,
    }
}

/// The caller's own account
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profile",
    operation_id = "get_profile",
    responses(
        (status = 200, description = "The caller's profile", body = UserInfo),
        (status = 401, description = "Unauthenticated", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<UserInfo>, AppError> {
    let user = state
        .user_repo
        .find_by_username(&principal.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user_info(user, &principal.role_name)))
}

/// Update the caller's profile fields
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "profile",
    operation_id = "update_profile",
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Updated profile", body = UserInfo),
        (status = 400, description = "Invalid input", body = ErrorResp),
        (status = 401, description = "Unauthenticated", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<UpdateProfileReq>,
) -> Result<Json<UserInfo>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let update = ProfileUpdate {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        company: payload.company,
    };

    let user = state.user_repo.update_profile(principal.user_id, &update).await?;
    Ok(Json(user_info(user, &principal.role_name)))
}
