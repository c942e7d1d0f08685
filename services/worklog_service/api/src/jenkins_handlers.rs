use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use shared_error::AppError;
use validator::Validate;
use worklog_service_core::domains::auth::domain::authorization::{actions, resources, PermissionCode};
use worklog_service_core::domains::auth::dto::admin_dto::JenkinsNotifyReq;
use worklog_service_core::domains::auth::dto::auth_dto::ErrorResp;
use worklog_service_core::events::NotificationEvent;

/// CI notification hook.
///
/// Accepts SERVICE_ACCOUNT tokens; the JENKINS:NOTIFY permission is the only
/// thing those credentials can reach.
#[utoipa::path(
    post,
    path = "/api/jenkins/notify",
    tag = "jenkins",
    operation_id = "jenkins_notify",
    request_body = JenkinsNotifyReq,
    responses(
        (status = 202, description = "Event accepted for dispatch"),
        (status = 400, description = "Unknown event family", body = ErrorResp),
        (status = 403, description = "Missing JENKINS:NOTIFY", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn notify(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<JenkinsNotifyReq>,
) -> Result<StatusCode, AppError> {
    state
        .authorizer
        .require_permission(&principal, &PermissionCode::new(resources::JENKINS, actions::NOTIFY))
        .await?;

    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let event = match payload.event.as_str() {
        "build" => NotificationEvent::JenkinsBuild {
            job: payload.job,
            status: payload.status,
            url: payload.url,
        },
        "deploy" => NotificationEvent::JenkinsDeploy {
            job: payload.job,
            status: payload.status,
            url: payload.url,
        },
        other => {
            return Err(AppError::InvalidInput(format!(
                "Unknown event family: {}",
                other
            )));
        },
    };

    if let Err(e) = state.notifier.notify(event).await {
        tracing::error!(error = %e, "Failed to dispatch CI notification");
    }

    Ok(StatusCode::ACCEPTED)
}
