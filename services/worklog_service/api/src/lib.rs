//! HTTP surface of the worklog security core.
//!
//! Routes are registered explicitly here; required permissions are checked
//! at the top of each handler, and the request gate runs as middleware on
//! every authenticated route group.

pub mod admin_handlers;
pub mod expense_handlers;
pub mod extractors;
pub mod handlers;
pub mod jenkins_handlers;
pub mod middleware;
pub mod openapi;
pub mod profile_handlers;
pub mod state;

use axum::{
    error_handling::HandleErrorLayer,
    middleware as axum_middleware,
    routing::{get, post, put},
    BoxError, Router,
};
use shared_error::AppError;
use shared_rate_limit::{AuthEndpoint, RateLimitLayer, RateLimitState};
use state::AppState;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Assemble the full application router.
///
/// Tests build the same router over in-memory doubles; the binary feeds it
/// the Postgres-backed state.
pub fn build_router(
    app_state: AppState,
    rate_limit: RateLimitState,
    request_timeout: Duration,
) -> Router {
    // Unauthenticated auth-family routes, per-remote-address bucket
    let login_routes = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .layer(RateLimitLayer::new(rate_limit.clone(), AuthEndpoint::Login));

    let refresh_routes = Router::new()
        .route("/api/auth/refresh", post(handlers::refresh_token))
        .layer(RateLimitLayer::new(rate_limit.clone(), AuthEndpoint::Refresh));

    // Authenticated channel, per-user bucket
    let change_password_routes = Router::new()
        .route("/api/auth/change-password", post(handlers::change_password))
        .layer(RateLimitLayer::with_jwt_secret(
            rate_limit,
            AuthEndpoint::ChangePassword,
            app_state.jwt_secret.clone(),
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::require_auth,
        ));

    // Application routes: ACCESS tokens only
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(handlers::logout))
        .route(
            "/api/profile",
            get(profile_handlers::get_profile).put(profile_handlers::update_profile),
        )
        .route(
            "/api/expenses",
            post(expense_handlers::create_expense).get(expense_handlers::list_expenses),
        )
        .route(
            "/api/expenses/{id}",
            get(expense_handlers::get_expense)
                .put(expense_handlers::update_expense)
                .delete(expense_handlers::delete_expense),
        )
        .route("/api/expenses/{id}/submit", post(expense_handlers::submit_expense))
        .route("/api/expenses/{id}/approve", post(expense_handlers::approve_expense))
        .route("/api/expenses/{id}/reject", post(expense_handlers::reject_expense))
        .route("/api/expenses/{id}/resubmit", post(expense_handlers::resubmit_expense))
        .route("/api/expenses/{id}/reimburse", post(expense_handlers::reimburse_expense))
        .route(
            "/api/expenses/{id}/receipt",
            put(expense_handlers::attach_receipt).get(expense_handlers::get_receipt),
        )
        .route("/api/admin/users", post(admin_handlers::create_user))
        .route(
            "/api/admin/users/{username}/unlock",
            post(admin_handlers::unlock_user),
        )
        .route("/api/admin/tokens/service", post(admin_handlers::mint_service_token))
        .route("/api/admin/tokens/revoke", post(admin_handlers::revoke_token))
        .route(
            "/api/admin/jobs/password-expiration-scan",
            post(admin_handlers::trigger_expiration_scan),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::require_auth,
        ));

    // CI hook: SERVICE_ACCOUNT credentials are valid here
    let jenkins_routes = Router::new()
        .route("/api/jenkins/notify", post(jenkins_handlers::notify))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::require_auth_or_service,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(login_routes)
        .merge(refresh_routes)
        .merge(change_password_routes)
        .merge(protected_routes)
        .merge(jenkins_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        // The propagated request deadline: when it fires, the in-flight
        // operation is dropped and the request completes with 504.
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|_e: BoxError| async {
                    AppError::DeadlineExceeded
                }))
                .timeout(request_timeout),
        )
}
