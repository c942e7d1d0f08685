use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use worklog_service_core::domains::auth::dto::admin_dto::*;
use worklog_service_core::domains::auth::dto::auth_dto::*;
use worklog_service_core::domains::expense::domain::model::ExpenseStatus;
use worklog_service_core::domains::expense::dto::expense_dto::*;

/// OpenAPI documentation for the Worklog security core
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_check,
        crate::handlers::login,
        crate::handlers::refresh_token,
        crate::handlers::logout,
        crate::handlers::change_password,
        // Profile
        crate::profile_handlers::get_profile,
        crate::profile_handlers::update_profile,
        // Expense CRUD
        crate::expense_handlers::create_expense,
        crate::expense_handlers::list_expenses,
        crate::expense_handlers::get_expense,
        crate::expense_handlers::update_expense,
        crate::expense_handlers::delete_expense,
        // Workflow transitions
        crate::expense_handlers::submit_expense,
        crate::expense_handlers::approve_expense,
        crate::expense_handlers::reject_expense,
        crate::expense_handlers::resubmit_expense,
        crate::expense_handlers::reimburse_expense,
        // Receipts
        crate::expense_handlers::attach_receipt,
        crate::expense_handlers::get_receipt,
        // Admin surface
        crate::admin_handlers::create_user,
        crate::admin_handlers::unlock_user,
        crate::admin_handlers::mint_service_token,
        crate::admin_handlers::revoke_token,
        crate::admin_handlers::trigger_expiration_scan,
        // CI hook
        crate::jenkins_handlers::notify,
    ),
    components(
        schemas(
            HealthResp,
            ErrorResp,
            LoginReq,
            RefreshReq,
            LogoutReq,
            ChangePasswordReq,
            UpdateProfileReq,
            AuthResp,
            UserInfo,
            CreateUserReq,
            ServiceTokenReq,
            ServiceTokenResp,
            RevokeTokenReq,
            JenkinsNotifyReq,
            CreateExpenseReq,
            UpdateExpenseReq,
            RejectExpenseReq,
            ExpenseResp,
            ExpenseStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Authentication and session lifetime"),
        (name = "profile", description = "Self-service account profile"),
        (name = "expenses", description = "Expense records"),
        (name = "workflow", description = "Expense approval workflow"),
        (name = "admin", description = "Administrator operations"),
        (name = "jenkins", description = "CI notification hook"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
