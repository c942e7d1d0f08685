use shared_jwt::JwtSecret;
use std::sync::Arc;
use worklog_service_core::domains::auth::domain::{
    authorization::Authorizer,
    repository::{RevokedTokenRepository, RoleRepository, UserRepository},
    service::{AdminService, AuthService},
};
use worklog_service_core::domains::expense::domain::service::ExpenseService;
use worklog_service_core::events::Notifier;

/// Application state carried by every handler and by the request gate.
///
/// Services and repositories sit behind trait objects so tests can assemble
/// the same router over in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub admin_service: Arc<dyn AdminService>,
    pub expense_service: Arc<dyn ExpenseService>,
    pub authorizer: Arc<dyn Authorizer>,
    pub user_repo: Arc<dyn UserRepository>,
    pub role_repo: Arc<dyn RoleRepository>,
    pub revoked_tokens: Arc<dyn RevokedTokenRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub jwt_secret: JwtSecret,
}
