use super::authorization::Principal;
use crate::domains::auth::dto::admin_dto::{CreateUserReq, ServiceTokenReq, ServiceTokenResp};
use crate::domains::auth::dto::auth_dto::{
    AuthResp, ChangePasswordReq, LoginReq, RefreshReq, UserInfo,
};
use async_trait::async_trait;
use shared_error::AppError;

/// Authentication service contract.
///
/// Orchestrates the policy engine, credential store, token codec and
/// revocation ledger. Public login failures are indistinguishable; the
/// specific cause lands in the server log only.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials and mint a fresh access/refresh pair.
    async fn login(&self, req: LoginReq) -> Result<AuthResp, AppError>;

    /// Rotate the pair: verify the refresh token, revoke its jti, mint anew.
    async fn refresh(&self, req: RefreshReq) -> Result<AuthResp, AppError>;

    /// Idempotent: the token's jti enters the ledger with its natural expiry.
    async fn logout(&self, token: &str) -> Result<(), AppError>;

    /// Authenticated password change; invalidates every outstanding token of
    /// the user on success.
    async fn change_password(
        &self,
        principal: &Principal,
        req: ChangePasswordReq,
    ) -> Result<(), AppError>;
}

/// Administrator operations on accounts and tokens.
#[async_trait]
pub trait AdminService: Send + Sync {
    async fn create_user(&self, req: CreateUserReq) -> Result<UserInfo, AppError>;

    /// Clear the lock and the failure counter.
    async fn unlock_user(&self, username: &str) -> Result<(), AppError>;

    /// Mint a long-lived SERVICE_ACCOUNT token for CI integrations.
    async fn mint_service_token(&self, req: ServiceTokenReq) -> Result<ServiceTokenResp, AppError>;

    /// Administrator-initiated revocation of a presented token.
    async fn revoke_token(&self, token: &str) -> Result<(), AppError>;
}
