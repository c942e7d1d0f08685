use super::model::{NewUser, ProfileUpdate, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_error::AppError;
use uuid::Uuid;

/// Credential store: users, lockout counters, expiration stamps.
///
/// Implementations own every write to the `users` table. `change_password`
/// is a single unit of work: hash swap, expiration stamps, token-invalidation
/// stamp, history append, and history pruning commit or roll back together.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn create(&self, user: &NewUser) -> Result<User, AppError>;

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, AppError>;

    /// Swap the password hash and every derived stamp atomically.
    /// Appends the new hash to history and prunes to the retention limit.
    async fn change_password(&self, id: i64, new_hash: &str) -> Result<User, AppError>;

    /// Record one failed login. Returns true when this failure locked the
    /// account (threshold reached).
    async fn record_failed_login(&self, id: i64) -> Result<bool, AppError>;

    /// Any successful authentication resets the counter.
    async fn reset_failed_login_count(&self, id: i64) -> Result<(), AppError>;

    /// Administrator-initiated unlock; also clears the counter.
    async fn unlock(&self, id: i64) -> Result<(), AppError>;

    async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), AppError>;

    /// Users whose password expires inside `[from, to]`, excluding the named
    /// role (GUEST accounts are not warned).
    async fn find_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_role: &str,
    ) -> Result<Vec<User>, AppError>;
}

/// Recent-password history reads; writes happen inside
/// `UserRepository::change_password`.
#[async_trait]
pub trait PasswordHistoryRepository: Send + Sync {
    /// Most recent hashes, newest first, at most `limit`.
    async fn recent_hashes(&self, user_id: i64, limit: i64) -> Result<Vec<String>, AppError>;
}

/// Role lookups. Roles are reference data; mutation happens only in the seed.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError>;
}

/// Revocation ledger: the persistent set of revoked token identifiers.
#[async_trait]
pub trait RevokedTokenRepository: Send + Sync {
    /// Insert a revocation. Idempotent: revoking the same jti twice leaves
    /// exactly one row.
    async fn revoke(
        &self,
        jti: Uuid,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError>;

    /// Drop rows whose natural expiry has passed. Returns the removed count.
    /// Safe to run concurrently with verification.
    async fn delete_expired(&self) -> Result<u64, AppError>;
}
