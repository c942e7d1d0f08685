use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Consecutive failed logins before the account locks. The fifth failure in
/// succession sets `locked`; only an administrator clears it.
pub const MAX_FAILED_LOGINS: i32 = 5;

/// Password validity window. `password_expires_at` is always derived as
/// `password_last_changed + PASSWORD_VALIDITY_DAYS` inside the change-password
/// unit of work, never recomputed elsewhere.
pub const PASSWORD_VALIDITY_DAYS: i64 = 90;

/// Most-recent password hashes retained per user; reuse within this window is
/// rejected by the policy engine.
pub const PASSWORD_HISTORY_LIMIT: i64 = 5;

/// Well-known role names seeded at bootstrap
pub mod roles {
    pub const GUEST: &str = "GUEST";
    pub const USER: &str = "USER";
    pub const ADMIN: &str = "ADMIN";
    pub const EXPENSE_ADMIN: &str = "EXPENSE_ADMIN";
    pub const JENKINS_SERVICE: &str = "JENKINS_SERVICE";
}

/// User entity (domain model)
///
/// Mapped directly to the `users` table. The plaintext password never exists
/// outside the login/change-password request scope and never appears in logs.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub password_hash: String,
    pub role_id: i64,
    pub enabled: bool,
    pub locked: bool,
    pub failed_login_count: i32,
    pub password_last_changed: DateTime<Utc>,
    pub password_expires_at: DateTime<Utc>,
    pub force_password_change: bool,
    /// Tokens issued before this instant are treated as revoked. Stamped by
    /// every password change; the request gate compares it against `iat`.
    pub tokens_invalid_before: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Disabled or locked users cannot authenticate, full stop.
    pub fn can_authenticate(&self) -> bool {
        self.enabled && !self.locked
    }

    pub fn password_expired(&self, now: DateTime<Utc>) -> bool {
        self.password_expires_at <= now
    }

    /// Whole days until the password expires; negative once expired.
    pub fn days_until_password_expires(&self, now: DateTime<Utc>) -> i64 {
        (self.password_expires_at.date_naive() - now.date_naive()).num_days()
    }
}

/// Fields for creating a user; the surrogate id and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub password_hash: String,
    pub role_id: i64,
    pub force_password_change: bool,
    pub password_expires_at: DateTime<Utc>,
}

impl NewUser {
    pub fn expires_from(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(PASSWORD_VALIDITY_DAYS)
    }
}

/// Mutable profile fields; identity and security state are excluded on purpose.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

/// Role entity. Reference data: created by seed, read everywhere.
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Permission entity. `(resource, action)` is unique; rows exist only via seed.
#[derive(Debug, Clone, FromRow)]
pub struct Permission {
    pub id: i64,
    pub resource: String,
    pub action: String,
}

/// One retained password hash
#[derive(Debug, Clone, FromRow)]
pub struct PasswordHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub password_hash: String,
    pub changed_at: DateTime<Utc>,
}

/// Revocation ledger row. Rows with `expires_at < now` are eligible for GC;
/// the token they name is already naturally expired.
#[derive(Debug, Clone, FromRow)]
pub struct RevokedToken {
    pub id: i64,
    pub jti: Uuid,
    pub username: String,
    pub revoked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(enabled: bool, locked: bool, expires_in_days: i64) -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            first_name: None,
            last_name: None,
            company: None,
            password_hash: "$2b$12$hash".to_string(),
            role_id: 2,
            enabled,
            locked,
            failed_login_count: 0,
            password_last_changed: now - Duration::days(PASSWORD_VALIDITY_DAYS - expires_in_days),
            password_expires_at: now + Duration::days(expires_in_days),
            force_password_change: false,
            tokens_invalid_before: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_authenticate() {
        assert!(user(true, false, 30).can_authenticate());
        assert!(!user(false, false, 30).can_authenticate());
        assert!(!user(true, true, 30).can_authenticate());
    }

    #[test]
    fn test_password_expiry() {
        let now = Utc::now();
        assert!(!user(true, false, 30).password_expired(now));
        assert!(user(true, false, -1).password_expired(now));
        assert_eq!(user(true, false, 7).days_until_password_expires(now), 7);
        assert!(user(true, false, -1).days_until_password_expires(now) < 0);
    }
}
