//! Bootstrap & startup invariants
//!
//! Brings the process into a valid state before it accepts requests: verifies
//! the mandatory secrets, reconciles the role/permission seed manifest, and
//! provisions the initial administrator. A failed invariant aborts startup.

use chrono::Utc;
use shared_config::Config;
use shared_error::AppError;
use shared_jwt::JwtSecret;
use sqlx::PgPool;
use worklog_service_core::domains::auth::domain::model::{roles, NewUser};

/// Roles seeded at startup
pub const SEED_ROLES: &[(&str, &str)] = &[
    (roles::GUEST, "Read-only visitor account"),
    (roles::USER, "Standard employee account"),
    (roles::ADMIN, "Administrator holding every permission"),
    (roles::EXPENSE_ADMIN, "Expense approver"),
    (roles::JENKINS_SERVICE, "CI service account"),
];

/// Permissions seeded at startup. Reference data: application code never
/// creates permission rows.
pub const SEED_PERMISSIONS: &[(&str, &str)] = &[
    ("EXPENSE", "CREATE"),
    ("EXPENSE", "READ"),
    ("EXPENSE", "UPDATE"),
    ("EXPENSE", "DELETE"),
    ("EXPENSE", "APPROVE"),
    ("EXPENSE", "ADMIN"),
    ("TASK", "CREATE"),
    ("TASK", "READ"),
    ("TASK", "UPDATE"),
    ("TASK", "DELETE"),
    ("TASK", "ADMIN"),
    ("USER", "CREATE"),
    ("USER", "READ"),
    ("USER", "UPDATE"),
    ("USER", "DELETE"),
    ("USER", "ADMIN"),
    ("JENKINS", "NOTIFY"),
];

/// The permission grant for one role
pub fn role_grants(role: &str) -> Vec<(&'static str, &'static str)> {
    match role {
        // ADMIN holds every permission, by convention
        roles::ADMIN => SEED_PERMISSIONS.to_vec(),
        roles::EXPENSE_ADMIN => vec![
            ("EXPENSE", "READ"),
            ("EXPENSE", "APPROVE"),
            ("EXPENSE", "ADMIN"),
            ("TASK", "READ"),
        ],
        roles::USER => vec![
            ("EXPENSE", "CREATE"),
            ("EXPENSE", "READ"),
            ("EXPENSE", "UPDATE"),
            ("EXPENSE", "DELETE"),
            ("TASK", "CREATE"),
            ("TASK", "READ"),
            ("TASK", "UPDATE"),
            ("TASK", "DELETE"),
        ],
        roles::GUEST => vec![("EXPENSE", "READ"), ("TASK", "READ")],
        roles::JENKINS_SERVICE => vec![("JENKINS", "NOTIFY")],
        _ => vec![],
    }
}

/// Validate the startup invariants that must hold before anything else runs.
///
/// Returns the validated signing secret. Any failure here maps to exit
/// code 1 in the binary.
pub fn check_startup_invariants(config: &Config) -> Result<JwtSecret, AppError> {
    let secret = JwtSecret::new(&config.jwt_secret)?;

    if config.admin_bootstrap_password.trim().is_empty() {
        return Err(AppError::Config(
            "ADMIN_BOOTSTRAP_PASSWORD is not set".to_string(),
        ));
    }

    Ok(secret)
}

/// Reconcile reference data and provision the initial administrator.
pub async fn run(pool: &PgPool, admin_bootstrap_password: &str) -> Result<(), AppError> {
    seed_reference_data(pool).await?;
    ensure_admin(pool, admin_bootstrap_password).await?;
    Ok(())
}

/// Insert any roles, permissions and grants missing from the seed manifest.
/// Existing rows are left untouched.
async fn seed_reference_data(pool: &PgPool) -> Result<(), AppError> {
    for (name, description) in SEED_ROLES {
        sqlx::query("INSERT INTO roles (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .bind(description)
            .execute(pool)
            .await?;
    }

    for (resource, action) in SEED_PERMISSIONS {
        sqlx::query(
            "INSERT INTO permissions (resource, action) VALUES ($1, $2) ON CONFLICT (resource, action) DO NOTHING",
        )
        .bind(resource)
        .bind(action)
        .execute(pool)
        .await?;
    }

    for (role, _) in SEED_ROLES {
        for (resource, action) in role_grants(role) {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT r.id, p.id FROM roles r, permissions p
                WHERE r.name = $1 AND p.resource = $2 AND p.action = $3
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role)
            .bind(resource)
            .bind(action)
            .execute(pool)
            .await?;
        }
    }

    tracing::info!("Reference data reconciled with seed manifest");
    Ok(())
}

/// Create the `admin` account when no ADMIN-role user exists.
async fn ensure_admin(pool: &PgPool, admin_bootstrap_password: &str) -> Result<(), AppError> {
    let admin_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE r.name = $1
        )
        "#,
    )
    .bind(roles::ADMIN)
    .fetch_one(pool)
    .await?;

    if admin_exists {
        return Ok(());
    }

    let role_id: i64 = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
        .bind(roles::ADMIN)
        .fetch_one(pool)
        .await?;

    let password_hash = bcrypt::hash(admin_bootstrap_password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash bootstrap password: {}", e)))?;

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (
            username, email, first_name, last_name, company, password_hash,
            role_id, enabled, locked, failed_login_count,
            password_last_changed, password_expires_at, force_password_change,
            tokens_invalid_before, created_at, updated_at
        )
        VALUES ($1, NULL, NULL, NULL, NULL, $2, $3, TRUE, FALSE, 0, $4, $5, TRUE, NULL, $4, $4)
        "#,
    )
    .bind("admin")
    .bind(&password_hash)
    .bind(role_id)
    .bind(now)
    .bind(NewUser::expires_from(now))
    .execute(pool)
    .await?;

    tracing::warn!("Initial administrator provisioned; its password must be changed on first login");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        // Deserialize a minimal config through serde so defaults apply
        serde_json::from_value(serde_json::json!({
            "database_url": "postgres://localhost/worklog",
            "jwt_secret": "unit-test-secret-0123456789abcdef0123456789",
            "admin_bootstrap_password": "Initial-Admin-Pass7!"
        }))
        .unwrap()
    }

    #[test]
    fn test_invariants_pass_with_valid_config() {
        assert!(check_startup_invariants(&base_config()).is_ok());
    }

    #[test]
    fn test_invariants_reject_missing_secret() {
        let mut config = base_config();
        config.jwt_secret = String::new();
        assert!(check_startup_invariants(&config).is_err());
    }

    #[test]
    fn test_invariants_reject_short_secret() {
        let mut config = base_config();
        config.jwt_secret = "short".to_string();
        assert!(check_startup_invariants(&config).is_err());
    }

    #[test]
    fn test_invariants_reject_sentinel_secret() {
        let mut config = base_config();
        config.jwt_secret = "please-change-this-jwt-secret-value".to_string();
        assert!(check_startup_invariants(&config).is_err());
    }

    #[test]
    fn test_invariants_reject_missing_admin_password() {
        let mut config = base_config();
        config.admin_bootstrap_password = "  ".to_string();
        assert!(check_startup_invariants(&config).is_err());
    }

    #[test]
    fn test_admin_role_holds_every_permission() {
        let grants = role_grants(roles::ADMIN);
        for permission in SEED_PERMISSIONS {
            assert!(grants.contains(permission));
        }
    }

    #[test]
    fn test_service_role_is_narrow() {
        assert_eq!(role_grants(roles::JENKINS_SERVICE), vec![("JENKINS", "NOTIFY")]);
    }

    #[test]
    fn test_every_grant_exists_in_seed_permissions() {
        for (role, _) in SEED_ROLES {
            for grant in role_grants(role) {
                assert!(
                    SEED_PERMISSIONS.contains(&grant),
                    "{:?} granted to {} is not seeded",
                    grant,
                    role
                );
            }
        }
    }

    #[test]
    fn test_approve_is_not_granted_to_plain_users() {
        assert!(!role_grants(roles::USER).contains(&("EXPENSE", "APPROVE")));
        assert!(role_grants(roles::EXPENSE_ADMIN).contains(&("EXPENSE", "APPROVE")));
    }
}
