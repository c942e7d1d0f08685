use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shared_error::AppError;
use sqlx::PgPool;
use uuid::Uuid;
use worklog_service_core::domains::auth::domain::{
    model::{NewUser, ProfileUpdate, Role, User, PASSWORD_HISTORY_LIMIT,
        MAX_FAILED_LOGINS, PASSWORD_VALIDITY_DAYS},
    repository::{
        PasswordHistoryRepository, RevokedTokenRepository, RoleRepository, UserRepository,
    },
};

/// PostgreSQL implementation of the credential store
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                username, email, first_name, last_name, company, password_hash,
                role_id, enabled, locked, failed_login_count,
                password_last_changed, password_expires_at, force_password_change,
                tokens_invalid_before, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, FALSE, 0, $8, $9, $10, NULL, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.company)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(now)
        .bind(user.password_expires_at)
        .bind(user.force_password_change)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                company = COALESCE($5, company),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.company)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    async fn change_password(&self, id: i64, new_hash: &str) -> Result<User, AppError> {
        // One unit of work: the hash swap, both expiration stamps, the
        // token-invalidation stamp, the history append and the pruning all
        // commit together. The UPDATE takes the user's row lock, which also
        // serialises concurrent changes for the same user.
        let now = Utc::now();
        let expires_at = now + Duration::days(PASSWORD_VALIDITY_DAYS);

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_last_changed = $3,
                password_expires_at = $4,
                force_password_change = FALSE,
                tokens_invalid_before = $3,
                updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new_hash)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        sqlx::query(
            "INSERT INTO password_history (user_id, password_hash, changed_at) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(new_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM password_history
            WHERE user_id = $1
              AND id NOT IN (
                  SELECT id FROM password_history
                  WHERE user_id = $1
                  ORDER BY changed_at DESC, id DESC
                  LIMIT $2
              )
            "#,
        )
        .bind(id)
        .bind(PASSWORD_HISTORY_LIMIT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn record_failed_login(&self, id: i64) -> Result<bool, AppError> {
        // The lock engages on the threshold failure and stays until an
        // administrator clears it; there is no time-based self-unlock.
        let locked: bool = sqlx::query_scalar(
            r#"
            UPDATE users
            SET failed_login_count = failed_login_count + 1,
                locked = locked OR (failed_login_count + 1 >= $2),
                updated_at = NOW()
            WHERE id = $1
            RETURNING locked
            "#,
        )
        .bind(id)
        .bind(MAX_FAILED_LOGINS)
        .fetch_one(&self.pool)
        .await?;

        Ok(locked)
    }

    async fn reset_failed_login_count(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET failed_login_count = 0, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn unlock(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET locked = FALSE, failed_login_count = 0, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET enabled = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_role: &str,
    ) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.enabled = TRUE
              AND r.name <> $3
              AND u.password_expires_at >= $1
              AND u.password_expires_at <= $2
            ORDER BY u.password_expires_at
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(exclude_role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

/// PostgreSQL implementation of password-history reads
#[derive(Clone)]
pub struct PgPasswordHistoryRepository {
    pool: PgPool,
}

impl PgPasswordHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordHistoryRepository for PgPasswordHistoryRepository {
    async fn recent_hashes(&self, user_id: i64, limit: i64) -> Result<Vec<String>, AppError> {
        let hashes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT password_hash FROM password_history
            WHERE user_id = $1
            ORDER BY changed_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(hashes)
    }
}

/// PostgreSQL implementation of role lookups
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }
}

/// PostgreSQL implementation of the revocation ledger
#[derive(Clone)]
pub struct PgRevokedTokenRepository {
    pool: PgPool,
}

impl PgRevokedTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevokedTokenRepository for PgRevokedTokenRepository {
    async fn revoke(
        &self,
        jti: Uuid,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        // Idempotent: revoking the same jti twice leaves exactly one row.
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, username, revoked_at, expires_at)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(username)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;

        Ok(revoked)
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
