use async_trait::async_trait;
use shared_error::AppError;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use worklog_service_core::domains::auth::domain::authorization::{Authorizer, PermissionCode};

/// Permission evaluator over the `role_permissions` join with a
/// process-lifetime decision cache.
///
/// Role–permission assignments are reference data seeded at bootstrap, so a
/// cached decision never goes stale inside one process; changing the join
/// requires a restart.
#[derive(Clone)]
pub struct CachedAuthorizer {
    pool: PgPool,
    cache: Arc<RwLock<HashMap<(i64, String), bool>>>,
}

impl CachedAuthorizer {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Authorizer for CachedAuthorizer {
    async fn has_permission(
        &self,
        role_id: i64,
        permission: &PermissionCode,
    ) -> Result<bool, AppError> {
        let key = (role_id, permission.to_string());

        if let Some(&decision) = self.cache.read().await.get(&key) {
            return Ok(decision);
        }

        let granted: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM role_permissions rp
                JOIN permissions p ON p.id = rp.permission_id
                WHERE rp.role_id = $1 AND p.resource = $2 AND p.action = $3
            )
            "#,
        )
        .bind(role_id)
        .bind(&permission.resource)
        .bind(&permission.action)
        .fetch_one(&self.pool)
        .await?;

        self.cache.write().await.insert(key, granted);

        Ok(granted)
    }
}
