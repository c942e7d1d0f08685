use shared_error::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Initialize the bounded database connection pool.
///
/// `acquire_timeout` is the per-request budget for obtaining a connection;
/// exceeding it surfaces as `PoolTimedOut`, which the error layer maps to
/// RESOURCE_EXHAUSTED.
pub async fn init_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|e| AppError::Config(format!("Failed to connect to database: {}", e)))
}
