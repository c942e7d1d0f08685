//! Rate limiter trait and types

use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum number of requests allowed in the window
    pub limit: u32,
    /// Number of requests remaining in the current window
    pub remaining: u32,
    /// Seconds until the window resets
    pub retry_after: u64,
}

impl RateLimitResult {
    pub fn allowed(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after: reset_at.saturating_sub(now_secs()),
        }
    }

    pub fn denied(limit: u32, reset_at: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after: reset_at.saturating_sub(now_secs()),
        }
    }
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Error types for rate limiting operations
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Rate limiter trait for different implementations
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if a request identified by `key` is allowed, updating the counter.
    async fn check_rate_limit(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<RateLimitResult, RateLimitError>;

    /// Reset the counter for a specific key
    async fn reset(&self, key: &str) -> Result<(), RateLimitError>;

    /// Current count for a key without incrementing
    async fn get_count(&self, key: &str) -> Result<u32, RateLimitError>;
}

/// Key generator for rate limiting
///
/// Remote addresses are hashed before keying so raw client IPs never sit in
/// the limiter store.
pub struct KeyGenerator;

impl KeyGenerator {
    /// Generate a hashed key for a remote address
    pub fn ip_key(prefix: &str, ip: &str) -> String {
        use sha2::{Digest, Sha256};
        let digest = hex::encode(Sha256::digest(ip.as_bytes()));
        format!("{}:{}", prefix, &digest[..16])
    }

    /// Generate a key for a username (already public, no hashing)
    pub fn username_key(prefix: &str, username: &str) -> String {
        format!("{}:{}", prefix, username)
    }
}
