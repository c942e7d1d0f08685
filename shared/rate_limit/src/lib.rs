//! Rate limiting for the authentication-family endpoints.
//!
//! The limiter trait keeps the storage backend pluggable; the in-memory
//! sliding window covers a single replica. The middleware applies a
//! per-remote-IP bucket to login/refresh and a per-username bucket to
//! change-password.

pub mod limiter;
pub mod memory_limiter;
pub mod middleware;

pub use limiter::{KeyGenerator, RateLimitError, RateLimitResult, RateLimiter};
pub use memory_limiter::InMemoryRateLimiter;
pub use middleware::{AuthEndpoint, RateLimitLayer, RateLimitState};
