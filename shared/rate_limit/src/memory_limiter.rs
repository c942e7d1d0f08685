//! In-memory sliding-window rate limiter
//!
//! Suitable for one replica; cross-replica fairness is not required for the
//! auth endpoints because every replica applies the same per-source bucket.

use crate::limiter::{now_secs, RateLimitError, RateLimitResult, RateLimiter};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

// Entries idle longer than this are dropped during occasional sweeps.
const IDLE_EVICTION_SECS: u64 = 3600;
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Default)]
struct WindowLog {
    hits: VecDeque<u64>,
}

impl WindowLog {
    fn prune(&mut self, window_start: u64) {
        while self.hits.front().is_some_and(|&ts| ts < window_start) {
            self.hits.pop_front();
        }
    }

    fn last_hit(&self) -> u64 {
        self.hits.back().copied().unwrap_or(0)
    }
}

/// Sliding-window-log limiter backed by a shared map
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateLimiter {
    store: Arc<RwLock<HashMap<String, WindowLog>>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_idle(store: &mut HashMap<String, WindowLog>) {
        if store.len() > SWEEP_THRESHOLD {
            let cutoff = now_secs().saturating_sub(IDLE_EVICTION_SECS);
            store.retain(|_, log| log.last_hit() >= cutoff);
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_rate_limit(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = now_secs();
        let window_secs = window.as_secs();
        let window_start = now.saturating_sub(window_secs);

        let mut store = self.store.write().await;
        Self::sweep_idle(&mut store);

        let log = store.entry(key.to_string()).or_default();
        log.prune(window_start);

        // The window resets when the oldest remaining hit leaves it.
        let reset_at = log.hits.front().map_or(now + window_secs, |&oldest| oldest + window_secs);

        let used = log.hits.len() as u32;
        if used >= max_requests {
            return Ok(RateLimitResult::denied(max_requests, reset_at));
        }

        log.hits.push_back(now);
        Ok(RateLimitResult::allowed(max_requests, max_requests - used - 1, reset_at))
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn get_count(&self, key: &str) -> Result<u32, RateLimitError> {
        let store = self.store.read().await;
        Ok(store.get(key).map_or(0, |log| log.hits.len() as u32))
    }
}
