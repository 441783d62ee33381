use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{MailError, Result};
use crate::store::CounterStore;

/// Key prefix for rate limit counters
const KEY_PREFIX: &str = "rl";

/// Identity used when no per-subject isolation is required
pub const GLOBAL_IDENTITY: &str = "global";

/// One cap: at most `max_count` consumptions per `window_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub window_seconds: u64,
    pub max_count: u64,
}

impl Limit {
    pub fn new(window_seconds: u64, max_count: u64) -> Self {
        Self {
            window_seconds,
            max_count,
        }
    }
}

/// Multi-window rate limiter over a shared counter store.
///
/// A limiter is bound to one identity and an ordered list of limits at
/// construction. All mutable state lives in the store; the limiter itself
/// only holds configuration, so clones share counters through the store.
///
/// Counters use a sliding last-activity window: every call increments each
/// window's counter and re-arms its TTL before the caps are checked, including
/// calls that end up denied. A denied attempt therefore still consumes quota
/// and pushes the window's expiry further out.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    identity: String,
    limits: Vec<Limit>,
}

impl RateLimiter {
    /// Create a limiter for one identity with a fixed ordered limit list.
    ///
    /// An empty list or any non-positive window or max is rejected here, not
    /// at call time.
    pub fn new(
        store: Arc<dyn CounterStore>,
        identity: impl Into<String>,
        limits: Vec<Limit>,
    ) -> Result<Self> {
        if limits.is_empty() {
            return Err(MailError::Config(
                "Rate limit list must not be empty".to_string(),
            ));
        }
        for limit in &limits {
            if limit.window_seconds == 0 || limit.max_count == 0 {
                return Err(MailError::Config(format!(
                    "Rate limit window and max must be positive, got {}s/{}",
                    limit.window_seconds, limit.max_count
                )));
            }
        }

        Ok(Self {
            store,
            identity: identity.into(),
            limits,
        })
    }

    fn counter_key(&self, window_seconds: u64) -> String {
        format!("{}:{}:{}", KEY_PREFIX, self.identity, window_seconds)
    }

    /// Record one consumption and report whether every window's cap holds.
    ///
    /// All windows are incremented and their TTLs re-armed in a single atomic
    /// batch against the store, then the post-increment counts are checked.
    /// Returns `Ok(false)` when any window is over its cap. A store failure
    /// propagates as an error and makes no allow/deny decision.
    pub async fn check_and_consume(&self) -> Result<bool> {
        let entries: Vec<(String, u64)> = self
            .limits
            .iter()
            .map(|limit| (self.counter_key(limit.window_seconds), limit.window_seconds))
            .collect();

        let counts = self.store.increment_batch(&entries).await?;
        if counts.len() != self.limits.len() {
            return Err(MailError::Store(redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "Batch returned wrong number of counts",
            ))));
        }

        for (count, limit) in counts.iter().zip(&self.limits) {
            if *count > limit.max_count {
                debug!(
                    identity = %self.identity,
                    window_seconds = limit.window_seconds,
                    count,
                    max = limit.max_count,
                    "rate limit exceeded"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Advisory remaining capacity per window, in limit order.
    ///
    /// Point-in-time reads with no atomicity across windows; a concurrent
    /// consumer can make the result stale by the next call. Never negative.
    pub async fn get_remaining(&self) -> Result<Vec<u64>> {
        let mut remaining = Vec::with_capacity(self.limits.len());
        for limit in &self.limits {
            let count = self
                .store
                .get_counter(&self.counter_key(limit.window_seconds))
                .await?
                .unwrap_or(0);
            remaining.push(limit.max_count.saturating_sub(count));
        }
        Ok(remaining)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn limits(&self) -> &[Limit] {
        &self.limits
    }
}
