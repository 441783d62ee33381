use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;

/// Capability contract for the shared counter store backing the rate limiter.
///
/// Counters are opaque string keys holding non-negative integers that the
/// store removes on its own once their TTL elapses. The value operations hold
/// short-lived strings (confirmation codes) under the same contract.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment every key by one and re-arm its TTL, as one atomic batch.
    ///
    /// Returns the post-increment count of each key in entry order. Entries
    /// are `(key, ttl_secs)` pairs. Concurrent batches for the same keys may
    /// interleave between calls but never within one.
    async fn increment_batch(&self, entries: &[(String, u64)]) -> Result<Vec<u64>>;

    /// Point read of a counter; `None` when the key is absent or expired
    async fn get_counter(&self, key: &str) -> Result<Option<u64>>;

    /// Store an opaque value under a key with a TTL
    async fn put_value(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Read a stored value; `None` when absent or expired
    async fn get_value(&self, key: &str) -> Result<Option<String>>;

    /// Remove a key, counter or value alike
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check that the store is reachable
    async fn health_check(&self) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    // key -> (count, expires_at)
    counters: HashMap<String, (u64, i64)>,
    // key -> (value, expires_at)
    values: HashMap<String, (String, i64)>,
}

/// In-process store for tests and local development.
///
/// A single mutex serializes whole batches, which satisfies the atomicity
/// contract the same way a Redis MULTI/EXEC pipeline does. Expiry is applied
/// lazily on access against the injected clock.
pub struct MemoryCounterStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_batch(&self, entries: &[(String, u64)]) -> Result<Vec<u64>> {
        let now = self.clock.unix_now();
        let mut state = self.state.lock().await;

        let mut counts = Vec::with_capacity(entries.len());
        for (key, ttl_secs) in entries {
            let slot = state.counters.entry(key.clone()).or_insert((0, now));
            if slot.1 <= now {
                slot.0 = 0;
            }
            slot.0 += 1;
            slot.1 = now + *ttl_secs as i64;
            counts.push(slot.0);
        }

        Ok(counts)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<u64>> {
        let now = self.clock.unix_now();
        let state = self.state.lock().await;

        Ok(state
            .counters
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(count, _)| *count))
    }

    async fn put_value(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let now = self.clock.unix_now();
        let mut state = self.state.lock().await;
        state
            .values
            .insert(key.to_string(), (value.to_string(), now + ttl_secs as i64));
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.unix_now();
        let state = self.state.lock().await;

        Ok(state
            .values
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.counters.remove(key);
        state.values.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
