//! Shared counter store abstraction.
//!
//! Production deployments point this at a shared store with native
//! increment-with-expiry. `MemoryCounterStore` provides the same atomicity
//! inside one process: the DashMap entry guard holds the shard lock for the
//! whole read-reset-increment sequence.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::clock::TimeSource;

/// Counter store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Narrow interface the rate limiter needs from a counter store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add one to `key` and return the new count. A missing or
    /// expired key starts from zero and expires `ttl_secs` from now.
    async fn increment_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<u64, StoreError>;

    /// Current count without modifying it.
    async fn peek(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Connectivity check for health reporting.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: u64,
}

/// In-process counter store.
pub struct MemoryCounterStore {
    entries: DashMap<String, CounterEntry>,
    clock: Arc<dyn TimeSource>,
}

impl MemoryCounterStore {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drop expired counters. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let fresh = CounterEntry {
            count: 0,
            expires_at: now.saturating_add(ttl_secs),
        };

        let mut entry = self.entries.entry(key.to_string()).or_insert(fresh);
        if entry.expires_at <= now {
            *entry = fresh;
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn peek(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.count))
    }
}
