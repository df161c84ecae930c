//! # Durable Store
//!
//! Key-value storage with expiry used to hand input values and cancellation
//! sentinels from the outside world to a waiting step. Shared across every
//! concurrently running pipeline and every connected session.
//!
//! [`InMemoryStore`] is the in-process backend; networked backends implement
//! [`KeyValueStore`] the same way.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Minimum time between two expiry sweeps triggered by writes
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Errors raised by a store backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store operation failed: {0}")]
    Backend(String),
}

/// Expiring key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Write `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// Read without consuming
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove the key; returns whether a live value was present
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically read and remove the key
    ///
    /// Two concurrent callers never both observe the same value.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process store backed by a sharded concurrent map
///
/// Stale entries are dropped when touched, and every write sweeps the whole
/// map once [`SWEEP_INTERVAL`] has passed since the previous sweep. Keys that
/// are never read again (late answers, unused sentinels) therefore go away too.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    entries: Arc<DashMap<String, StoredValue>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn sweep_due(&self, now: Instant) -> bool {
        let mut last = self.last_sweep.lock();
        if now.duration_since(*last) < SWEEP_INTERVAL {
            return false;
        }
        *last = now;
        true
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired store entries");
        }
        removed
    }

    /// Number of entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        if self.sweep_due(now) {
            self.purge_expired();
        }
        let stored = StoredValue {
            value,
            expires_at: now + ttl,
        };
        self.entries.insert(key.to_string(), stored);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(stored) = self.entries.get(key) {
            if !stored.is_expired(now) {
                return Ok(Some(stored.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, stored| stored.is_expired(now));
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, stored)| !stored.is_expired(now)))
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, stored)| !stored.is_expired(now))
            .map(|(_, stored)| stored.value))
    }
}
