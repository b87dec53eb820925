//! Cache backend seam and the in-memory implementation.
//!
//! Invalidation relies on per-key idempotency: clearing an absent key is a
//! no-op, and a missed clear self-heals when the entry's TTL expires. No
//! locking beyond what the backend itself provides.

use async_trait::async_trait;
use dashmap::DashMap;
use entity::Id;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};

/// Failure talking to the cache backend. The coordinator logs these and
/// moves on; it never retries.
#[derive(Debug)]
pub struct CacheError {
    pub message: String,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Cache Error: {}", self.message)
    }
}

impl StdError for CacheError {}

/// Shared, concurrently mutated cache. `clear` operations must be
/// idempotent per key.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn clear(&self, key: &str) -> Result<(), CacheError>;
    async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

/// Per-user payment-summary namespace: pending/paid/overdue totals and the
/// dashboard history all live under this prefix.
pub fn user_summary_prefix(prefix: &str, user_id: Id) -> String {
    format!("{prefix}:{user_id}")
}

/// Derived cache of a user's overdue concepts; only status transitions
/// change what is overdue, so only those clear it.
pub fn user_overdue_key(user_id: Id) -> String {
    format!("overdue_concepts:{user_id}")
}

struct CachedEntry {
    value: Value,
    expires_at: Instant,
}

/// In-memory TTL cache over a concurrent map. Production deployments put a
/// real cache server behind [`CacheBackend`]; this one backs tests and
/// single-process wiring.
pub struct MemoryCache {
    ttl: Duration,
    entries: DashMap<String, CachedEntry>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(
            key.into(),
            CachedEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Returns the cached value, dropping it first when its TTL has lapsed.
    /// Expiry-on-read is the backstop for a dropped invalidation task.
    pub fn get(&self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at <= Instant::now() => true,
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn clear(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
