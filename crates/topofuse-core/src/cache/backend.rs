// ── Cache storage backends ──

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;

use crate::clock::to_delta;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A stored response. The payload is shared, never mutated after insert.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Arc<Value>,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Hit iff `now - cached_at < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.cached_at) < to_delta(self.ttl)
    }
}

/// Key/value storage behind `ResponseCache`. Expiry is the caller's job;
/// backends only store.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn freshness_is_strict() {
        let t0 = DateTime::<Utc>::UNIX_EPOCH;
        let entry = CacheEntry {
            key: "k".into(),
            payload: Arc::new(Value::Null),
            cached_at: t0,
            ttl: Duration::from_secs(30),
        };
        assert!(entry.is_fresh(t0 + TimeDelta::seconds(29)));
        assert!(!entry.is_fresh(t0 + TimeDelta::seconds(30)));
    }
}
