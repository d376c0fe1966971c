// ── Response cache ──
//
// TTL cache in front of expensive operations. Caching is an accelerator:
// every backend failure degrades to a miss (reads) or a no-op (writes),
// is counted, and is logged once.

mod backend;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

pub use backend::{CacheBackend, CacheEntry, CacheError, MemoryBackend};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

/// Deterministic key for `(operation, params)`: parameter order does not
/// matter.
pub fn cache_key<I, K, V>(operation: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    for (k, v) in &sorted {
        // length-prefixed so ("ab","c") and ("a","bc") differ
        hasher.update(k.len().to_be_bytes());
        hasher.update(k.as_bytes());
        hasher.update(v.len().to_be_bytes());
        hasher.update(v.as_bytes());
    }
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
    unavailable_logged: AtomicBool,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            unavailable_logged: AtomicBool::new(false),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(SystemClock))
    }

    /// The cached value, if present and younger than its TTL.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        match self.backend.get(key) {
            Ok(Some(entry)) if entry.is_fresh(self.clock.now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.payload)
            }
            // Not deleted on read: a concurrent `set` may already have
            // replaced it. The next write overwrites it.
            Ok(Some(_)) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache entry expired");
                None
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.backend_failed(&e);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            key: key.to_owned(),
            payload: Arc::new(value),
            cached_at: self.clock.now(),
            ttl,
        };
        match self.backend.set(entry) {
            Ok(()) => {
                self.sets.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.backend_failed(&e),
        }
    }

    pub fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            self.backend_failed(&e);
        }
    }

    /// Typed read; a payload that no longer decodes is a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match T::deserialize(value.as_ref()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "cached payload failed to decode");
                None
            }
        }
    }

    /// Typed write; encoding failures are counted like backend failures.
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(v) => self.set(key, v, ttl),
            Err(e) => self.backend_failed(&CacheError::Encode(e)),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn backend_failed(&self, err: &CacheError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        if self.unavailable_logged.swap(true, Ordering::Relaxed) {
            debug!(error = %err, "cache backend error");
        } else {
            warn!(error = %err, "cache backend unavailable, serving uncached");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;

    struct DownBackend;

    impl CacheBackend for DownBackend {
        fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        fn set(&self, _entry: CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    fn manual() -> (ResponseCache, ManualClock) {
        let clock = ManualClock::new(DateTime::<Utc>::UNIX_EPOCH);
        let cache = ResponseCache::new(Arc::new(MemoryBackend::new()), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn key_ignores_param_order() {
        let a = cache_key("topology", [("cloud", "true"), ("scanner", "false")]);
        let b = cache_key("topology", [("scanner", "false"), ("cloud", "true")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, cache_key("topology", [("cloud", "false"), ("scanner", "false")]));
        assert_ne!(a, cache_key("devices", [("cloud", "true"), ("scanner", "false")]));
    }

    #[test]
    fn ttl_expiry_is_a_miss() {
        let (cache, clock) = manual();
        cache.set("k", json!({ "n": 1 }), Duration::from_secs(30));
        assert_eq!(cache.get("k").unwrap()["n"], 1);
        clock.advance(TimeDelta::seconds(30));
        assert!(cache.get("k").is_none());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                sets: 1,
                errors: 0
            }
        );
    }

    #[test]
    fn expired_read_leaves_entry_for_next_set() {
        let clock = ManualClock::new(DateTime::<Utc>::UNIX_EPOCH);
        let backend = Arc::new(MemoryBackend::new());
        let cache = ResponseCache::new(Arc::<MemoryBackend>::clone(&backend), Arc::new(clock.clone()));

        cache.set("k", json!("old"), Duration::from_secs(30));
        clock.advance(TimeDelta::seconds(31));
        assert!(cache.get("k").is_none());
        assert_eq!(backend.len(), 1);

        cache.set("k", json!("new"), Duration::from_secs(30));
        assert_eq!(*cache.get("k").unwrap(), json!("new"));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn delete_removes() {
        let (cache, _) = manual();
        cache.set("k", json!(1), Duration::from_secs(30));
        cache.delete("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn typed_round_trip() {
        let (cache, _) = manual();
        cache.set_as("k", &vec![1u32, 2, 3], Duration::from_secs(5));
        assert_eq!(cache.get_as::<Vec<u32>>("k"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_as::<String>("k"), None);
    }

    #[test]
    fn unavailable_backend_is_a_pass_through() {
        let cache = ResponseCache::new(Arc::new(DownBackend), Arc::new(SystemClock));
        cache.set("k", json!(1), Duration::from_secs(30));
        assert!(cache.get("k").is_none());
        cache.delete("k");
        let stats = cache.stats();
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.sets, 0);
        assert_eq!(stats.misses, 1);
    }
}
