// ── On-disk vendor cache ──
//
// OUI → (vendor, resolved_at), loaded once at construction and rewritten
// whole on every insert. Reads go straight to the DashMap; writes to disk
// are serialized through `write_lock` and land via temp file + rename so a
// crash mid-write never leaves a truncated cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::to_delta;
use crate::error::CoreError;
use crate::model::Oui;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCacheEntry {
    pub vendor: String,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct VendorCache {
    path: Option<PathBuf>,
    entries: DashMap<Oui, VendorCacheEntry>,
    write_lock: Mutex<()>,
    expiry: Duration,
}

impl VendorCache {
    /// Memory-only cache; nothing is persisted.
    pub fn in_memory(expiry: Duration) -> Self {
        Self {
            path: None,
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
            expiry,
        }
    }

    /// Load the cache file at `path`. A missing file is an empty cache; an
    /// unreadable or corrupt one is logged and also starts empty.
    pub fn load(path: impl Into<PathBuf>, expiry: Duration) -> Self {
        let path = path.into();
        let entries = DashMap::new();
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, VendorCacheEntry>>(&text) {
                Ok(map) => {
                    for (key, entry) in map {
                        match key.parse::<Oui>() {
                            Ok(oui) => {
                                entries.insert(oui, entry);
                            }
                            Err(_) => warn!(%key, "ignoring vendor cache entry with invalid OUI"),
                        }
                    }
                    debug!(path = %path.display(), entries = entries.len(), "vendor cache loaded");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "vendor cache corrupt, starting empty"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "vendor cache unreadable, starting empty"),
        }
        Self {
            path: Some(path),
            entries,
            write_lock: Mutex::new(()),
            expiry,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cached vendor for `oui`, unless it is `expiry` old or older.
    pub fn get_fresh(&self, oui: Oui, now: DateTime<Utc>) -> Option<String> {
        let entry = self.entries.get(&oui)?;
        let age = now.signed_duration_since(entry.resolved_at);
        (age < to_delta(self.expiry)).then(|| entry.vendor.clone())
    }

    /// Record a resolution and persist the whole map.
    pub async fn insert(&self, oui: Oui, entry: VendorCacheEntry) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        self.entries.insert(oui, entry);
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot: BTreeMap<String, VendorCacheEntry> = self
            .entries
            .iter()
            .map(|e| (e.key().hex(), e.value().clone()))
            .collect();
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| CoreError::Internal(format!("vendor cache encode: {e}")))?;

        let io_err = |source| CoreError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}
