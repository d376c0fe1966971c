// ── Runtime engine configuration ──
//
// These types describe *what* the engine talks to and how patient it is.
// They carry credential data and tuning, but never touch disk. The binary
// (via `topofuse-config`) builds them and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use topofuse_api::{SourceAuth, TransportConfig};
use url::Url;

use crate::model::{Oui, SourceKind};

/// Fusion engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a fused topology is served from the response cache.
    pub cache_ttl: Duration,
    /// Upper bound on any single adapter fetch.
    pub fetch_timeout: Duration,
    /// Whole-request deadline used by `get_topology`.
    pub deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(20),
        }
    }
}

/// Identity resolver tuning.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Whether to call the external vendor registry at all.
    pub online_lookup: bool,
    /// Vendor registry base URL. `None` uses the public registry.
    pub lookup_url: Option<Url>,
    /// Token bucket capacity, refilled once per `window`.
    pub requests_per_window: u32,
    pub window: Duration,
    /// Minimum pause after the registry answers 429.
    pub cooldown: Duration,
    /// Age at which a cached vendor stops being served.
    pub cache_expiry: Duration,
    /// Vendor cache file. `None` keeps the cache in memory only.
    pub cache_path: Option<PathBuf>,
    /// Site-specific OUI overrides, checked before the built-in table.
    pub local_vendors: Vec<(Oui, String)>,
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            online_lookup: true,
            lookup_url: None,
            requests_per_window: 1,
            window: Duration::from_secs(1),
            cooldown: Duration::from_secs(60),
            cache_expiry: Duration::from_secs(30 * 24 * 60 * 60),
            cache_path: None,
            local_vendors: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Where a source's data comes from.
#[derive(Debug, Clone)]
pub enum SourceEndpoint {
    Http {
        url: Url,
        auth: SourceAuth,
        transport: TransportConfig,
    },
    /// Static JSON document on disk (the SNMP inventory).
    File(PathBuf),
}

/// One configured topology source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub endpoint: SourceEndpoint,
}
