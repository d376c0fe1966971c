// ── Identity resolution ──
//
// MAC → vendor, in three tiers: the local OUI table (no I/O), the on-disk
// vendor cache, then the external registry under a token bucket. Any miss
// or failure ends in an empty vendor, which callers treat as a valid
// terminal answer. Concurrent lookups for one OUI share a single request.

mod device_type;
mod rate_limit;
mod table;
mod vendor_cache;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

use topofuse_api::{TlsMode, TransportConfig, VendorLookupClient};

use crate::clock::Clock;
use crate::config::IdentityConfig;
use crate::error::CoreError;
use crate::model::{Confidence, MacAddress, Oui};

pub use device_type::{default_device_type, infer_device_types};
pub use rate_limit::RateLimiter;
pub use table::LocalVendorTable;
pub use vendor_cache::{VendorCache, VendorCacheEntry};

/// External OUI registry.
#[async_trait]
pub trait VendorLookup: Send + Sync {
    /// `Ok(None)` when the registry has no entry.
    async fn lookup(&self, oui: Oui) -> Result<Option<String>, topofuse_api::Error>;
}

#[async_trait]
impl VendorLookup for VendorLookupClient {
    async fn lookup(&self, oui: Oui) -> Result<Option<String>, topofuse_api::Error> {
        VendorLookupClient::lookup(self, &oui.hex()).await
    }
}

/// Which tier answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IdentitySource {
    LocalTable,
    Cache,
    Online,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityInfo {
    /// Canonical form, or the best-effort normalization of junk input.
    pub mac: String,
    pub oui: Option<Oui>,
    /// Empty when unknown.
    pub vendor: String,
    pub source: IdentitySource,
    pub confidence: Confidence,
    /// Ranked candidates; the first is the default hint.
    pub device_types: &'static [&'static str],
}

impl IdentityInfo {
    fn known(mac: MacAddress, vendor: String, source: IdentitySource, confidence: Confidence) -> Self {
        let device_types = infer_device_types(&vendor);
        Self {
            mac: mac.to_string(),
            oui: Some(mac.oui()),
            vendor,
            source,
            confidence,
            device_types,
        }
    }

    fn unknown(mac: String, oui: Option<Oui>) -> Self {
        Self {
            mac,
            oui,
            vendor: String::new(),
            source: IdentitySource::Unknown,
            confidence: Confidence::Low,
            device_types: infer_device_types(""),
        }
    }

    pub fn is_known(&self) -> bool {
        !self.vendor.is_empty()
    }

    pub fn device_type(&self) -> &'static str {
        self.device_types.first().copied().unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub requests: u64,
    pub malformed: u64,
    pub local_hits: u64,
    pub cache_hits: u64,
    pub online_lookups: u64,
    pub online_failures: u64,
    pub rate_limited: u64,
    pub unknown: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    malformed: AtomicU64,
    local_hits: AtomicU64,
    cache_hits: AtomicU64,
    online_lookups: AtomicU64,
    online_failures: AtomicU64,
    rate_limited: AtomicU64,
    unknown: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

type InFlight = Mutex<HashMap<Oui, Arc<OnceCell<Option<String>>>>>;

/// Resolves MAC addresses to vendors. Owns the vendor cache.
pub struct IdentityResolver {
    table: LocalVendorTable,
    cache: VendorCache,
    lookup: Option<Arc<dyn VendorLookup>>,
    limiter: RateLimiter,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
    counters: Counters,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("table_entries", &self.table.len())
            .field("cache_entries", &self.cache.len())
            .field("online", &self.lookup.is_some())
            .finish_non_exhaustive()
    }
}

impl IdentityResolver {
    /// Assemble a resolver from parts. `lookup = None` disables the online tier.
    pub fn new(
        config: &IdentityConfig,
        cache: VendorCache,
        lookup: Option<Arc<dyn VendorLookup>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: LocalVendorTable::with_overrides(config.local_vendors.iter().cloned()),
            cache,
            lookup,
            limiter: RateLimiter::new(config.requests_per_window, config.window, Arc::clone(&clock)),
            cooldown: config.cooldown,
            clock,
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Build the resolver `config` describes: file-backed cache when a path
    /// is set, HTTP registry client when online lookup is on.
    pub fn from_config(config: &IdentityConfig, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        if config.online_lookup && config.requests_per_window == 0 {
            return Err(CoreError::config(
                "identity.requests_per_window must be at least 1 when online lookup is enabled",
            ));
        }
        if config.window.is_zero() {
            return Err(CoreError::config("identity.window must be non-zero"));
        }

        let cache = match &config.cache_path {
            Some(path) => VendorCache::load(path, config.cache_expiry),
            None => VendorCache::in_memory(config.cache_expiry),
        };

        let lookup: Option<Arc<dyn VendorLookup>> = if config.online_lookup {
            let url = match &config.lookup_url {
                Some(url) => url.clone(),
                None => Url::parse(topofuse_api::DEFAULT_LOOKUP_URL)
                    .map_err(|e| CoreError::config(format!("identity.lookup_url: {e}")))?,
            };
            let transport = TransportConfig {
                tls: TlsMode::System,
                timeout: config.timeout,
            };
            let client = VendorLookupClient::new(url, &transport)
                .map_err(|e| CoreError::config(format!("identity.lookup_url: {e}")))?;
            Some(Arc::new(client))
        } else {
            None
        };

        Ok(Self::new(config, cache, lookup, clock))
    }

    pub fn cache(&self) -> &VendorCache {
        &self.cache
    }

    /// Resolve any MAC spelling. Junk input is normalized best-effort and
    /// answered with low confidence, without I/O.
    pub async fn resolve(&self, raw: &str) -> IdentityInfo {
        match MacAddress::parse(raw) {
            Ok(mac) => self.resolve_mac(mac).await,
            Err(_) => {
                bump(&self.counters.requests);
                bump(&self.counters.malformed);
                debug!(raw, "unparseable MAC, skipping lookup");
                IdentityInfo::unknown(MacAddress::normalize_lossy(raw), None)
            }
        }
    }

    pub async fn resolve_mac(&self, mac: MacAddress) -> IdentityInfo {
        bump(&self.counters.requests);
        let oui = mac.oui();

        if let Some(vendor) = self.table.get(oui) {
            bump(&self.counters.local_hits);
            return IdentityInfo::known(mac, vendor.to_owned(), IdentitySource::LocalTable, Confidence::High);
        }

        if let Some(vendor) = self.cache.get_fresh(oui, self.clock.now()) {
            bump(&self.counters.cache_hits);
            return IdentityInfo::known(mac, vendor, IdentitySource::Cache, Confidence::Medium);
        }

        // Randomized / virtual addresses carry no registered OUI.
        let online = self.lookup.as_ref().filter(|_| !mac.is_locally_administered());
        if let Some(lookup) = online {
            if let Some(vendor) = self.lookup_coalesced(oui, lookup).await {
                return IdentityInfo::known(mac, vendor, IdentitySource::Online, Confidence::Medium);
            }
        }

        bump(&self.counters.unknown);
        IdentityInfo::unknown(mac.to_string(), Some(oui))
    }

    /// One outstanding registry request per OUI; every concurrent caller
    /// gets its result.
    async fn lookup_coalesced(&self, oui: Oui, lookup: &Arc<dyn VendorLookup>) -> Option<String> {
        let cell = {
            let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(oui).or_insert_with(|| Arc::new(OnceCell::new())))
        };

        let result = cell
            .get_or_init(|| self.lookup_online(oui, lookup.as_ref()))
            .await
            .clone();

        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if map.get(&oui).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            map.remove(&oui);
        }
        result
    }

    async fn lookup_online(&self, oui: Oui, lookup: &dyn VendorLookup) -> Option<String> {
        // A lookup that finished between our cache check and now.
        if let Some(vendor) = self.cache.get_fresh(oui, self.clock.now()) {
            return Some(vendor);
        }
        if !self.limiter.try_acquire() {
            bump(&self.counters.rate_limited);
            debug!(%oui, "vendor lookup skipped, rate limit exhausted");
            return None;
        }

        bump(&self.counters.online_lookups);
        match lookup.lookup(oui).await {
            Ok(Some(vendor)) => {
                let vendor = vendor.trim().to_owned();
                if vendor.is_empty() {
                    return None;
                }
                let entry = VendorCacheEntry {
                    vendor: vendor.clone(),
                    resolved_at: self.clock.now(),
                };
                if let Err(e) = self.cache.insert(oui, entry).await {
                    warn!(%oui, error = %e, "vendor cache write failed");
                }
                debug!(%oui, %vendor, "vendor resolved online");
                Some(vendor)
            }
            Ok(None) => {
                debug!(%oui, "vendor registry has no entry");
                None
            }
            Err(topofuse_api::Error::RateLimited { retry_after_secs }) => {
                bump(&self.counters.rate_limited);
                let pause = Duration::from_secs(retry_after_secs).max(self.cooldown);
                self.limiter.cooldown(pause);
                warn!(%oui, cooldown_secs = pause.as_secs(), "vendor registry rate limited, pausing lookups");
                None
            }
            Err(e) => {
                bump(&self.counters.online_failures);
                warn!(%oui, error = %e, "vendor lookup failed");
                None
            }
        }
    }

    pub fn stats(&self) -> ResolverStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let c = &self.counters;
        ResolverStats {
            requests: load(&c.requests),
            malformed: load(&c.malformed),
            local_hits: load(&c.local_hits),
            cache_hits: load(&c.cache_hits),
            online_lookups: load(&c.online_lookups),
            online_failures: load(&c.online_failures),
            rate_limited: load(&c.rate_limited),
            unknown: load(&c.unknown),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::clock::ManualClock;

    /// Counts calls and answers from a fixed script.
    #[derive(Debug)]
    struct ScriptedLookup {
        calls: AtomicUsize,
        answer: fn() -> Result<Option<String>, topofuse_api::Error>,
    }

    #[async_trait]
    impl VendorLookup for ScriptedLookup {
        async fn lookup(&self, _oui: Oui) -> Result<Option<String>, topofuse_api::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            (self.answer)()
        }
    }

    fn resolver_with(
        answer: fn() -> Result<Option<String>, topofuse_api::Error>,
    ) -> (IdentityResolver, Arc<ScriptedLookup>, ManualClock) {
        let clock = ManualClock::new(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(365));
        let lookup = Arc::new(ScriptedLookup {
            calls: AtomicUsize::new(0),
            answer,
        });
        let config = IdentityConfig {
            requests_per_window: 10,
            ..IdentityConfig::default()
        };
        let resolver = IdentityResolver::new(
            &config,
            VendorCache::in_memory(config.cache_expiry),
            Some(lookup.clone() as Arc<dyn VendorLookup>),
            Arc::new(clock.clone()),
        );
        (resolver, lookup, clock)
    }

    #[tokio::test]
    async fn local_table_is_high_confidence() {
        let (resolver, lookup, _) = resolver_with(|| Ok(None));
        let info = resolver.resolve("b8-27-eb-00-00-01").await;
        assert_eq!(info.mac, "B8:27:EB:00:00:01");
        assert_eq!(info.source, IdentitySource::LocalTable);
        assert_eq!(info.confidence, Confidence::High);
        assert_eq!(info.device_type(), "raspberry-pi");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn junk_is_low_confidence_without_io() {
        let (resolver, lookup, _) = resolver_with(|| Ok(Some("X".into())));
        let info = resolver.resolve("zz-not-a-mac").await;
        assert_eq!(info.mac, "ZZ:NOT:A:MAC");
        assert_eq!(info.vendor, "");
        assert_eq!(info.confidence, Confidence::Low);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.stats().malformed, 1);
    }

    #[tokio::test]
    async fn online_result_is_cached() {
        let (resolver, lookup, _) = resolver_with(|| Ok(Some("Acme Networks".into())));
        let first = resolver.resolve("00:11:22:33:44:55").await;
        assert_eq!(first.source, IdentitySource::Online);
        assert_eq!(first.vendor, "Acme Networks");

        let second = resolver.resolve("00:11:22:99:99:99").await;
        assert_eq!(second.source, IdentitySource::Cache);
        assert_eq!(second.confidence, Confidence::Medium);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_request() {
        let (resolver, lookup, _) = resolver_with(|| Ok(Some("Acme Networks".into())));
        let macs: Vec<String> = (0..16).map(|i| format!("00:11:22:00:00:{i:02x}")).collect();
        let infos = futures_util::future::join_all(macs.iter().map(|m| resolver.resolve(m))).await;
        assert!(infos.iter().all(|i| i.vendor == "Acme Networks"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limit_response_opens_cooldown() {
        let (resolver, lookup, clock) = resolver_with(|| {
            Err(topofuse_api::Error::RateLimited {
                retry_after_secs: 5,
            })
        });
        let info = resolver.resolve("00:11:22:33:44:55").await;
        assert_eq!(info.vendor, "");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

        // configured cooldown (60s) outlasts Retry-After (5s)
        clock.advance(TimeDelta::seconds(30));
        resolver.resolve("00:11:33:33:44:55").await;
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

        clock.advance(TimeDelta::seconds(31));
        resolver.resolve("00:11:44:33:44:55").await;
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn locally_administered_skips_registry() {
        let (resolver, lookup, _) = resolver_with(|| Ok(Some("X".into())));
        let info = resolver.resolve("02:00:00:00:00:01").await;
        assert_eq!(info.source, IdentitySource::Unknown);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_rate_is_a_config_error() {
        let config = IdentityConfig {
            requests_per_window: 0,
            ..IdentityConfig::default()
        };
        let err = IdentityResolver::from_config(&config, Arc::new(crate::clock::SystemClock));
        assert!(matches!(err, Err(CoreError::Config { .. })));
    }
}
