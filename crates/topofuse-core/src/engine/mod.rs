// ── Fusion engine ──
//
// Full lifecycle of a topology request: response-cache lookup, concurrent
// fan-out to every adapter under one deadline, priority merge, identity
// enrichment, cache write. Cheaply cloneable; all clones share state.

mod fanout;
pub mod merge;

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{FetchContext, SourceAdapter, duration_ms};
use crate::cache::{CacheStats, ResponseCache, cache_key};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{CoreError, SourceError};
use crate::identity::{IdentityResolver, ResolverStats};
use crate::model::{MacAddress, Oui, SourceKind, TopologyGraph, TopologyResponse};

pub use merge::{DISCOVERED_NAME, DISCOVERED_PORT, DISCOVERED_SERIAL, MergeOutcome, fuse};

const TOPOLOGY_OPERATION: &str = "comprehensive_topology";

/// Per-request view options. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyFilter {
    /// Append cloud-managed switches.
    pub include_cloud: bool,
    /// Run the scanner enrichment pass.
    pub include_scanner: bool,
    /// Fill empty vendors through the identity resolver.
    pub resolve_identities: bool,
}

impl Default for TopologyFilter {
    fn default() -> Self {
        Self {
            include_cloud: false,
            include_scanner: true,
            resolve_identities: true,
        }
    }
}

impl TopologyFilter {
    pub fn cache_key(&self) -> String {
        cache_key(
            TOPOLOGY_OPERATION,
            [
                ("include_cloud", self.include_cloud.to_string()),
                ("include_scanner", self.include_scanner.to_string()),
                ("resolve_identities", self.resolve_identities.to_string()),
            ],
        )
    }

    /// Whether sources of `kind` contribute under this filter.
    pub fn wants(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::CloudSwitch => self.include_cloud,
            SourceKind::Scanner => self.include_scanner,
            SourceKind::SwitchController | SourceKind::SnmpStatic | SourceKind::DetectedDevices => {
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub fusions: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub adapter_fetches: u64,
    pub adapter_failures: u64,
    pub last_fusion_latency_ms: u64,
    pub cache: CacheStats,
    pub resolver: ResolverStats,
}

#[derive(Debug, Default)]
struct Counters {
    fusions: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    adapter_fetches: AtomicU64,
    adapter_failures: AtomicU64,
    last_fusion_latency_ms: AtomicU64,
}

/// The topology fusion engine.
#[derive(Clone)]
pub struct FusionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    resolver: Arc<IdentityResolver>,
    cache: ResponseCache,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    written_keys: Mutex<BTreeSet<String>>,
    counters: Counters,
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.inner.adapters.iter().map(|a| a.name()).collect();
        f.debug_struct("FusionEngine")
            .field("adapters", &names)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl FusionEngine {
    /// Build an engine over `adapters`, which are fetched and merged in
    /// this (registration) order within each priority step.
    pub fn new(
        config: EngineConfig,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        resolver: Arc<IdentityResolver>,
        cache: ResponseCache,
    ) -> Result<Self, CoreError> {
        Self::with_clock(config, adapters, resolver, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: EngineConfig,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        resolver: Arc<IdentityResolver>,
        cache: ResponseCache,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        if adapters.is_empty() {
            return Err(CoreError::config("at least one source adapter must be registered"));
        }
        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.name()) {
                return Err(CoreError::config(format!(
                    "duplicate source name '{}'",
                    adapter.name()
                )));
            }
        }
        if config.fetch_timeout.is_zero() {
            return Err(CoreError::config("fetch_timeout must be non-zero"));
        }
        if config.deadline.is_zero() {
            return Err(CoreError::config("deadline must be non-zero"));
        }

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                adapters,
                resolver,
                cache,
                clock,
                cancel: CancellationToken::new(),
                written_keys: Mutex::new(BTreeSet::new()),
                counters: Counters::default(),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Registered sources, in registration order.
    pub fn sources(&self) -> Vec<(String, SourceKind)> {
        self.inner
            .adapters
            .iter()
            .map(|a| (a.name().to_owned(), a.kind()))
            .collect()
    }

    pub fn resolver(&self) -> &Arc<IdentityResolver> {
        &self.inner.resolver
    }

    /// Fused topology under the configured deadline.
    pub async fn get_topology(&self, filter: &TopologyFilter) -> Result<TopologyResponse, CoreError> {
        self.get_topology_with_deadline(filter, self.inner.config.deadline)
            .await
    }

    /// Fused topology. Only configuration problems are errors; anything a
    /// source does wrong shows up in the response metadata instead.
    pub async fn get_topology_with_deadline(
        &self,
        filter: &TopologyFilter,
        deadline: Duration,
    ) -> Result<TopologyResponse, CoreError> {
        let inner = &self.inner;
        if deadline.is_zero() {
            return Err(CoreError::config("deadline must be non-zero"));
        }
        if inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let started = Instant::now();
        let key = filter.cache_key();

        if let Some(mut cached) = inner.cache.get_as::<TopologyResponse>(&key) {
            inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            cached.metadata.cached = true;
            debug!(switches = cached.graph.switches.len(), "topology served from cache");
            return Ok(cached);
        }
        inner.counters.cache_misses.fetch_add(1, Ordering::Relaxed);

        // ── Fan-out ──
        let ctx = FetchContext::new(inner.cancel.child_token(), started + deadline);
        let active: Vec<Arc<dyn SourceAdapter>> = inner
            .adapters
            .iter()
            .filter(|a| filter.wants(a.kind()))
            .cloned()
            .collect();
        let results =
            fanout::fan_out(&active, inner.config.fetch_timeout, &ctx, inner.clock.as_ref()).await;

        let failures = results.iter().filter(|r| !r.is_ok()).count();
        inner
            .counters
            .adapter_fetches
            .fetch_add(to_u64(results.len()), Ordering::Relaxed);
        inner
            .counters
            .adapter_failures
            .fetch_add(to_u64(failures), Ordering::Relaxed);

        // ── Merge ──
        let MergeOutcome {
            mut graph,
            mut metadata,
        } = fuse(&results, filter, inner.clock.now());

        // ── Identity ──
        if filter.resolve_identities {
            metadata.identities_resolved = self.resolve_identities(&mut graph, &ctx).await;
        }

        let latency_ms = duration_ms(started.elapsed());
        metadata.fusion_latency_ms = latency_ms;
        let response = TopologyResponse { graph, metadata };

        // ── Cache ──
        let ttl = inner.config.cache_ttl;
        if !ttl.is_zero() {
            inner.cache.set_as(&key, &response, ttl);
            inner
                .written_keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key);
        }

        inner.counters.fusions.fetch_add(1, Ordering::Relaxed);
        inner
            .counters
            .last_fusion_latency_ms
            .store(latency_ms, Ordering::Relaxed);

        let meta = &response.metadata;
        info!(
            skeleton = %meta.source,
            switches = response.graph.switches.len(),
            devices = response.graph.device_count(),
            succeeded = meta.sources_succeeded.len(),
            failed = meta.errors.len(),
            ports_overlaid = meta.ports_overlaid,
            unmatched_ports = meta.unmatched_ports,
            malformed = meta.malformed_records,
            identities = meta.identities_resolved,
            latency_ms,
            "topology fused"
        );

        Ok(response)
    }

    /// Resolve every device with an empty vendor, one lookup per OUI, all
    /// OUIs concurrently. Returns how many devices gained a vendor.
    async fn resolve_identities(&self, graph: &mut TopologyGraph, ctx: &FetchContext) -> usize {
        let mut pending: IndexMap<Oui, MacAddress> = IndexMap::new();
        for device in graph.devices().filter(|d| !d.has_vendor()) {
            pending.entry(device.mac.oui()).or_insert(device.mac);
        }
        if pending.is_empty() {
            return 0;
        }

        let resolver = &self.inner.resolver;
        let lookups = pending.iter().map(|(oui, mac)| async move {
            let res = ctx
                .guard(async { Ok::<_, SourceError>(resolver.resolve_mac(*mac).await) })
                .await;
            (*oui, res)
        });

        let mut answers = IndexMap::new();
        for (oui, res) in join_all(lookups).await {
            match res {
                Ok(info) if info.is_known() => {
                    answers.insert(oui, info);
                }
                Ok(_) => {}
                Err(e) => debug!(%oui, error = %e, "identity lookup abandoned"),
            }
        }
        if answers.len() < pending.len() {
            debug!(
                pending = pending.len(),
                resolved = answers.len(),
                "some vendors remain unknown"
            );
        }

        let mut resolved = 0;
        for device in graph.devices_mut().filter(|d| !d.has_vendor()) {
            if let Some(info) = answers.get(&device.mac.oui()) {
                device.vendor = Some(info.vendor.clone());
                device.device_type = Some(info.device_type().to_owned());
                device.identity_confidence = Some(info.confidence);
                resolved += 1;
            }
        }
        resolved
    }

    /// Drop every cached topology this engine has written.
    pub fn invalidate_cache(&self) -> usize {
        let keys = std::mem::take(
            &mut *self
                .inner
                .written_keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for key in &keys {
            self.inner.cache.delete(key);
        }
        debug!(keys = keys.len(), "topology cache invalidated");
        keys.len()
    }

    /// Cancel in-flight fetches and refuse new requests.
    pub fn shutdown(&self) {
        if !self.inner.cancel.is_cancelled() {
            warn!("fusion engine shutting down");
            self.inner.cancel.cancel();
        }
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.inner.counters;
        EngineStats {
            fusions: c.fusions.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            adapter_fetches: c.adapter_fetches.load(Ordering::Relaxed),
            adapter_failures: c.adapter_failures.load(Ordering::Relaxed),
            last_fusion_latency_ms: c.last_fusion_latency_ms.load(Ordering::Relaxed),
            cache: self.inner.cache.stats(),
            resolver: self.inner.resolver.stats(),
        }
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
