#![allow(clippy::unwrap_used)]
// Integration tests for `IdentityResolver`: cache expiry, request
// coalescing, 429 cooldown, and persistence across restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topofuse_core::{
    Confidence, IdentityConfig, IdentityResolver, IdentitySource, ManualClock, Oui, VendorCache,
    VendorLookup,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Answers every OUI with the same vendor after `delay`, or with a 429.
struct CountingLookup {
    vendor: &'static str,
    delay: Duration,
    rate_limited: bool,
    calls: AtomicUsize,
}

impl CountingLookup {
    fn new(vendor: &'static str) -> Self {
        Self {
            vendor,
            delay: Duration::ZERO,
            rate_limited: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VendorLookup for CountingLookup {
    async fn lookup(&self, _oui: Oui) -> Result<Option<String>, topofuse_api::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.rate_limited {
            return Err(topofuse_api::Error::RateLimited {
                retry_after_secs: 5,
            });
        }
        Ok(Some(self.vendor.to_owned()))
    }
}

const DAY: i64 = 24 * 60 * 60;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn resolver(
    config: &IdentityConfig,
    cache: VendorCache,
    lookup: &Arc<CountingLookup>,
    clock: &ManualClock,
) -> IdentityResolver {
    IdentityResolver::new(
        config,
        cache,
        Some(Arc::clone(lookup) as Arc<dyn VendorLookup>),
        Arc::new(clock.clone()),
    )
}

// ── Vendor cache ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cached_vendor_served_until_expiry() {
    let config = IdentityConfig::default();
    let clock = ManualClock::new(epoch());
    let lookup = Arc::new(CountingLookup::new("Ubiquiti Inc"));
    let resolver = resolver(&config, VendorCache::in_memory(config.cache_expiry), &lookup, &clock);

    let first = resolver.resolve("24:5A:4C:00:00:01").await;
    assert_eq!(first.source, IdentitySource::Online);
    assert_eq!(lookup.calls(), 1);

    clock.advance(TimeDelta::seconds(29 * DAY));
    let cached = resolver.resolve("24:5A:4C:00:00:02").await;
    assert_eq!(cached.vendor, "Ubiquiti Inc");
    assert_eq!(cached.source, IdentitySource::Cache);
    assert_eq!(lookup.calls(), 1);

    clock.advance(TimeDelta::seconds(2 * DAY));
    let refreshed = resolver.resolve("24:5A:4C:00:00:03").await;
    assert_eq!(refreshed.source, IdentitySource::Online);
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_vendor_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cache").join("vendors.json");
    let config = IdentityConfig::default();
    let clock = ManualClock::new(epoch());

    let lookup = Arc::new(CountingLookup::new("Raspberry Pi Trading Ltd"));
    let first = resolver(
        &config,
        VendorCache::load(&file, config.cache_expiry),
        &lookup,
        &clock,
    );
    let info = first.resolve("2c-cf-67-12-34-56").await;
    assert_eq!(info.mac, "2C:CF:67:12:34:56");
    assert_eq!(lookup.calls(), 1);
    assert!(file.exists());

    let fresh_lookup = Arc::new(CountingLookup::new("should not be asked"));
    let second = resolver(
        &config,
        VendorCache::load(&file, config.cache_expiry),
        &fresh_lookup,
        &clock,
    );
    let info = second.resolve("2C:CF:67:65:43:21").await;

    assert_eq!(info.vendor, "Raspberry Pi Trading Ltd");
    assert_eq!(info.source, IdentitySource::Cache);
    assert_eq!(info.device_types, ["raspberry-pi", "iot-device"]);
    assert_eq!(fresh_lookup.calls(), 0);
}

#[tokio::test]
async fn test_corrupt_cache_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("vendors.json");
    std::fs::write(&file, "{ not json").unwrap();

    let cache = VendorCache::load(&file, Duration::from_secs(60));
    assert!(cache.is_empty());
}

// ── Online tier ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_for_one_oui_coalesce() {
    let config = IdentityConfig::default();
    let clock = ManualClock::new(epoch());
    let lookup = Arc::new(CountingLookup {
        delay: Duration::from_millis(100),
        ..CountingLookup::new("Espressif Inc")
    });
    let resolver = Arc::new(resolver(
        &config,
        VendorCache::in_memory(config.cache_expiry),
        &lookup,
        &clock,
    ));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.resolve(&format!("7C:DF:A1:00:00:{i:02X}")).await })
        })
        .collect();

    for task in tasks {
        let info = task.await.unwrap();
        assert_eq!(info.vendor, "Espressif Inc");
    }
    assert_eq!(lookup.calls(), 1);
    assert_eq!(resolver.stats().rate_limited, 0);
}

#[tokio::test]
async fn test_rate_limit_response_starts_cooldown() {
    let config = IdentityConfig {
        requests_per_window: 10,
        cooldown: Duration::from_secs(60),
        ..IdentityConfig::default()
    };
    let clock = ManualClock::new(epoch());
    let lookup = Arc::new(CountingLookup {
        rate_limited: true,
        ..CountingLookup::new("unused")
    });
    let resolver = resolver(&config, VendorCache::in_memory(config.cache_expiry), &lookup, &clock);

    let info = resolver.resolve("00:11:22:33:44:55").await;
    assert!(!info.is_known());
    assert_eq!(info.confidence, Confidence::Low);
    assert_eq!(lookup.calls(), 1);

    // Cooldown is max(Retry-After, configured), so 60s here.
    clock.advance(TimeDelta::seconds(30));
    resolver.resolve("00:11:23:33:44:55").await;
    assert_eq!(lookup.calls(), 1);

    clock.advance(TimeDelta::seconds(31));
    resolver.resolve("00:11:24:33:44:55").await;
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_locally_administered_mac_skips_registry() {
    let config = IdentityConfig::default();
    let clock = ManualClock::new(epoch());
    let lookup = Arc::new(CountingLookup::new("unused"));
    let resolver = resolver(&config, VendorCache::in_memory(config.cache_expiry), &lookup, &clock);

    let info = resolver.resolve("02:00:5E:10:20:30").await;

    assert_eq!(info.source, IdentitySource::Unknown);
    assert_eq!(info.device_type(), "unknown");
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_malformed_mac_is_low_confidence_without_io() {
    let config = IdentityConfig::default();
    let clock = ManualClock::new(epoch());
    let lookup = Arc::new(CountingLookup::new("unused"));
    let resolver = resolver(&config, VendorCache::in_memory(config.cache_expiry), &lookup, &clock);

    let info = resolver.resolve("zz:zz").await;

    assert!(!info.is_known());
    assert_eq!(info.oui, None);
    assert_eq!(resolver.stats().malformed, 1);
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_from_config_uses_http_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/registry/F0F61C"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Apple, Inc."))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/registry/3CCDEF"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = IdentityConfig {
        lookup_url: Some(Url::parse(&format!("{}/registry/", server.uri())).unwrap()),
        requests_per_window: 10,
        ..IdentityConfig::default()
    };
    let resolver =
        IdentityResolver::from_config(&config, Arc::new(ManualClock::new(epoch()))).unwrap();

    let apple = resolver.resolve("f0:f6:1c:aa:bb:cc").await;
    assert_eq!(apple.vendor, "Apple, Inc.");
    assert_eq!(apple.source, IdentitySource::Online);

    let again = resolver.resolve("F0:F6:1C:00:00:01").await;
    assert_eq!(again.source, IdentitySource::Cache);

    let missing = resolver.resolve("3C:CD:EF:00:00:01").await;
    assert!(!missing.is_known());
    assert_eq!(resolver.stats().online_lookups, 2);
}

#[test]
fn test_from_config_rejects_zero_rate() {
    let config = IdentityConfig {
        requests_per_window: 0,
        ..IdentityConfig::default()
    };
    let err = IdentityResolver::from_config(&config, Arc::new(ManualClock::new(epoch())));
    assert!(err.is_err());
}

#[test]
fn test_offline_config_builds_without_registry() {
    let config = IdentityConfig {
        online_lookup: false,
        requests_per_window: 0,
        ..IdentityConfig::default()
    };
    let resolver = tokio_test::assert_ok!(IdentityResolver::from_config(
        &config,
        Arc::new(ManualClock::new(epoch()))
    ));
    let info = tokio_test::block_on(resolver.resolve("00:0C:29:AA:BB:CC"));
    assert_eq!(info.vendor, "VMware, Inc.");
    assert_eq!(info.source, IdentitySource::LocalTable);
    assert_eq!(info.confidence, Confidence::High);
}
