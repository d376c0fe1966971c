//! Topology fusion between `topofuse-api` and its consumers.
//!
//! This crate turns several schema-incompatible network sources into one
//! switch/port/device graph:
//!
//! - **[`FusionEngine`]**: Request lifecycle: response-cache lookup,
//!   concurrent fan-out to every [`SourceAdapter`] under a shared deadline,
//!   deterministic priority merge ([`engine::fuse`]), vendor enrichment, and
//!   cache write. Source failures degrade the result and are reported in
//!   [`FusionMetadata`]; only configuration mistakes are errors.
//!
//! - **[`SourceAdapter`]**: One implementation per backing system
//!   (switch controller, detected devices, SNMP inventory, cloud switches,
//!   discovery scanner), each normalizing its own wire format.
//!
//! - **[`IdentityResolver`]**: MAC → vendor through a local OUI table, an
//!   on-disk [`VendorCache`], and a rate-limited online registry, with
//!   in-flight lookups coalesced per OUI.
//!
//! - **[`ResponseCache`]**: TTL key/value cache over a pluggable
//!   [`CacheBackend`]; backend failures are a transparent pass-through.
//!
//! - **Domain model** ([`model`]): `Switch`, `Port`, `ConnectedDevice`,
//!   and a validated [`MacAddress`].

pub mod adapter;
pub mod cache;
pub mod clock;
pub mod config;
mod convert;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use adapter::{FetchContext, SourceAdapter};
pub use cache::{CacheBackend, CacheError, CacheStats, MemoryBackend, ResponseCache, cache_key};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, IdentityConfig, SourceConfig, SourceEndpoint};
pub use engine::{EngineStats, FusionEngine, TopologyFilter};
pub use error::{CoreError, SourceError};
pub use identity::{
    IdentityInfo, IdentityResolver, IdentitySource, ResolverStats, VendorCache, VendorCacheEntry,
    VendorLookup,
};
pub use model::{
    Confidence, ConnectedDevice, FusionMetadata, MacAddress, Oui, Port, PortStatus, ScannedHost,
    Service, SkeletonSource, SourceCounts, SourceFailure, SourceKind, SourcePayload, SourceResult,
    Switch, SwitchStatus, SwitchType, TopologyGraph, TopologyResponse,
};
