// ── Domain model ──
//
// Typed records every adapter normalizes into. The engine never touches
// raw source JSON.

pub mod mac;
pub mod metadata;
pub mod source;
pub mod topology;

pub use mac::{MacAddress, MacParseError, Oui};
pub use metadata::{FusionMetadata, SkeletonSource, SourceCounts, SourceFailure, TopologyResponse};
pub use source::{SourceKind, SourcePayload, SourceResult};
pub use topology::{
    Confidence, ConnectedDevice, Port, PortStatus, ScannedHost, Service, Switch, SwitchStatus,
    SwitchType, TopologyGraph,
};
