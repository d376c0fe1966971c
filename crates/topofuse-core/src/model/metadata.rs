// ── Fusion metadata ──
//
// Everything a dashboard needs to explain why a topology is incomplete.
// Data-source failures are reported here and nowhere else.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::source::SourceKind;
use super::topology::TopologyGraph;
use crate::error::SourceError;

/// Which source(s) established the switch/port skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum SkeletonSource {
    #[serde(rename = "switch_controller")]
    #[strum(serialize = "switch_controller")]
    SwitchController,
    #[serde(rename = "snmp_static")]
    #[strum(serialize = "snmp_static")]
    SnmpStatic,
    /// Controller switches first, SNMP filling in serials the controller lacks.
    #[serde(rename = "switch_controller+snmp_static")]
    #[strum(serialize = "switch_controller+snmp_static")]
    Combined,
    /// No skeleton source succeeded; the graph is empty by construction.
    #[serde(rename = "none_available")]
    #[strum(serialize = "none_available")]
    NoneAvailable,
}

/// A source that contributed nothing this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub kind: SourceKind,
    pub error: SourceError,
}

/// What one source reported, after adapter-level validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub switches: usize,
    pub ports: usize,
    pub devices: usize,
    pub hosts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionMetadata {
    /// `true` when served from the response cache without any fan-out.
    pub cached: bool,
    pub source: SkeletonSource,
    /// Successful sources, in registration order.
    pub sources_succeeded: Vec<String>,
    /// Failed sources, in registration order.
    pub errors: Vec<SourceFailure>,
    /// Per-source record counts, keyed by source name in registration order.
    pub counts: IndexMap<String, SourceCounts>,
    pub ports_overlaid: usize,
    /// Detected-device `(switch, port)` keys with no skeleton port to land on.
    pub unmatched_ports: usize,
    pub malformed_records: usize,
    pub scanner_hosts_matched: usize,
    pub scanner_hosts_appended: usize,
    /// Scanner hosts with neither a match nor a MAC to place them by.
    pub scanner_hosts_unplaced: usize,
    pub identities_resolved: usize,
    pub fusion_latency_ms: u64,
    pub generated_at: DateTime<Utc>,
}

impl FusionMetadata {
    pub fn new(source: SkeletonSource, generated_at: DateTime<Utc>) -> Self {
        Self {
            cached: false,
            source,
            sources_succeeded: Vec::new(),
            errors: Vec::new(),
            counts: IndexMap::new(),
            ports_overlaid: 0,
            unmatched_ports: 0,
            malformed_records: 0,
            scanner_hosts_matched: 0,
            scanner_hosts_appended: 0,
            scanner_hosts_unplaced: 0,
            identities_resolved: 0,
            fusion_latency_ms: 0,
            generated_at,
        }
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|f| f.source.as_str())
    }

    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty() || self.source == SkeletonSource::NoneAvailable
    }
}

/// The engine's answer: the fused graph plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyResponse {
    pub graph: TopologyGraph,
    pub metadata: FusionMetadata,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_labels_match_wire_names() {
        assert_eq!(SkeletonSource::NoneAvailable.to_string(), "none_available");
        assert_eq!(
            serde_json::to_value(SkeletonSource::Combined).unwrap(),
            "switch_controller+snmp_static"
        );
    }

    #[test]
    fn metadata_survives_json_round_trip() {
        let mut meta = FusionMetadata::new(SkeletonSource::SwitchController, Utc::now());
        meta.errors.push(SourceFailure {
            source: "scanner".into(),
            kind: SourceKind::Scanner,
            error: SourceError::Timeout { timeout_ms: 10 },
        });
        meta.counts.insert("fw".into(), SourceCounts::default());
        let json = serde_json::to_value(&meta).unwrap();
        let back: FusionMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.failed_sources().collect::<Vec<_>>(), ["scanner"]);
    }
}
