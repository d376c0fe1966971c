// ── Per-source results ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::topology::{ScannedHost, Switch};
use crate::error::SourceError;

/// The role a source plays in the merge.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Firewall switch-controller config: authoritative skeleton.
    SwitchController,
    /// Static SNMP-derived inventory: fallback skeleton.
    SnmpStatic,
    /// Real-time MAC tables: highest trust for device presence.
    DetectedDevices,
    /// Third-party cloud switches, listed alongside native ones.
    CloudSwitch,
    /// Discovery scanner hosts: final enrichment pass.
    Scanner,
}

/// What an adapter hands back on success.
#[derive(Debug, Clone, Default)]
pub struct SourcePayload {
    pub switches: Vec<Switch>,
    pub hosts: Vec<ScannedHost>,
    /// Records dropped at the adapter boundary for missing join keys.
    pub malformed: usize,
}

/// One adapter's contribution to a fusion cycle, successful or not.
#[derive(Debug, Clone)]
pub struct SourceResult {
    pub source_name: String,
    pub kind: SourceKind,
    pub switches: Vec<Switch>,
    pub hosts: Vec<ScannedHost>,
    pub malformed: usize,
    pub fetched_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// `None` on success. A failed source always has empty `switches`/`hosts`.
    pub error: Option<SourceError>,
}

impl SourceResult {
    pub fn from_outcome(
        source_name: impl Into<String>,
        kind: SourceKind,
        outcome: Result<SourcePayload, SourceError>,
        fetched_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let (payload, error) = match outcome {
            Ok(payload) => (payload, None),
            Err(e) => (SourcePayload::default(), Some(e)),
        };
        Self {
            source_name: source_name.into(),
            kind,
            switches: payload.switches,
            hosts: payload.hosts,
            malformed: payload.malformed,
            fetched_at,
            elapsed_ms,
            error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
