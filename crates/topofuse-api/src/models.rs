// Source wire types
//
// Raw JSON shapes returned by each topology source. Fields use
// `#[serde(default)]` liberally because appliance firmware is inconsistent
// about field presence; anything not modelled explicitly lands in `extra`.
// Conversion into domain types happens in `topofuse-core`, never here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Firewall envelope ────────────────────────────────────────────────

/// Firewall monitor endpoints wrap their payload:
/// ```json
/// { "http_status": 200, "status": "success", "results": [...] }
/// ```
#[derive(Debug, Deserialize)]
pub struct FirewallResponse<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

// ── Switch controller ────────────────────────────────────────────────

/// Managed switch from the firewall's switch-controller status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedSwitch {
    #[serde(default)]
    pub serial: Option<String>,
    /// Switch name as configured on the firewall (the detected-device join key).
    #[serde(default, rename = "switch-id")]
    pub switch_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    /// Management address the switch connects from.
    #[serde(default)]
    pub connecting_from: Option<String>,
    /// `"Connected"`, `"Disconnected"`, `"Authorized"`, ...
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ports: Vec<ManagedSwitchPort>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedSwitchPort {
    #[serde(default, alias = "port_name", alias = "name")]
    pub interface: Option<String>,
    /// `"up"` / `"down"`.
    #[serde(default)]
    pub status: Option<String>,
    /// Either a number (Mbps) or a string such as `"1000full"`.
    #[serde(default)]
    pub speed: Option<Value>,
    /// VLAN id as number or numeric string.
    #[serde(default)]
    pub vlan: Option<Value>,
}

// ── Detected devices ─────────────────────────────────────────────────

/// A MAC address learned on a managed switch port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedDevice {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub switch_id: Option<String>,
    #[serde(default)]
    pub port_name: Option<String>,
    #[serde(default)]
    pub vlan_id: Option<Value>,
    /// Seconds since the device was last seen.
    #[serde(default)]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

// ── Cloud switches ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSwitch {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub lan_ip: Option<String>,
    /// `"online"`, `"offline"`, `"alerting"`, `"dormant"`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ports: Vec<CloudSwitchPort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSwitchPort {
    #[serde(default)]
    pub port_id: Option<String>,
    /// `"Connected"`, `"Disconnected"`, `"Disabled"`.
    #[serde(default)]
    pub status: Option<String>,
    /// e.g. `"1 Gbps"`, `"100 Mbps"`.
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub vlan: Option<u16>,
    #[serde(default)]
    pub clients: Vec<CloudClient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudClient {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Epoch seconds.
    #[serde(default)]
    pub last_seen: Option<i64>,
}

// ── Discovery scanner ────────────────────────────────────────────────

/// Scanner responses come in three shapes depending on version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ScannerEnvelope {
    Hosts { hosts: Vec<ScannerHost> },
    Data { data: Vec<ScannerHost> },
    Bare(Vec<ScannerHost>),
}

impl ScannerEnvelope {
    pub(crate) fn into_hosts(self) -> Vec<ScannerHost> {
        match self {
            Self::Hosts { hosts } => hosts,
            Self::Data { data } => data,
            Self::Bare(hosts) => hosts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerHost {
    #[serde(default, alias = "ip_address", alias = "address")]
    pub ip: Option<String>,
    #[serde(default, alias = "mac_address")]
    pub mac: Option<String>,
    #[serde(default, alias = "name")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub services: Vec<ScannerService>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerService {
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_protocol() -> String {
    "tcp".into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scanner_envelope_accepts_all_shapes() {
        let host = json!({ "ip": "10.0.0.5", "services": [{ "port": 22 }] });
        for body in [
            json!({ "hosts": [host.clone()] }),
            json!({ "data": [host.clone()] }),
            json!([host]),
        ] {
            let env: ScannerEnvelope = serde_json::from_value(body).unwrap();
            let hosts = env.into_hosts();
            assert_eq!(hosts.len(), 1);
            assert_eq!(hosts[0].services[0].protocol, "tcp");
        }
    }

    #[test]
    fn managed_switch_keeps_unknown_fields() {
        let raw = json!({
            "serial": "S124EP0000001",
            "switch-id": "core-sw",
            "status": "Connected",
            "fgt_peer_intf_name": "fortilink",
            "ports": [{ "interface": "port1", "status": "up", "speed": 1000, "vlan": "10" }]
        });
        let sw: ManagedSwitch = serde_json::from_value(raw).unwrap();
        assert_eq!(sw.switch_id.as_deref(), Some("core-sw"));
        assert_eq!(sw.ports[0].interface.as_deref(), Some("port1"));
        assert!(sw.extra.contains_key("fgt_peer_intf_name"));
    }
}
