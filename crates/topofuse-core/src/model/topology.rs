// ── Fused topology types ──

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mac::MacAddress;

/// Switch reachability as reported by its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchStatus {
    Online,
    Offline,
    Unknown,
}

/// Where a switch record comes from in the fused view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchType {
    /// Managed by the firewall (switch controller or SNMP inventory).
    Native,
    /// Managed by the third-party cloud controller; never merged with native switches.
    Cloud,
    /// Synthetic holder for scanner hosts that matched no known port.
    Discovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Up,
    Down,
    Unknown,
}

/// How much to trust a resolved vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A network service reported by the discovery scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub port: u16,
    pub protocol: String,
    pub name: Option<String>,
}

/// An endpoint seen on a switch port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedDevice {
    pub mac: MacAddress,
    pub ip: Option<IpAddr>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub device_type: Option<String>,
    pub identity_confidence: Option<Confidence>,
    pub last_seen: Option<DateTime<Utc>>,
    /// The source whose fields this record carries.
    pub source_name: String,
    /// Every source that reported this MAC on this port.
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

impl ConnectedDevice {
    pub fn new(mac: MacAddress, source_name: impl Into<String>) -> Self {
        let source_name = source_name.into();
        Self {
            mac,
            ip: None,
            hostname: None,
            vendor: None,
            device_type: None,
            identity_confidence: None,
            last_seen: None,
            sources: vec![source_name.clone()],
            source_name,
            services: Vec::new(),
        }
    }

    /// Record another contributing source, keeping first-seen order.
    pub fn note_source(&mut self, source: &str) {
        if !self.sources.iter().any(|s| s == source) {
            self.sources.push(source.to_owned());
        }
    }

    pub fn has_vendor(&self) -> bool {
        self.vendor.as_deref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Unique within its switch; half of the `(switch, port)` join key.
    pub name: String,
    pub status: PortStatus,
    pub speed_mbps: Option<u32>,
    pub vlan: Option<u16>,
    pub devices: Vec<ConnectedDevice>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PortStatus::Unknown,
            speed_mbps: None,
            vlan: None,
            devices: Vec::new(),
        }
    }

    /// Add a device unless its MAC is already on this port (first seen wins).
    pub fn insert_device(&mut self, device: ConnectedDevice) -> bool {
        if self.devices.iter().any(|d| d.mac == device.mac) {
            return false;
        }
        self.devices.push(device);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    /// Stable identity key.
    pub serial: String,
    pub name: String,
    pub model: Option<String>,
    pub management_ip: Option<IpAddr>,
    pub status: SwitchStatus,
    pub switch_type: SwitchType,
    pub source_name: String,
    pub ports: Vec<Port>,
}

impl Switch {
    pub fn new(serial: impl Into<String>, name: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            name: name.into(),
            model: None,
            management_ip: None,
            status: SwitchStatus::Unknown,
            switch_type: SwitchType::Native,
            source_name: source_name.into(),
            ports: Vec::new(),
        }
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    /// Add a port unless one with the same name exists (first seen wins).
    pub fn insert_port(&mut self, port: Port) -> bool {
        if self.port(&port.name).is_some() {
            return false;
        }
        self.ports.push(port);
        true
    }

    pub fn device_count(&self) -> usize {
        self.ports.iter().map(|p| p.devices.len()).sum()
    }
}

/// A host found by the discovery scanner, before placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedHost {
    pub ip: Option<IpAddr>,
    pub mac: Option<MacAddress>,
    pub hostname: Option<String>,
    pub services: Vec<Service>,
}

/// The fused switch/port/device graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub switches: Vec<Switch>,
}

impl TopologyGraph {
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    pub fn switch(&self, name_or_serial: &str) -> Option<&Switch> {
        self.switches
            .iter()
            .find(|s| s.name == name_or_serial)
            .or_else(|| self.switches.iter().find(|s| s.serial == name_or_serial))
    }

    pub fn port_count(&self) -> usize {
        self.switches.iter().map(|s| s.ports.len()).sum()
    }

    pub fn device_count(&self) -> usize {
        self.switches.iter().map(Switch::device_count).sum()
    }

    /// Every placed device, in graph order.
    pub fn devices(&self) -> impl Iterator<Item = &ConnectedDevice> {
        self.switches
            .iter()
            .flat_map(|s| s.ports.iter())
            .flat_map(|p| p.devices.iter())
    }

    pub(crate) fn devices_mut(&mut self) -> impl Iterator<Item = &mut ConnectedDevice> {
        self.switches
            .iter_mut()
            .flat_map(|s| s.ports.iter_mut())
            .flat_map(|p| p.devices.iter_mut())
    }
}
