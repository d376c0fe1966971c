use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{FetchContext, SourceAdapter};
use crate::convert::{non_empty, parse_ip, parse_speed, parse_vlan, port_status, switch_status};
use crate::error::SourceError;
use crate::model::{ConnectedDevice, MacAddress, Port, SourceKind, SourcePayload, Switch};

/// Inventory file produced by an offline SNMP walk.
///
/// ```json
/// { "switches": [ { "serial": "...", "name": "SW1", "ip": "10.0.0.2",
///   "ports": [ { "name": "port1", "devices": [ { "mac": "..." } ] } ] } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub switches: Vec<InventorySwitch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySwitch {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default, alias = "sysName")]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "management_ip")]
    pub ip: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ports: Vec<InventoryPort>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryPort {
    #[serde(default, alias = "ifName")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub speed: Option<Value>,
    #[serde(default)]
    pub vlan: Option<Value>,
    #[serde(default)]
    pub devices: Vec<InventoryDevice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDevice {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Static SNMP-derived inventory read from disk: the fallback skeleton.
#[derive(Debug, Clone)]
pub struct SnmpInventoryAdapter {
    name: String,
    path: PathBuf,
}

impl SnmpInventoryAdapter {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for SnmpInventoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SnmpStatic
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<SourcePayload, SourceError> {
        let path = &self.path;
        let text = ctx
            .guard(async {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| SourceError::Unavailable {
                        message: format!("{}: {e}", path.display()),
                    })
            })
            .await?;
        let doc: InventoryDocument =
            serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
                message: format!("{}: {e}", path.display()),
            })?;
        debug!(source = %self.name, switches = doc.switches.len(), "inventory loaded");
        Ok(normalize(&self.name, doc))
    }
}

pub(crate) fn normalize(source: &str, doc: InventoryDocument) -> SourcePayload {
    let mut payload = SourcePayload::default();

    for inv in doc.switches {
        let Some(serial) = non_empty(inv.serial.as_deref()) else {
            payload.malformed += 1;
            continue;
        };
        if payload.switches.iter().any(|s| s.serial == serial) {
            continue;
        }
        let name = non_empty(inv.name.as_deref()).unwrap_or_else(|| serial.clone());
        let mut switch = Switch::new(serial, name, source);
        switch.model = non_empty(inv.model.as_deref());
        switch.management_ip = parse_ip(inv.ip.as_deref());
        switch.status = switch_status(inv.status.as_deref());

        for ip in inv.ports {
            let Some(port_name) = non_empty(ip.name.as_deref()) else {
                payload.malformed += 1;
                continue;
            };
            let mut port = Port::new(port_name);
            port.status = port_status(ip.status.as_deref());
            port.speed_mbps = parse_speed(ip.speed.as_ref());
            port.vlan = parse_vlan(ip.vlan.as_ref());
            for dev in ip.devices {
                let Some(mac) = dev.mac.as_deref().and_then(|m| MacAddress::parse(m).ok()) else {
                    payload.malformed += 1;
                    continue;
                };
                let mut device = ConnectedDevice::new(mac, source);
                device.ip = parse_ip(dev.ip.as_deref());
                device.hostname = non_empty(dev.hostname.as_deref());
                port.insert_device(device);
            }
            switch.insert_port(port);
        }
        payload.switches.push(switch);
    }

    payload
}
