use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use tracing::{debug, warn};

use topofuse_api::SourceClient;
use topofuse_api::models::DetectedDevice;

use super::{FetchContext, SourceAdapter};
use crate::clock::{Clock, SystemClock};
use crate::convert::{non_empty, parse_ip, parse_vlan};
use crate::error::SourceError;
use crate::model::{ConnectedDevice, MacAddress, Port, PortStatus, SourceKind, SourcePayload, Switch};

/// Real-time MAC tables learned by the managed switches.
///
/// Produces partial switches (name plus the ports that have devices); the
/// engine joins them onto the skeleton by `(switch, port)`.
#[derive(Debug, Clone)]
pub struct DetectedDeviceAdapter {
    name: String,
    client: SourceClient,
    clock: Arc<dyn Clock>,
}

impl DetectedDeviceAdapter {
    pub fn new(name: impl Into<String>, client: SourceClient) -> Self {
        Self::with_clock(name, client, Arc::new(SystemClock))
    }

    /// `last_seen` is reported relative to now; the clock supplies "now".
    pub fn with_clock(name: impl Into<String>, client: SourceClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            client,
            clock,
        }
    }
}

#[async_trait]
impl SourceAdapter for DetectedDeviceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::DetectedDevices
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<SourcePayload, SourceError> {
        let raw = ctx.guard(self.client.detected_devices()).await?;
        debug!(source = %self.name, records = raw.len(), "detected devices fetched");
        Ok(normalize(&self.name, raw, self.clock.now()))
    }
}

pub(crate) fn normalize(source: &str, raw: Vec<DetectedDevice>, now: DateTime<Utc>) -> SourcePayload {
    let mut malformed = 0usize;
    // switch name -> port name -> port, both in first-seen order
    let mut grouped: IndexMap<String, IndexMap<String, Port>> = IndexMap::new();

    for rec in raw {
        let (Some(switch_id), Some(port_name)) = (
            non_empty(rec.switch_id.as_deref()),
            non_empty(rec.port_name.as_deref()),
        ) else {
            malformed += 1;
            continue;
        };
        let Some(mac) = rec.mac.as_deref().and_then(|m| MacAddress::parse(m).ok()) else {
            warn!(source, raw_mac = ?rec.mac, %switch_id, %port_name, "detected device with invalid MAC dropped");
            malformed += 1;
            continue;
        };

        let port = grouped
            .entry(switch_id)
            .or_default()
            .entry(port_name.clone())
            .or_insert_with(|| {
                let mut p = Port::new(port_name);
                p.status = PortStatus::Up;
                p
            });
        if port.vlan.is_none() {
            port.vlan = parse_vlan(rec.vlan_id.as_ref());
        }

        let mut device = ConnectedDevice::new(mac, source);
        device.ip = parse_ip(rec.ip.as_deref());
        device.hostname = non_empty(rec.hostname.as_deref());
        device.last_seen = rec
            .last_seen
            .filter(|secs| *secs >= 0)
            .and_then(TimeDelta::try_seconds)
            .and_then(|ago| now.checked_sub_signed(ago));
        port.insert_device(device);
    }

    let switches = grouped
        .into_iter()
        .map(|(switch_id, ports)| {
            let mut sw = Switch::new(switch_id.clone(), switch_id, source);
            sw.ports = ports.into_values().collect();
            sw
        })
        .collect();

    SourcePayload {
        switches,
        hosts: Vec::new(),
        malformed,
    }
}
