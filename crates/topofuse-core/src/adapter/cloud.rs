use async_trait::async_trait;
use tracing::debug;

use topofuse_api::SourceClient;
use topofuse_api::models::CloudSwitch;

use super::{FetchContext, SourceAdapter};
use crate::convert::{
    epoch_to_datetime, non_empty, parse_ip, parse_speed_text, port_status, switch_status,
};
use crate::error::SourceError;
use crate::model::{ConnectedDevice, MacAddress, Port, SourceKind, SourcePayload, Switch, SwitchType};

/// Third-party cloud-managed switches, listed alongside native ones.
#[derive(Debug, Clone)]
pub struct CloudSwitchAdapter {
    name: String,
    client: SourceClient,
}

impl CloudSwitchAdapter {
    pub fn new(name: impl Into<String>, client: SourceClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for CloudSwitchAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CloudSwitch
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<SourcePayload, SourceError> {
        let raw = ctx.guard(self.client.cloud_switches()).await?;
        debug!(source = %self.name, switches = raw.len(), "cloud switches fetched");
        Ok(normalize(&self.name, raw))
    }
}

pub(crate) fn normalize(source: &str, raw: Vec<CloudSwitch>) -> SourcePayload {
    let mut payload = SourcePayload::default();

    for cs in raw {
        let Some(serial) = non_empty(cs.serial.as_deref()) else {
            payload.malformed += 1;
            continue;
        };
        if payload.switches.iter().any(|s| s.serial == serial) {
            continue;
        }
        let name = non_empty(cs.name.as_deref()).unwrap_or_else(|| serial.clone());
        let mut switch = Switch::new(serial, name, source);
        switch.switch_type = SwitchType::Cloud;
        switch.model = non_empty(cs.model.as_deref());
        switch.management_ip = parse_ip(cs.lan_ip.as_deref());
        switch.status = switch_status(cs.status.as_deref());

        for cp in cs.ports {
            let Some(port_name) = non_empty(cp.port_id.as_deref()) else {
                payload.malformed += 1;
                continue;
            };
            let mut port = Port::new(port_name);
            port.status = port_status(cp.status.as_deref());
            port.speed_mbps = cp.speed.as_deref().and_then(parse_speed_text);
            port.vlan = cp.vlan.filter(|v| (1..=4094).contains(v));
            for client in cp.clients {
                let Some(mac) = client.mac.as_deref().and_then(|m| MacAddress::parse(m).ok())
                else {
                    payload.malformed += 1;
                    continue;
                };
                let mut device = ConnectedDevice::new(mac, source);
                device.ip = parse_ip(client.ip.as_deref());
                device.hostname = non_empty(client.description.as_deref());
                device.last_seen = epoch_to_datetime(client.last_seen);
                port.insert_device(device);
            }
            switch.insert_port(port);
        }
        payload.switches.push(switch);
    }

    payload
}
