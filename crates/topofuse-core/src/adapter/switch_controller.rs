use async_trait::async_trait;
use tracing::{debug, warn};

use topofuse_api::SourceClient;
use topofuse_api::models::ManagedSwitch;

use super::{FetchContext, SourceAdapter};
use crate::convert::{non_empty, parse_ip, parse_speed, parse_vlan, port_status, switch_status};
use crate::error::SourceError;
use crate::model::{Port, SourceKind, SourcePayload, Switch, SwitchType};

/// Firewall switch-controller: the authoritative switch/port skeleton.
#[derive(Debug, Clone)]
pub struct SwitchControllerAdapter {
    name: String,
    client: SourceClient,
}

impl SwitchControllerAdapter {
    pub fn new(name: impl Into<String>, client: SourceClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for SwitchControllerAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SwitchController
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<SourcePayload, SourceError> {
        let raw = ctx.guard(self.client.managed_switches()).await?;
        debug!(source = %self.name, switches = raw.len(), "managed switches fetched");
        Ok(normalize(&self.name, raw))
    }
}

pub(crate) fn normalize(source: &str, raw: Vec<ManagedSwitch>) -> SourcePayload {
    let mut payload = SourcePayload::default();

    for ms in raw {
        let Some(serial) = non_empty(ms.serial.as_deref()) else {
            warn!(source, name = ?ms.switch_id, "managed switch without serial dropped");
            payload.malformed += 1;
            continue;
        };
        if payload.switches.iter().any(|s| s.serial == serial) {
            debug!(source, %serial, "duplicate serial ignored");
            continue;
        }

        // `switch-id` is what detected-device records reference.
        let name = non_empty(ms.switch_id.as_deref())
            .or_else(|| non_empty(ms.name.as_deref()))
            .unwrap_or_else(|| serial.clone());

        let mut switch = Switch::new(serial, name, source);
        switch.model = non_empty(ms.model.as_deref());
        switch.management_ip = parse_ip(ms.connecting_from.as_deref());
        switch.status = switch_status(ms.status.as_deref());
        switch.switch_type = SwitchType::Native;

        for p in ms.ports {
            let Some(port_name) = non_empty(p.interface.as_deref()) else {
                payload.malformed += 1;
                continue;
            };
            let mut port = Port::new(port_name);
            port.status = port_status(p.status.as_deref());
            port.speed_mbps = parse_speed(p.speed.as_ref());
            port.vlan = parse_vlan(p.vlan.as_ref());
            switch.insert_port(port);
        }

        payload.switches.push(switch);
    }

    payload
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{PortStatus, SwitchStatus};
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Vec<ManagedSwitch> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn builds_skeleton_and_counts_malformed() {
        let raw = parse(json!([
            {
                "serial": "S248EP0001",
                "switch-id": "SW1",
                "model": "FS-248E",
                "connecting_from": "10.0.0.2",
                "status": "Connected",
                "ports": [
                    { "interface": "port1", "status": "up", "speed": "1000full", "vlan": 10 },
                    { "interface": "port1", "status": "down" },
                    { "status": "up" }
                ]
            },
            { "switch-id": "nameless" },
            { "serial": "S248EP0001", "switch-id": "dup" }
        ]));

        let payload = normalize("fw", raw);
        assert_eq!(payload.switches.len(), 1);
        assert_eq!(payload.malformed, 2);

        let sw = &payload.switches[0];
        assert_eq!(sw.name, "SW1");
        assert_eq!(sw.status, SwitchStatus::Online);
        assert_eq!(sw.ports.len(), 1);
        let port = sw.port("port1").unwrap();
        assert_eq!(port.status, PortStatus::Up);
        assert_eq!(port.speed_mbps, Some(1000));
        assert_eq!(port.vlan, Some(10));
    }

    #[test]
    fn name_falls_back_to_serial() {
        let payload = normalize("fw", parse(json!([{ "serial": "ABC" }])));
        assert_eq!(payload.switches[0].name, "ABC");
    }
}
