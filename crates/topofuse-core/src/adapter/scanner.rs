use async_trait::async_trait;
use tracing::debug;

use topofuse_api::SourceClient;
use topofuse_api::models::ScannerHost;

use super::{FetchContext, SourceAdapter};
use crate::convert::{non_empty, parse_ip};
use crate::error::SourceError;
use crate::model::{MacAddress, ScannedHost, Service, SourceKind, SourcePayload};

/// Network discovery scanner hosts: the final enrichment pass.
#[derive(Debug, Clone)]
pub struct ScannerAdapter {
    name: String,
    client: SourceClient,
}

impl ScannerAdapter {
    pub fn new(name: impl Into<String>, client: SourceClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for ScannerAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Scanner
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<SourcePayload, SourceError> {
        let raw = ctx.guard(self.client.scanner_hosts()).await?;
        debug!(source = %self.name, hosts = raw.len(), "scanner hosts fetched");
        Ok(normalize(raw))
    }
}

/// A host needs an IP or a valid MAC to be matched or placed.
pub(crate) fn normalize(raw: Vec<ScannerHost>) -> SourcePayload {
    let mut payload = SourcePayload::default();

    for host in raw {
        let ip = parse_ip(host.ip.as_deref());
        let mac = host.mac.as_deref().and_then(|m| MacAddress::parse(m).ok());
        if ip.is_none() && mac.is_none() {
            payload.malformed += 1;
            continue;
        }
        let duplicate = payload
            .hosts
            .iter()
            .any(|h| (ip.is_some() && h.ip == ip) || (mac.is_some() && h.mac == mac));
        if duplicate {
            continue;
        }

        let mut services: Vec<Service> = Vec::new();
        for svc in host.services {
            let protocol = svc.protocol.trim().to_ascii_lowercase();
            if services
                .iter()
                .any(|s| s.port == svc.port && s.protocol == protocol)
            {
                continue;
            }
            services.push(Service {
                port: svc.port,
                protocol,
                name: non_empty(svc.name.as_deref()),
            });
        }

        payload.hosts.push(ScannedHost {
            ip,
            mac,
            hostname: non_empty(host.hostname.as_deref()),
            services,
        });
    }

    payload
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hosts_need_an_address() {
        let raw: Vec<ScannerHost> = serde_json::from_value(json!([
            { "ip": "10.0.0.5", "services": [ { "port": 22 }, { "port": 22, "protocol": "TCP" }, { "port": 53, "protocol": "udp" } ] },
            { "mac": "aa:bb:cc:00:00:01", "hostname": "nas" },
            { "hostname": "ghost" },
            { "ip": "10.0.0.5" }
        ]))
        .unwrap();

        let payload = normalize(raw);
        assert_eq!(payload.malformed, 1);
        assert_eq!(payload.hosts.len(), 2);
        assert_eq!(payload.hosts[0].services.len(), 2);
        assert_eq!(payload.hosts[1].hostname.as_deref(), Some("nas"));
    }
}
