//! `topofuse topology`: run one fusion cycle and print the result.

use owo_colors::OwoColorize;
use tabled::Tabled;

use topofuse_core::{ConnectedDevice, Port, Switch, TopologyFilter, TopologyResponse};

use crate::cli::{GlobalOpts, TopologyArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Switch")]
    switch: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "VLAN")]
    vlan: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Sources")]
    sources: String,
}

impl DeviceRow {
    fn new(sw: &Switch, port: &Port, d: &ConnectedDevice) -> Self {
        Self {
            switch: sw.name.clone(),
            port: port.name.clone(),
            vlan: port.vlan.map(|v| v.to_string()).unwrap_or_default(),
            mac: d.mac.to_string(),
            ip: d.ip.map(|ip| ip.to_string()).unwrap_or_default(),
            hostname: d.hostname.clone().unwrap_or_default(),
            vendor: d.vendor.clone().unwrap_or_default(),
            device_type: d.device_type.clone().unwrap_or_default(),
            sources: d.sources.join(","),
        }
    }
}

fn rows(resp: &TopologyResponse) -> Vec<DeviceRow> {
    resp.graph
        .switches
        .iter()
        .flat_map(|sw| {
            sw.ports
                .iter()
                .flat_map(move |p| p.devices.iter().map(move |d| DeviceRow::new(sw, p, d)))
        })
        .collect()
}

fn plain(resp: &TopologyResponse) -> String {
    resp.graph
        .devices()
        .map(|d| d.mac.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary(resp: &TopologyResponse, color: bool) -> String {
    let meta = &resp.metadata;
    let mut lines = vec![format!(
        "skeleton: {} · {} switches · {} ports · {} devices · {} ms{}",
        meta.source,
        resp.graph.switches.len(),
        resp.graph.port_count(),
        resp.graph.device_count(),
        meta.fusion_latency_ms,
        if meta.cached { " (cached)" } else { "" },
    )];
    for failure in &meta.errors {
        let line = format!("failed: {} ({}): {}", failure.source, failure.kind, failure.error);
        lines.push(if color { line.red().to_string() } else { line });
    }
    if meta.unmatched_ports > 0 || meta.malformed_records > 0 {
        let line = format!(
            "skipped: {} unmatched ports, {} malformed records",
            meta.unmatched_ports, meta.malformed_records
        );
        lines.push(if color { line.yellow().to_string() } else { line });
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: TopologyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;
    let engine = super::build_engine(&config, global)?;

    let defaults = config.topology_filter();
    let filter = TopologyFilter {
        include_cloud: args.cloud || defaults.include_cloud,
        include_scanner: defaults.include_scanner && !args.no_scanner,
        resolve_identities: defaults.resolve_identities && !args.no_resolve,
    };

    let mut resp = engine.get_topology(&filter).await?;
    engine.shutdown();

    if let Some(ref wanted) = args.switch {
        let Some(sw) = resp.graph.switch(wanted).cloned() else {
            return Err(CliError::Validation {
                field: "--switch".into(),
                reason: format!("no switch named '{wanted}' in the fused topology"),
            });
        };
        resp.graph.switches = vec![sw];
    }

    let color = output::should_color(global.color);
    let out = output::render(global.output, &resp, |r| output::table(&rows(r)), plain)?;
    output::print_output(&out, global.quiet);
    output::print_note(&summary(&resp, color), global.quiet);

    if resp.metadata.sources_succeeded.is_empty() && !resp.metadata.errors.is_empty() {
        return Err(CliError::NoData {
            failed: resp.metadata.failed_sources().collect::<Vec<_>>().join(", "),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use topofuse_core::{
        FusionMetadata, MacAddress, SkeletonSource, SourceError, SourceFailure, SourceKind,
        TopologyGraph,
    };

    use super::*;

    fn response() -> TopologyResponse {
        let mut sw = Switch::new("S1", "core-sw", "fw");
        let mut port = Port::new("port1");
        port.vlan = Some(20);
        let mut dev = ConnectedDevice::new(MacAddress::parse("AA:BB:CC:00:00:01").unwrap(), "mon");
        dev.vendor = Some("Acme".into());
        dev.sources = vec!["fw".into(), "mon".into()];
        port.devices.push(dev);
        sw.ports.push(port);
        sw.ports.push(Port::new("port2"));

        let mut metadata = FusionMetadata::new(SkeletonSource::SwitchController, Utc::now());
        metadata.errors.push(SourceFailure {
            source: "scan".into(),
            kind: SourceKind::Scanner,
            error: SourceError::Timeout { timeout_ms: 10_000 },
        });
        TopologyResponse {
            graph: TopologyGraph { switches: vec![sw] },
            metadata,
        }
    }

    #[test]
    fn one_row_per_device() {
        let rows = rows(&response());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].switch, "core-sw");
        assert_eq!(rows[0].vlan, "20");
        assert_eq!(rows[0].sources, "fw,mon");
    }

    #[test]
    fn summary_lists_failed_sources() {
        let text = summary(&response(), false);
        assert!(text.contains("skeleton: switch_controller"));
        assert!(text.contains("2 ports"));
        assert!(text.contains("failed: scan (scanner): timed out after 10000ms"));
    }

    #[test]
    fn plain_is_one_mac_per_line() {
        assert_eq!(plain(&response()), "AA:BB:CC:00:00:01");
    }
}
