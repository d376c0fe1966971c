// ── Priority merge ──
//
// Pure and synchronous. Sources are applied in a fixed order of steps:
//
//   1. skeleton: switch controller, then SNMP inventory for missing serials
//   2. detected devices replace device lists on matching ports
//   3. cloud switches appended as separate entries
//   4. scanner hosts attach services or land on a synthetic switch
//
// A later step wins over an earlier one for the same (switch, port, mac).
// Within a step, sources apply in registration order. The output depends
// only on the contents and order of `results`, never on fetch timing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::TopologyFilter;
use crate::model::{
    ConnectedDevice, FusionMetadata, Port, ScannedHost, Service, SkeletonSource, SourceCounts,
    SourceFailure, SourceKind, SourceResult, Switch, SwitchType, TopologyGraph,
};

pub const DISCOVERED_SERIAL: &str = "discovered-hosts";
pub const DISCOVERED_NAME: &str = "Discovered Hosts";
pub const DISCOVERED_PORT: &str = "discovered";

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub graph: TopologyGraph,
    pub metadata: FusionMetadata,
}

/// Fuse buffered source results into one graph.
///
/// `results` must be in adapter registration order.
pub fn fuse(results: &[SourceResult], filter: &TopologyFilter, generated_at: DateTime<Utc>) -> MergeOutcome {
    let (mut switches, skeleton) = build_skeleton(results);
    let mut metadata = FusionMetadata::new(skeleton, generated_at);
    record_sources(results, &mut metadata);

    if skeleton == SkeletonSource::NoneAvailable {
        warn!("no skeleton source succeeded, returning empty topology");
        return MergeOutcome {
            graph: TopologyGraph::default(),
            metadata,
        };
    }

    for r in successful(results, SourceKind::DetectedDevices) {
        overlay_detected(&mut switches, r, &mut metadata);
    }

    if filter.include_cloud {
        for r in successful(results, SourceKind::CloudSwitch) {
            append_cloud(&mut switches, r);
        }
    }

    if filter.include_scanner {
        for r in successful(results, SourceKind::Scanner) {
            for host in &r.hosts {
                place_host(&mut switches, host, &r.source_name, &mut metadata);
            }
        }
    }

    MergeOutcome {
        graph: TopologyGraph { switches },
        metadata,
    }
}

fn successful(results: &[SourceResult], kind: SourceKind) -> impl Iterator<Item = &SourceResult> {
    results.iter().filter(move |r| r.kind == kind && r.is_ok())
}

fn record_sources(results: &[SourceResult], metadata: &mut FusionMetadata) {
    for r in results {
        match &r.error {
            None => {
                metadata.sources_succeeded.push(r.source_name.clone());
                metadata.malformed_records += r.malformed;
            }
            Some(error) => metadata.errors.push(SourceFailure {
                source: r.source_name.clone(),
                kind: r.kind,
                error: error.clone(),
            }),
        }
        metadata.counts.insert(
            r.source_name.clone(),
            SourceCounts {
                switches: r.switches.len(),
                ports: r.switches.iter().map(|s| s.ports.len()).sum(),
                devices: r.switches.iter().map(Switch::device_count).sum(),
                hosts: r.hosts.len(),
            },
        );
    }
}

// ── Step 1: skeleton ─────────────────────────────────────────────────

fn build_skeleton(results: &[SourceResult]) -> (Vec<Switch>, SkeletonSource) {
    let mut switches: Vec<Switch> = Vec::new();

    let mut controller_ok = false;
    for r in successful(results, SourceKind::SwitchController) {
        controller_ok = true;
        push_new_serials(&mut switches, &r.switches);
    }

    let mut snmp_ok = false;
    let before = switches.len();
    for r in successful(results, SourceKind::SnmpStatic) {
        snmp_ok = true;
        push_new_serials(&mut switches, &r.switches);
    }
    let snmp_contributed = switches.len() > before;

    let label = match (controller_ok, snmp_ok) {
        (false, false) => SkeletonSource::NoneAvailable,
        (false, true) => SkeletonSource::SnmpStatic,
        (true, _) if snmp_contributed => SkeletonSource::Combined,
        (true, _) => SkeletonSource::SwitchController,
    };
    (switches, label)
}

/// Append switches whose serial is not yet present; earlier records win.
fn push_new_serials(into: &mut Vec<Switch>, from: &[Switch]) {
    for sw in from {
        if into.iter().any(|s| s.serial == sw.serial) {
            debug!(serial = %sw.serial, source = %sw.source_name, "switch superseded by earlier source");
            continue;
        }
        let mut sw = deduplicated(sw);
        sw.switch_type = SwitchType::Native;
        into.push(sw);
    }
}

/// A copy of `sw` with port names unique and MACs unique per port. The
/// first record wins; a repeated MAC only adds its provenance.
fn deduplicated(sw: &Switch) -> Switch {
    let mut out = Switch {
        ports: Vec::with_capacity(sw.ports.len()),
        ..sw.clone()
    };
    for port in &sw.ports {
        if out.port(&port.name).is_some() {
            debug!(switch = %sw.name, port = %port.name, "duplicate port ignored");
            continue;
        }
        let mut unique = Port {
            devices: Vec::with_capacity(port.devices.len()),
            ..port.clone()
        };
        for device in &port.devices {
            add_device(&mut unique, device.clone());
        }
        out.insert_port(unique);
    }
    out
}

/// Insert unless the MAC is already on the port; a repeat merges its
/// sources into the device already there.
fn add_device(port: &mut Port, device: ConnectedDevice) {
    if let Some(kept) = port.devices.iter_mut().find(|d| d.mac == device.mac) {
        for source in &device.sources {
            kept.note_source(source);
        }
        return;
    }
    port.insert_device(device);
}

// ── Step 2: detected devices ─────────────────────────────────────────

fn overlay_detected(switches: &mut [Switch], result: &SourceResult, metadata: &mut FusionMetadata) {
    // (switch index, port name) pairs this source already applied
    let mut applied: HashSet<(usize, &str)> = HashSet::new();
    for reported in &result.switches {
        let target = switches
            .iter()
            .position(|s| s.switch_type == SwitchType::Native && s.name == reported.name)
            .or_else(|| {
                switches
                    .iter()
                    .position(|s| s.switch_type == SwitchType::Native && s.serial == reported.serial)
            });
        let Some(idx) = target else {
            warn!(
                source = %result.source_name,
                switch = %reported.name,
                ports = reported.ports.len(),
                "detected devices reference unknown switch"
            );
            metadata.unmatched_ports += reported.ports.len();
            continue;
        };
        let Some(switch) = switches.get_mut(idx) else {
            continue;
        };

        for reported_port in &reported.ports {
            if !applied.insert((idx, reported_port.name.as_str())) {
                debug!(
                    source = %result.source_name,
                    switch = %switch.name,
                    port = %reported_port.name,
                    "repeated port in detected devices ignored"
                );
                continue;
            }
            let Some(port) = switch.port_mut(&reported_port.name) else {
                warn!(
                    source = %result.source_name,
                    switch = %switch.name,
                    port = %reported_port.name,
                    "detected devices reference unknown port"
                );
                metadata.unmatched_ports += 1;
                continue;
            };
            replace_devices(port, reported_port);
            metadata.ports_overlaid += 1;
        }
    }
}

/// The reported list replaces the port's list. A MAC that was already on
/// the port keeps its earlier provenance and any fields the new record
/// lacks.
fn replace_devices(port: &mut Port, reported: &Port) {
    let previous = std::mem::take(&mut port.devices);
    for d in &reported.devices {
        let mut device = d.clone();
        if let Some(old) = previous.iter().find(|o| o.mac == device.mac) {
            inherit(&mut device, old);
        }
        add_device(port, device);
    }
    if port.vlan.is_none() {
        port.vlan = reported.vlan;
    }
}

fn inherit(device: &mut ConnectedDevice, old: &ConnectedDevice) {
    let mut sources = old.sources.clone();
    for s in &device.sources {
        if !sources.contains(s) {
            sources.push(s.clone());
        }
    }
    device.sources = sources;
    if device.ip.is_none() {
        device.ip = old.ip;
    }
    if device.hostname.is_none() {
        device.hostname.clone_from(&old.hostname);
    }
}

// ── Step 3: cloud switches ───────────────────────────────────────────

fn append_cloud(switches: &mut Vec<Switch>, result: &SourceResult) {
    for sw in &result.switches {
        let exists = switches
            .iter()
            .any(|s| s.switch_type == SwitchType::Cloud && s.serial == sw.serial);
        if exists {
            continue;
        }
        let mut sw = deduplicated(sw);
        sw.switch_type = SwitchType::Cloud;
        switches.push(sw);
    }
}

// ── Step 4: scanner hosts ────────────────────────────────────────────

fn place_host(switches: &mut Vec<Switch>, host: &ScannedHost, source: &str, metadata: &mut FusionMetadata) {
    if let Some(device) = find_device(switches, host) {
        for svc in &host.services {
            add_service(&mut device.services, svc);
        }
        device.note_source(source);
        if device.hostname.is_none() {
            device.hostname.clone_from(&host.hostname);
        }
        if device.ip.is_none() {
            device.ip = host.ip;
        }
        metadata.scanner_hosts_matched += 1;
        return;
    }

    let Some(mac) = host.mac else {
        debug!(ip = ?host.ip, "scanner host has no MAC and matches no device");
        metadata.scanner_hosts_unplaced += 1;
        return;
    };

    let mut device = ConnectedDevice::new(mac, source);
    device.ip = host.ip;
    device.hostname.clone_from(&host.hostname);
    for svc in &host.services {
        add_service(&mut device.services, svc);
    }
    discovered_port(switches, source).insert_device(device);
    metadata.scanner_hosts_appended += 1;
}

/// IP match first, then MAC, in graph order.
fn find_device<'a>(switches: &'a mut [Switch], host: &ScannedHost) -> Option<&'a mut ConnectedDevice> {
    let all = || switches.iter().flat_map(|s| &s.ports).flat_map(|p| &p.devices);
    let by_ip = host
        .ip
        .and_then(|ip| all().position(|d| d.ip == Some(ip)));
    let idx = by_ip.or_else(|| host.mac.and_then(|mac| all().position(|d| d.mac == mac)))?;
    switches
        .iter_mut()
        .flat_map(|s| &mut s.ports)
        .flat_map(|p| &mut p.devices)
        .nth(idx)
}

/// The single port of the synthetic switch, created on first use.
fn discovered_port<'a>(switches: &'a mut Vec<Switch>, source: &str) -> &'a mut Port {
    let idx = if let Some(idx) = switches
        .iter()
        .position(|s| s.switch_type == SwitchType::Discovered)
    {
        idx
    } else {
        let mut sw = Switch::new(DISCOVERED_SERIAL, DISCOVERED_NAME, source);
        sw.switch_type = SwitchType::Discovered;
        switches.push(sw);
        switches.len() - 1
    };
    let switch = &mut switches[idx];
    if switch.ports.is_empty() {
        switch.ports.push(Port::new(DISCOVERED_PORT));
    }
    &mut switch.ports[0]
}

fn add_service(services: &mut Vec<Service>, svc: &Service) {
    if !services
        .iter()
        .any(|s| s.port == svc.port && s.protocol == svc.protocol)
    {
        services.push(svc.clone());
    }
}
