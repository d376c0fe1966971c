// ── Wire-to-domain field conversions ──
//
// Small, total parsers shared by the adapters. Every source spells speeds,
// VLANs and statuses differently; these fold them into the domain enums
// and drop anything unparseable instead of failing the record.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{PortStatus, SwitchStatus};

/// Parse an IP, tolerating a trailing `/prefix` and surrounding whitespace.
pub(crate) fn parse_ip(raw: Option<&str>) -> Option<IpAddr> {
    let raw = raw?.trim();
    let addr = raw.split('/').next().unwrap_or(raw).trim();
    addr.parse().ok()
}

/// Convert optional epoch seconds to `DateTime<Utc>`.
pub(crate) fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|ts| DateTime::from_timestamp(ts, 0))
}

/// Speed in Mbps from a number, `"1000full"`, `"auto"`, `"1 Gbps"`, `"100 Mbps"`.
pub(crate) fn parse_speed(raw: Option<&Value>) -> Option<u32> {
    match raw? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0),
        Value::String(s) => parse_speed_text(s),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub(crate) fn parse_speed_text(raw: &str) -> Option<u32> {
    let lower = raw.trim().to_ascii_lowercase();
    let digits: String = lower
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = digits.parse().ok()?;
    let unit = lower[digits.len()..].trim_start();
    let mbps = if unit.starts_with('g') {
        value * 1000.0
    } else if unit.starts_with('k') {
        value / 1000.0
    } else {
        value
    };
    if !(1.0..=f64::from(u32::MAX)).contains(&mbps) {
        return None;
    }
    Some(mbps.round() as u32)
}

/// VLAN id from a number or numeric string; 0 and >4094 are rejected.
pub(crate) fn parse_vlan(raw: Option<&Value>) -> Option<u16> {
    let id = match raw? {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (1..=4094).contains(&id).then_some(id)
}

pub(crate) fn switch_status(raw: Option<&str>) -> SwitchStatus {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("connected" | "online" | "up" | "authorized" | "alerting") => SwitchStatus::Online,
        Some("disconnected" | "offline" | "down" | "dormant") => SwitchStatus::Offline,
        _ => SwitchStatus::Unknown,
    }
}

pub(crate) fn port_status(raw: Option<&str>) -> PortStatus {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("up" | "connected") => PortStatus::Up,
        Some("down" | "disconnected" | "disabled") => PortStatus::Down,
        _ => PortStatus::Unknown,
    }
}

/// Trimmed, non-empty string or `None`.
pub(crate) fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn speeds_from_every_spelling() {
        assert_eq!(parse_speed(Some(&json!(1000))), Some(1000));
        assert_eq!(parse_speed(Some(&json!("1000full"))), Some(1000));
        assert_eq!(parse_speed(Some(&json!("1 Gbps"))), Some(1000));
        assert_eq!(parse_speed(Some(&json!("2.5 Gbps"))), Some(2500));
        assert_eq!(parse_speed(Some(&json!("100 Mbps"))), Some(100));
        assert_eq!(parse_speed(Some(&json!("auto"))), None);
        assert_eq!(parse_speed(Some(&json!(0))), None);
    }

    #[test]
    fn vlan_range() {
        assert_eq!(parse_vlan(Some(&json!(10))), Some(10));
        assert_eq!(parse_vlan(Some(&json!("20"))), Some(20));
        assert_eq!(parse_vlan(Some(&json!(0))), None);
        assert_eq!(parse_vlan(Some(&json!(5000))), None);
    }

    #[test]
    fn ip_with_prefix() {
        assert_eq!(
            parse_ip(Some("10.0.0.2/24")),
            Some("10.0.0.2".parse().unwrap_or(IpAddr::from([0, 0, 0, 0])))
        );
        assert_eq!(parse_ip(Some("not-an-ip")), None);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(switch_status(Some("Connected")), SwitchStatus::Online);
        assert_eq!(switch_status(Some("dormant")), SwitchStatus::Offline);
        assert_eq!(switch_status(None), SwitchStatus::Unknown);
        assert_eq!(port_status(Some("Disabled")), PortStatus::Down);
    }
}
