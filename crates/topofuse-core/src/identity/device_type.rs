// ── Vendor → device-type hints ──
//
// First matching rule wins; rules are ordered most specific first. The
// first candidate of the returned list is the default hint.

const RULES: &[(&[&str], &[&str])] = &[
    (&["raspberry"], &["raspberry-pi", "iot-device"]),
    (&["espressif", "tuya", "shelly"], &["iot-device", "smart-home"]),
    (&["philips lighting", "signify", "lifx"], &["smart-light", "iot-device"]),
    (&["sonos"], &["speaker", "media-player"]),
    (&["vmware", "virtualbox", "qemu", "xensource", "hyper-v"], &["virtual-machine", "server"]),
    (&["meraki", "ubiquiti", "aruba", "ruckus"], &["access-point", "network-device"]),
    (&["cisco", "juniper", "arista", "fortinet", "palo alto", "netgear", "tp-link"], &["network-device", "switch"]),
    (&["axis", "hikvision", "dahua", "hanwha"], &["ip-camera", "iot-device"]),
    (&["polycom", "yealink", "grandstream", "avaya", "mitel"], &["voip-phone", "phone"]),
    (&["brother", "xerox", "canon", "lexmark", "epson", "kyocera", "ricoh"], &["printer", "multifunction"]),
    (&["zebra", "honeywell", "datalogic"], &["barcode-scanner", "printer"]),
    (&["apple"], &["mobile-device", "workstation"]),
    (&["samsung", "google", "oneplus", "xiaomi", "huawei"], &["mobile-device", "iot-device"]),
    (&["dell", "lenovo", "hewlett", "hp inc", "intel", "asustek", "micro-star"], &["workstation", "server"]),
    (&["synology", "qnap", "western digital"], &["nas", "server"]),
];

const UNKNOWN: &[&str] = &["unknown"];

/// Ranked candidate device types for a vendor string.
pub fn infer_device_types(vendor: &str) -> &'static [&'static str] {
    let lower = vendor.to_lowercase();
    if lower.trim().is_empty() {
        return UNKNOWN;
    }
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map_or(UNKNOWN, |(_, types)| *types)
}

/// The default hint: the first candidate, or `"unknown"`.
pub fn default_device_type(vendor: &str) -> &'static str {
    infer_device_types(vendor).first().copied().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raspberry_pi_is_ranked() {
        assert_eq!(
            infer_device_types("Raspberry Pi Trading Ltd"),
            ["raspberry-pi", "iot-device"]
        );
        assert_eq!(default_device_type("Raspberry Pi Foundation"), "raspberry-pi");
    }

    #[test]
    fn unknown_and_empty() {
        assert_eq!(infer_device_types(""), ["unknown"]);
        assert_eq!(default_device_type("Acme"), "unknown");
    }

    #[test]
    fn meraki_is_not_generic_cisco() {
        assert_eq!(default_device_type("Cisco Meraki"), "access-point");
        assert_eq!(default_device_type("Cisco Systems, Inc"), "network-device");
    }
}
