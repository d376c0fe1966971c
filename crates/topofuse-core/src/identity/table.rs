// ── Local OUI table ──
//
// Vendors common on small-business networks, checked before any I/O.
// Site-specific entries from config are layered on top and win.

use std::collections::HashMap;

use crate::model::Oui;

const BUILTIN: &[([u8; 3], &str)] = &[
    ([0xB8, 0x27, 0xEB], "Raspberry Pi Foundation"),
    ([0xDC, 0xA6, 0x32], "Raspberry Pi Trading Ltd"),
    ([0xE4, 0x5F, 0x01], "Raspberry Pi Trading Ltd"),
    ([0x00, 0x0C, 0x29], "VMware, Inc."),
    ([0x00, 0x50, 0x56], "VMware, Inc."),
    ([0x08, 0x00, 0x27], "Oracle VirtualBox"),
    ([0x00, 0x09, 0x0F], "Fortinet, Inc."),
    ([0x00, 0x00, 0x0C], "Cisco Systems, Inc"),
    ([0x00, 0x18, 0x0A], "Cisco Meraki"),
    ([0x24, 0x0A, 0xC4], "Espressif Inc."),
    ([0x00, 0x17, 0x88], "Philips Lighting BV"),
    ([0x00, 0x03, 0x93], "Apple, Inc."),
    ([0x00, 0x14, 0x22], "Dell Inc."),
    ([0x00, 0x40, 0x8C], "Axis Communications AB"),
    ([0x00, 0x04, 0xF2], "Polycom"),
    ([0x00, 0x15, 0x65], "Xiamen Yealink Network Technology"),
    ([0x00, 0x07, 0x4D], "Zebra Technologies Corp."),
    ([0x00, 0x0E, 0x58], "Sonos, Inc."),
    ([0x00, 0x80, 0x77], "Brother Industries, Ltd."),
    ([0x00, 0x00, 0xAA], "Xerox Corporation"),
    ([0x00, 0x00, 0x85], "Canon Inc."),
    ([0xF0, 0x9F, 0xC2], "Ubiquiti Inc."),
    ([0x00, 0x1B, 0x17], "Palo Alto Networks"),
];

/// Immutable OUI → vendor map.
#[derive(Debug, Clone)]
pub struct LocalVendorTable {
    entries: HashMap<Oui, String>,
}

impl LocalVendorTable {
    /// Built-in entries only.
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(octets, vendor)| (Oui::new(*octets), (*vendor).to_owned()))
            .collect();
        Self { entries }
    }

    /// Built-in entries with `overrides` layered on top.
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (Oui, String)>,
    {
        let mut table = Self::builtin();
        for (oui, vendor) in overrides {
            let vendor = vendor.trim().to_owned();
            if !vendor.is_empty() {
                table.entries.insert(oui, vendor);
            }
        }
        table
    }

    pub fn get(&self, oui: Oui) -> Option<&str> {
        self.entries.get(&oui).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LocalVendorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_builtin() {
        let pi: Oui = "B8:27:EB".parse().unwrap();
        let acme: Oui = "AA:BB:CC".parse().unwrap();
        let table = LocalVendorTable::with_overrides([
            (pi, "Pi Override".to_owned()),
            (acme, "Acme".to_owned()),
        ]);
        assert_eq!(table.get(pi), Some("Pi Override"));
        assert_eq!(table.get(acme), Some("Acme"));
        assert_eq!(table.len(), BUILTIN.len() + 1);
    }
}
