// ── Hardware address types ──
//
// `MacAddress` is the join key for devices across every source, so it is
// validated on construction: a value of this type is always 6 octets and
// always renders as `AA:BB:CC:DD:EE:FF`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid MAC address: {input:?}")]
pub struct MacParseError {
    pub input: String,
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address in canonical uppercase colon-separated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Parse any common notation: `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF`,
    /// `aabb.ccdd.eeff`, `aabbccddeeff`, and colon forms with unpadded
    /// octets (`0:1b:2c:3:4:5`). Anything else is rejected, including
    /// extra groups and trailing separators.
    pub fn parse(raw: &str) -> Result<Self, MacParseError> {
        let err = || MacParseError {
            input: raw.to_owned(),
        };
        let trimmed = raw.trim();

        if trimmed.contains([':', '-']) {
            let parts: Vec<&str> = trimmed.split([':', '-']).collect();
            if parts.len() != 6 {
                return Err(err());
            }
            let mut octets = [0u8; 6];
            for (slot, part) in octets.iter_mut().zip(&parts) {
                if part.is_empty() || part.len() > 2 || !is_hex(part) {
                    return Err(err());
                }
                *slot = u8::from_str_radix(part, 16).map_err(|_| err())?;
            }
            return Ok(Self(octets));
        }

        let hex = if trimmed.contains('.') {
            // Cisco dotted form: exactly three groups of four.
            let groups: Vec<&str> = trimmed.split('.').collect();
            if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
                return Err(err());
            }
            groups.concat()
        } else {
            trimmed.to_owned()
        };
        if hex.len() != 12 || !is_hex(&hex) {
            return Err(err());
        }
        let mut octets = [0u8; 6];
        for (i, slot) in octets.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(err)?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| err())?;
        }
        Ok(Self(octets))
    }

    /// Best-effort canonical form for input that may not be a MAC at all.
    ///
    /// Valid input gives the canonical form; anything else is trimmed,
    /// uppercased and has dashes turned into colons.
    pub fn normalize_lossy(raw: &str) -> String {
        Self::parse(raw).map_or_else(
            |_| raw.trim().to_uppercase().replace('-', ":"),
            |mac| mac.to_string(),
        )
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The manufacturer prefix (first three octets).
    pub const fn oui(&self) -> Oui {
        Oui([self.0[0], self.0[1], self.0[2]])
    }

    /// Locally administered addresses (randomized phone MACs, VMs) carry
    /// no meaningful OUI.
    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

// ── Oui ─────────────────────────────────────────────────────────────

/// Organizationally Unique Identifier: the vendor half of a MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oui([u8; 3]);

impl Oui {
    pub const fn new(octets: [u8; 3]) -> Self {
        Self(octets)
    }

    /// Six uppercase hex digits without separators (`B827EB`), the form
    /// vendor registries are queried with.
    pub fn hex(&self) -> String {
        let [a, b, c] = self.0;
        format!("{a:02X}{b:02X}{c:02X}")
    }
}

impl fmt::Display for Oui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}")
    }
}

impl FromStr for Oui {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        let full = MacAddress::parse(&format!("{hex}000000")).map_err(|_| MacParseError {
            input: s.to_owned(),
        })?;
        if hex.len() != 6 {
            return Err(MacParseError {
                input: s.to_owned(),
            });
        }
        Ok(full.oui())
    }
}

impl TryFrom<String> for Oui {
    type Error = MacParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Oui> for String {
    fn from(oui: Oui) -> Self {
        oui.to_string()
    }
}
