// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// An 8-byte device EUI-64 as assigned by the network server.
///
/// The relay never interprets the internal structure of the EUI; it is
/// used only to derive the per-device event topic. The canonical textual
/// form is 16 lowercase hex characters (`0102030405060708`); parsing also
/// accepts `:` and `-` separators.
///
/// # Examples
///
/// ```
/// use eventlog_relay::DeviceEui;
///
/// let eui: DeviceEui = "01:02:03:04:05:06:07:08".parse().unwrap();
/// assert_eq!(eui, DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]));
/// assert_eq!(eui.to_string(), "0102030405060708");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceEui([u8; 8]);

impl DeviceEui {
    /// Creates a device EUI from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes of the EUI.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for DeviceEui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceEui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceEui({self})")
    }
}

/// Errors raised while parsing a textual device EUI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EuiParseError {
    /// The input did not contain exactly 16 hex characters.
    #[error("expected 16 hex characters, got {0}")]
    InvalidLength(usize),

    /// The input contained a non-hex character.
    #[error("invalid hex in EUI: {0}")]
    InvalidHex(String),
}

impl FromStr for DeviceEui {
    type Err = EuiParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if hex.len() != 16 {
            return Err(EuiParseError::InvalidLength(hex.len()));
        }

        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| EuiParseError::InvalidHex(pair.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 8]> for DeviceEui {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl From<DeviceEui> for [u8; 8] {
    fn from(eui: DeviceEui) -> Self {
        eui.0
    }
}

impl serde::Serialize for DeviceEui {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for DeviceEui {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_hex() {
        let eui: DeviceEui = "0102030405060708".parse().unwrap();
        assert_eq!(eui.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn parse_colon_separated() {
        let eui: DeviceEui = "01:02:03:04:05:06:07:08".parse().unwrap();
        assert_eq!(eui, DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn parse_hyphen_separated() {
        let eui: DeviceEui = "a1-b2-c3-d4-e5-f6-07-18".parse().unwrap();
        assert_eq!(
            eui,
            DeviceEui::new([0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6, 0x07, 0x18])
        );
    }

    #[test]
    fn parse_wrong_length_fails() {
        let err = "0102".parse::<DeviceEui>().unwrap_err();
        assert_eq!(err, EuiParseError::InvalidLength(4));
    }

    #[test]
    fn parse_non_hex_fails() {
        let err = "010203040506070z".parse::<DeviceEui>().unwrap_err();
        assert!(matches!(err, EuiParseError::InvalidHex(_)));
    }

    #[test]
    fn display_round_trip() {
        let eui = DeviceEui::new([0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04]);
        let parsed: DeviceEui = eui.to_string().parse().unwrap();
        assert_eq!(parsed, eui);
    }

    #[test]
    fn debug_format() {
        let eui = DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(format!("{eui:?}"), "DeviceEui(0102030405060708)");
    }

    #[test]
    fn serde_as_hex_string() {
        let eui = DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let json = serde_json::to_string(&eui).unwrap();
        assert_eq!(json, "\"0102030405060708\"");

        let back: DeviceEui = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eui);
    }
}
