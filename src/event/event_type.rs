// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol event type tag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of protocol event kinds carried by the relay.
///
/// The wire names (`up`, `join`, ...) are part of the envelope contract
/// and must stay stable across publisher and consumer versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Device uplink payload received by the network server.
    #[serde(rename = "up")]
    Uplink,

    /// Device joined (or re-joined) the network.
    #[serde(rename = "join")]
    Join,

    /// Device acknowledged a confirmed downlink.
    #[serde(rename = "ack")]
    Ack,

    /// Downlink frame was acknowledged by the gateway for transmission.
    #[serde(rename = "txack")]
    TxAck,

    /// An error related to the device occurred.
    #[serde(rename = "error")]
    Error,

    /// Margin and battery status reported by the device.
    #[serde(rename = "status")]
    Status,

    /// Device location has been resolved.
    #[serde(rename = "location")]
    Location,

    /// Event forwarded by an external integration.
    #[serde(rename = "integration")]
    Integration,
}

impl EventType {
    /// All event types, in wire-tag order.
    pub const ALL: [Self; 8] = [
        Self::Uplink,
        Self::Join,
        Self::Ack,
        Self::TxAck,
        Self::Error,
        Self::Status,
        Self::Location,
        Self::Integration,
    ];

    /// Returns the stable wire name of this event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uplink => "up",
            Self::Join => "join",
            Self::Ack => "ack",
            Self::TxAck => "txack",
            Self::Error => "error",
            Self::Status => "status",
            Self::Location => "location",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_stable() {
        let expected = [
            (EventType::Uplink, "up"),
            (EventType::Join, "join"),
            (EventType::Ack, "ack"),
            (EventType::TxAck, "txack"),
            (EventType::Error, "error"),
            (EventType::Status, "status"),
            (EventType::Location, "location"),
            (EventType::Integration, "integration"),
        ];
        for (event_type, name) in expected {
            assert_eq!(event_type.as_str(), name);
        }
    }

    #[test]
    fn serde_matches_as_str() {
        for event_type in EventType::ALL {
            let json = serde_json::to_string(&event_type).unwrap();
            assert_eq!(json, format!("\"{}\"", event_type.as_str()));

            let back: EventType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, event_type);
        }
    }

    #[test]
    fn unknown_wire_name_fails() {
        assert!(serde_json::from_str::<EventType>("\"downlink\"").is_err());
    }

    #[test]
    fn all_covers_every_variant() {
        assert_eq!(EventType::ALL.len(), 8);
    }
}
