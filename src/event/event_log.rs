// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded transport envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::DecodeError;

use super::EventType;

/// A decoded transport envelope, as delivered to subscription consumers.
///
/// Only the outer structure (the event type tag and the presence of a
/// JSON payload) is validated on decode. The payload is kept raw so that
/// consumers decide if and when to parse it into the protocol message
/// schema implied by [`event_type`](Self::event_type); unknown payload
/// fields from newer producers pass through untouched.
///
/// # Examples
///
/// ```
/// use eventlog_relay::{EventLog, EventType};
/// use eventlog_relay::messages::UplinkEvent;
///
/// let raw = br#"{"type":"up","payload":{"data":"AQID"}}"#;
/// let event: EventLog = eventlog_relay::codec::decode(raw).unwrap();
/// assert_eq!(event.event_type, EventType::Uplink);
///
/// let uplink: UplinkEvent = event.parse_payload().unwrap();
/// assert_eq!(uplink.data, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    /// The event type tag.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// The raw JSON encoding of the protocol message.
    pub payload: Box<RawValue>,
}

impl EventLog {
    /// Parses the raw payload into a typed protocol message.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Payload`] if the payload does not match the
    /// requested message type.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_str(self.payload.get()).map_err(DecodeError::Payload)
    }
}
