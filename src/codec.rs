// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport envelope codec.
//!
//! Events travel over the broker as a JSON envelope pairing the event
//! type tag with the JSON encoding of exactly one protocol message:
//!
//! ```json
//! {"type": "up", "payload": {"devEUI": "0102030405060708", "data": "AQIDAw=="}}
//! ```
//!
//! [`encode`] serializes a typed message into this envelope; [`decode`]
//! validates the outer structure only and leaves the payload raw (see
//! [`EventLog`]). Unknown fields on either level are tolerated so that
//! older consumers keep working as the message schemas evolve.

use serde::Serialize;

use crate::error::{DecodeError, EncodeError};
use crate::event::{EventLog, EventType};

/// Encodes a protocol message into its transport envelope.
///
/// The message must be the schema implied by `event_type`; the codec does
/// not check the pairing, it only serializes.
///
/// # Errors
///
/// Returns [`EncodeError`] if the message cannot be serialized to JSON,
/// which only happens when the message is not a valid instance of its
/// schema (e.g. a map with non-string keys).
pub fn encode<T: Serialize>(event_type: EventType, message: &T) -> Result<Vec<u8>, EncodeError> {
    let payload = serde_json::value::to_raw_value(message)?;
    let envelope = EventLog {
        event_type,
        payload,
    };
    serde_json::to_vec(&envelope).map_err(EncodeError::Json)
}

/// Decodes the outer envelope structure of a raw broker message.
///
/// The payload is not parsed into its protocol message here; that is the
/// consumer's responsibility via [`EventLog::parse_payload`].
///
/// # Errors
///
/// Returns [`DecodeError::Envelope`] if the raw bytes are not a JSON
/// envelope with a known event type tag and a JSON payload.
pub fn decode(raw: &[u8]) -> Result<EventLog, DecodeError> {
    serde_json::from_slice(raw).map_err(DecodeError::Envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{
        AckEvent, ErrorEvent, ErrorType, JoinEvent, Location, LocationEvent, LocationSource,
        StatusEvent, UplinkEvent,
    };

    #[test]
    fn uplink_round_trip() {
        let uplink = UplinkEvent {
            device_name: "sensor-7".to_string(),
            f_port: 10,
            f_cnt: 3,
            data: vec![0x01, 0x02, 0x03, 0x03],
            ..Default::default()
        };

        let raw = encode(EventType::Uplink, &uplink).unwrap();
        let event = decode(&raw).unwrap();
        assert_eq!(event.event_type, EventType::Uplink);

        let back: UplinkEvent = event.parse_payload().unwrap();
        assert_eq!(back, uplink);
    }

    #[test]
    fn join_round_trip() {
        let join = JoinEvent {
            device_name: "sensor-7".to_string(),
            dev_addr: vec![0x01, 0xfa, 0x0b, 0x42],
            dr: 5,
            ..Default::default()
        };

        let raw = encode(EventType::Join, &join).unwrap();
        let event = decode(&raw).unwrap();
        assert_eq!(event.event_type, EventType::Join);
        assert_eq!(event.parse_payload::<JoinEvent>().unwrap(), join);
    }

    #[test]
    fn ack_round_trip() {
        let ack = AckEvent {
            acknowledged: true,
            f_cnt: 17,
            ..Default::default()
        };

        let raw = encode(EventType::Ack, &ack).unwrap();
        let event = decode(&raw).unwrap();
        assert_eq!(event.event_type, EventType::Ack);
        assert_eq!(event.parse_payload::<AckEvent>().unwrap(), ack);
    }

    #[test]
    fn error_event_serializes_enum_as_string() {
        let error = ErrorEvent {
            error_type: ErrorType::Otaa,
            error: "join-request rejected".to_string(),
            ..Default::default()
        };

        let raw = encode(EventType::Error, &error).unwrap();
        let json = String::from_utf8(raw.clone()).unwrap();
        assert!(json.contains("\"OTAA\""));

        let event = decode(&raw).unwrap();
        assert_eq!(event.parse_payload::<ErrorEvent>().unwrap(), error);
    }

    #[test]
    fn status_round_trip() {
        let status = StatusEvent {
            margin: 12,
            battery_level: 74.5,
            ..Default::default()
        };

        let raw = encode(EventType::Status, &status).unwrap();
        let event = decode(&raw).unwrap();
        assert_eq!(event.parse_payload::<StatusEvent>().unwrap(), status);
    }

    #[test]
    fn location_round_trip() {
        let location = LocationEvent {
            location: Location {
                latitude: 52.37,
                longitude: 4.89,
                altitude: 2.0,
                source: LocationSource::GeoResolverTdoa,
                accuracy: 50,
            },
            ..Default::default()
        };

        let raw = encode(EventType::Location, &location).unwrap();
        let event = decode(&raw).unwrap();
        assert_eq!(event.parse_payload::<LocationEvent>().unwrap(), location);
    }

    #[test]
    fn bytes_are_base64_on_the_wire() {
        let uplink = UplinkEvent {
            data: vec![0x01, 0x02, 0x03, 0x03],
            ..Default::default()
        };

        let raw = encode(EventType::Uplink, &uplink).unwrap();
        let json = String::from_utf8(raw).unwrap();
        assert!(json.contains("\"AQIDAw==\""));
    }

    #[test]
    fn envelope_wire_shape() {
        let raw = encode(EventType::Uplink, &UplinkEvent::default()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["type"], "up");
        assert!(value["payload"].is_object());
    }

    #[test]
    fn decode_tolerates_unknown_envelope_fields() {
        let raw = br#"{"type":"up","payload":{},"publishedAt":"2020-01-01T00:00:00Z"}"#;
        let event = decode(raw).unwrap();
        assert_eq!(event.event_type, EventType::Uplink);
    }

    #[test]
    fn decode_missing_type_fails() {
        let err = decode(br#"{"payload":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn decode_unknown_type_fails() {
        let err = decode(br#"{"type":"downlink","payload":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn decode_non_json_fails() {
        assert!(decode(b"not an envelope").is_err());
    }
}
