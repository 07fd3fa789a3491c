// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol message catalog: one JSON-encodable schema per [`EventType`].
//!
//! The serde mapping follows the protobuf-JSON conventions of the
//! network-server integration layer: camelCase field names, enum variants
//! as their string names, byte fields base64-encoded, and timestamps in
//! RFC 3339. All messages tolerate unknown fields on deserialize and
//! derive [`Default`], so consumers on older schema versions keep
//! working as producers evolve.
//!
//! [`EventType`]: crate::event::EventType

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::DeviceEui;

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Uplink payload received from a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UplinkEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Application port the payload was received on.
    pub f_port: u32,
    /// Uplink frame counter.
    pub f_cnt: u32,
    /// Data rate the uplink was sent at.
    pub dr: u32,
    /// Whether adaptive data rate is enabled for the device.
    pub adr: bool,
    /// Whether the uplink was confirmed.
    pub confirmed_uplink: bool,
    /// Raw application payload.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Device joined (or re-joined) the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Device address assigned on join.
    #[serde(with = "base64_bytes")]
    pub dev_addr: Vec<u8>,
    /// Data rate of the join-request.
    pub dr: u32,
}

/// Device acknowledgement of a confirmed downlink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AckEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Whether the downlink was acknowledged within the expected window.
    pub acknowledged: bool,
    /// Downlink frame counter of the acknowledged frame.
    pub f_cnt: u32,
}

/// Gateway acknowledgement of a downlink transmission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TxAckEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Downlink frame counter of the transmitted frame.
    pub f_cnt: u32,
    /// ID of the gateway that transmitted the frame.
    pub gateway_id: String,
}

/// Category of a device-related error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Unclassified error.
    #[default]
    Unknown,
    /// Over-the-air activation failed.
    Otaa,
    /// Downlink payload exceeded the maximum size for the data rate.
    DownlinkPayloadSize,
    /// Downlink frame counter error.
    DownlinkFcnt,
    /// Uplink frame counter error (reset or retransmission).
    UplinkFcnt,
    /// Uplink payload codec failed.
    UplinkCodec,
    /// Downlink payload codec failed.
    DownlinkCodec,
    /// No gateway was available for the downlink.
    DownlinkGateway,
}

/// An error related to the device occurred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Error category.
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    /// Human-readable error description.
    pub error: String,
    /// Frame counter of the frame the error relates to, if any.
    pub f_cnt: u32,
}

/// Margin and battery status reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Demodulation margin in dB.
    pub margin: i32,
    /// Whether the device is on external power.
    pub external_power_source: bool,
    /// Whether the battery level could not be measured.
    pub battery_level_unavailable: bool,
    /// Battery level as a percentage.
    pub battery_level: f32,
    /// When the device was last seen by the network server.
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// How a device location was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationSource {
    /// Unknown source.
    #[default]
    Unknown,
    /// Statically configured location.
    Config,
    /// Resolved by time difference of arrival.
    GeoResolverTdoa,
    /// Resolved by signal strength.
    GeoResolverRssi,
    /// Resolved from a GNSS payload.
    GeoResolverGnss,
    /// Resolved from Wi-Fi access point data.
    GeoResolverWifi,
}

/// A geographic position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// How the location was obtained.
    pub source: LocationSource,
    /// Accuracy in meters.
    pub accuracy: u32,
}

/// Device location has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// The resolved location.
    pub location: Location,
}

/// Event forwarded by an external integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationEvent {
    /// ID of the application the device belongs to.
    pub application_id: String,
    /// Name of the application the device belongs to.
    pub application_name: String,
    /// Name of the device.
    pub device_name: String,
    /// EUI of the device.
    #[serde(rename = "devEUI")]
    pub dev_eui: DeviceEui,
    /// Name of the integration that produced the event.
    pub integration_name: String,
    /// Integration-defined event kind.
    pub event_type: String,
    /// Integration-defined JSON object, passed through as a string.
    pub object_json: String,
}
