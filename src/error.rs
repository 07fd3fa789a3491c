// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the event relay library.
//!
//! This module provides the error hierarchy for the three failure domains
//! of the relay: envelope encoding on publish, transport failures against
//! the broker, and per-message envelope decoding on the subscription side.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// An event message could not be encoded into an envelope.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A received envelope could not be decoded.
    ///
    /// The subscription relay absorbs per-message decode failures; this
    /// variant only surfaces from explicit [`decode`](crate::codec::decode)
    /// or [`EventLog::parse_payload`](crate::event::EventLog::parse_payload)
    /// calls.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The broker rejected an operation or the transport failed.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Errors raised while encoding an event into its transport envelope.
///
/// These are publisher-side and non-retryable: the input message is not a
/// valid instance of the schema implied by its event type.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON serialization of the message or envelope failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while decoding a transport envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The outer envelope structure is malformed (missing or invalid
    /// event type, or a payload that is not a JSON value).
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The envelope itself was well-formed but its payload could not be
    /// parsed into the requested message type.
    #[error("malformed payload: {0}")]
    Payload(#[source] serde_json::Error),
}

/// Errors related to the pub/sub broker transport.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connecting to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An established broker connection was lost. Active subscription
    /// streams terminate with this error; no reconnection is attempted.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A publish call did not complete within its deadline.
    #[error("publish timed out after {0} ms")]
    PublishTimeout(u64),

    /// Invalid broker address or configuration.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
