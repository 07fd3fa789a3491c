// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pub/sub broker contract and implementations.
//!
//! The relay does not own a broker; it is handed one as an injected
//! dependency through the [`EventBroker`] trait. Two implementations are
//! provided:
//!
//! - [`MemoryBroker`]: in-process fan-out over tokio broadcast channels,
//!   used in tests and single-process deployments.
//! - [`MqttEventBroker`] (feature `mqtt`): a shared MQTT connection,
//!   suitable for distributing events across processes.
//!
//! Broker implementations must be safe for concurrent use by many
//! simultaneous publish and subscribe calls.

mod memory;
#[cfg(feature = "mqtt")]
mod mqtt;

pub use memory::{MemoryBroker, MemoryEventStream};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttEventBroker, MqttEventBrokerBuilder, MqttEventStream};

use crate::error::BrokerError;

/// A publish/subscribe broker keyed by topic string.
///
/// Topics are opaque to the broker; the relay derives them from device
/// identifiers (see [`device_event_topic`](crate::relay::device_event_topic)).
/// Publishing is fire-and-forget: delivery happens only to subscribers
/// active at publish time, independently per subscriber.
#[allow(async_fn_in_trait)]
pub trait EventBroker {
    /// The subscription stream type produced by [`subscribe`](Self::subscribe).
    type Stream: EventStream;

    /// Publishes a raw payload to a topic.
    ///
    /// Succeeds whether or not any subscriber is listening; the payload
    /// is not retained for later subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the transport rejects the publish.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError>;

    /// Subscribes to a topic, returning a stream of raw payloads.
    ///
    /// The stream observes only payloads published after this call
    /// returns (no replay).
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the subscription cannot be established.
    async fn subscribe(&self, topic: &str) -> Result<Self::Stream, BrokerError>;
}

/// A live subscription to a single topic.
#[allow(async_fn_in_trait)]
pub trait EventStream {
    /// Waits for the next payload.
    ///
    /// Yields `Some(Ok(payload))` per message in broker delivery order,
    /// `Some(Err(_))` once when the transport fails (the stream is then
    /// finished), and `None` when the stream terminated cleanly.
    async fn next(&mut self) -> Option<Result<Vec<u8>, BrokerError>>;

    /// Releases the broker-side subscription.
    ///
    /// Dropping the stream releases local resources as well, but `close`
    /// additionally lets transport-backed brokers unsubscribe eagerly
    /// instead of waiting for connection teardown.
    async fn close(self);
}
