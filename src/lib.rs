// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event relay for LoRaWAN application servers.
//!
//! This library distributes live protocol events (uplinks, joins,
//! acknowledgements, errors, status, location, integration events)
//! produced by devices to interested consumers, such as a streaming API
//! feeding a dashboard. Events are encoded into a JSON transport
//! envelope, published on a per-device topic of a shared pub/sub
//! broker, and relayed back out of live subscriptions with cooperative
//! cancellation.
//!
//! Delivery is at-most-once: only consumers subscribed at publish time
//! receive an event, nothing is persisted or replayed, and per-device
//! ordering is preserved per subscriber.
//!
//! # Publishing events
//!
//! ```
//! use eventlog_relay::{DeviceEui, EventType, MemoryBroker};
//! use eventlog_relay::messages::UplinkEvent;
//! use eventlog_relay::relay::log_event_for_device;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> eventlog_relay::Result<()> {
//!     let broker = MemoryBroker::new();
//!     let dev_eui: DeviceEui = "01:02:03:04:05:06:07:08".parse().unwrap();
//!
//!     let uplink = UplinkEvent {
//!         device_name: "soil-sensor-3".to_string(),
//!         f_port: 10,
//!         data: vec![0x01, 0x02, 0x03],
//!         ..Default::default()
//!     };
//!     log_event_for_device(&broker, dev_eui, EventType::Uplink, &uplink).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Subscribing to a device's events
//!
//! ```no_run
//! use eventlog_relay::{DeviceEui, MemoryBroker};
//! use eventlog_relay::relay::get_event_log_for_device;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> eventlog_relay::Result<()> {
//!     let broker = MemoryBroker::new();
//!     let dev_eui = DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]);
//!     let cancel = CancellationToken::new();
//!     let (tx, mut rx) = mpsc::channel(16);
//!
//!     let relay = tokio::spawn({
//!         let broker = broker.clone();
//!         let cancel = cancel.clone();
//!         async move { get_event_log_for_device(&broker, cancel, dev_eui, tx).await }
//!     });
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{}: {}", event.event_type, event.payload);
//!     }
//!
//!     cancel.cancel();
//!     relay.await.expect("relay task panicked")?;
//!     Ok(())
//! }
//! ```
//!
//! # Production brokers
//!
//! [`MemoryBroker`] distributes events within one process. With the
//! `mqtt` feature (enabled by default), [`MqttEventBroker`] distributes
//! them across processes over a shared MQTT connection. Any other
//! transport can be plugged in by implementing
//! [`EventBroker`](broker::EventBroker).

pub mod broker;
pub mod codec;
pub mod error;
pub mod event;
pub mod messages;
pub mod relay;

pub use broker::{EventBroker, EventStream, MemoryBroker};
#[cfg(feature = "mqtt")]
pub use broker::MqttEventBroker;
pub use error::{BrokerError, DecodeError, EncodeError, Error, Result};
pub use event::{DeviceEui, EuiParseError, EventLog, EventType};
pub use relay::{device_event_topic, get_event_log_for_device, log_event_for_device};
