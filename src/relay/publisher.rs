// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event publisher.

use std::time::Duration;

use serde::Serialize;

use crate::broker::EventBroker;
use crate::codec;
use crate::error::{BrokerError, Result};
use crate::event::{DeviceEui, EventType};

use super::device_event_topic;

const PUBLISH_TIMEOUT_MS: u64 = 500;

/// Deadline applied to each publish call.
///
/// Publishing is fire-and-forget, so a stalled broker must not hold up
/// upstream event producers for longer than this.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_millis(PUBLISH_TIMEOUT_MS);

/// Encodes an event and publishes it on the device's topic.
///
/// The call is fire-and-forget: it does not wait for subscriber
/// presence, does not retry, and keeps no record of the event beyond the
/// broker's fan-out to currently subscribed listeners. `message` must be
/// the protocol message schema implied by `event_type` (see
/// [`messages`](crate::messages)).
///
/// # Errors
///
/// - [`EncodeError`](crate::error::EncodeError) if the message cannot be
///   encoded into an envelope.
/// - [`BrokerError`] if the broker rejects the publish or the
///   [`PUBLISH_TIMEOUT`] deadline expires.
///
/// # Examples
///
/// ```
/// use eventlog_relay::{DeviceEui, EventType, MemoryBroker};
/// use eventlog_relay::messages::UplinkEvent;
/// use eventlog_relay::relay::log_event_for_device;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> eventlog_relay::Result<()> {
/// let broker = MemoryBroker::new();
/// let dev_eui = DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]);
/// let uplink = UplinkEvent {
///     data: vec![0x01, 0x02],
///     ..Default::default()
/// };
///
/// log_event_for_device(&broker, dev_eui, EventType::Uplink, &uplink).await?;
/// # Ok(())
/// # }
/// ```
pub async fn log_event_for_device<B: EventBroker, T: Serialize>(
    broker: &B,
    dev_eui: DeviceEui,
    event_type: EventType,
    message: &T,
) -> Result<()> {
    let payload = codec::encode(event_type, message)?;
    let topic = device_event_topic(dev_eui);

    tracing::debug!(
        topic = %topic,
        event_type = %event_type,
        size = payload.len(),
        "Publishing device event"
    );

    tokio::time::timeout(PUBLISH_TIMEOUT, broker.publish(&topic, payload))
        .await
        .map_err(|_| BrokerError::PublishTimeout(PUBLISH_TIMEOUT_MS))??;
    Ok(())
}
