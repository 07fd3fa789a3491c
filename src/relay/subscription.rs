// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription relay.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::broker::{EventBroker, EventStream};
use crate::codec;
use crate::error::{Error, Result};
use crate::event::{DeviceEui, EventLog};

use super::device_event_topic;

/// Subscribes to a device's event topic and forwards each decoded event
/// to `output` until cancelled or the broker fails.
///
/// This call is long-lived and intended to run concurrently with its
/// caller (typically under `tokio::spawn`). Its lifecycle:
///
/// - **Initializing**: the broker subscription is being established;
///   on failure the error is returned immediately.
/// - **Active**: each received message is decoded and handed to
///   `output`. The handoff blocks when the channel is full, stalling
///   only this subscription; malformed messages are logged and skipped.
/// - **Closed**: on cancellation (or when the consumer drops the
///   receiving end) the call returns `Ok(())`; when the broker stream
///   fails it returns that error. Either way the broker-side
///   subscription is released before returning, and no reconnection is
///   attempted — callers wanting one make a fresh call.
///
/// Cancellation is observed at every suspension point, including during
/// a blocked handoff, so it takes effect promptly.
///
/// # Errors
///
/// Returns [`BrokerError`](crate::error::BrokerError) if the initial
/// subscribe fails or the broker stream terminates with an error.
///
/// # Examples
///
/// ```
/// use eventlog_relay::{DeviceEui, EventType, MemoryBroker};
/// use eventlog_relay::messages::JoinEvent;
/// use eventlog_relay::relay::{get_event_log_for_device, log_event_for_device};
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> eventlog_relay::Result<()> {
/// let broker = MemoryBroker::new();
/// let dev_eui = DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]);
/// let cancel = CancellationToken::new();
/// let (tx, mut rx) = mpsc::channel(16);
///
/// let relay = tokio::spawn({
///     let broker = broker.clone();
///     let cancel = cancel.clone();
///     async move { get_event_log_for_device(&broker, cancel, dev_eui, tx).await }
/// });
///
/// // Wait for the subscription to become active before publishing.
/// let topic = eventlog_relay::relay::device_event_topic(dev_eui);
/// while broker.subscriber_count(&topic) == 0 {
///     tokio::task::yield_now().await;
/// }
///
/// log_event_for_device(&broker, dev_eui, EventType::Join, &JoinEvent::default()).await?;
/// let event = rx.recv().await.unwrap();
/// assert_eq!(event.event_type, EventType::Join);
///
/// cancel.cancel();
/// relay.await.unwrap()?;
/// # Ok(())
/// # }
/// ```
pub async fn get_event_log_for_device<B: EventBroker>(
    broker: &B,
    cancel: CancellationToken,
    dev_eui: DeviceEui,
    output: mpsc::Sender<EventLog>,
) -> Result<()> {
    let topic = device_event_topic(dev_eui);
    let mut stream = broker.subscribe(&topic).await?;
    tracing::debug!(topic = %topic, "Device event subscription active");

    let result = loop {
        let raw = tokio::select! {
            () = cancel.cancelled() => break Ok(()),
            msg = stream.next() => match msg {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => break Err(Error::Broker(e)),
                None => break Ok(()),
            },
        };

        let event = match codec::decode(&raw) {
            Ok(event) => event,
            Err(e) => {
                // A malformed message from an unrelated producer must not
                // take down an otherwise healthy subscription.
                tracing::warn!(topic = %topic, error = %e, "Skipping undecodable event");
                continue;
            }
        };

        tokio::select! {
            () = cancel.cancelled() => break Ok(()),
            sent = output.send(event) => {
                if sent.is_err() {
                    tracing::debug!(topic = %topic, "Consumer dropped the output channel");
                    break Ok(());
                }
            }
        }
    };

    stream.close().await;
    tracing::debug!(topic = %topic, "Device event subscription closed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use crate::event::EventType;
    use crate::messages::AckEvent;
    use crate::relay::log_event_for_device;

    async fn wait_for_subscriber(broker: &MemoryBroker, topic: &str) {
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while broker.subscriber_count(topic) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription did not become active");
    }

    #[tokio::test]
    async fn returns_clean_when_consumer_drops_receiver() {
        let broker = MemoryBroker::new();
        let dev_eui = DeviceEui::new([9, 9, 9, 9, 9, 9, 9, 9]);
        let (tx, rx) = mpsc::channel(1);

        let relay = tokio::spawn({
            let broker = broker.clone();
            async move {
                get_event_log_for_device(&broker, CancellationToken::new(), dev_eui, tx).await
            }
        });

        let topic = device_event_topic(dev_eui);
        wait_for_subscriber(&broker, &topic).await;
        drop(rx);

        // The relay notices the dropped receiver on the next handoff.
        log_event_for_device(&broker, dev_eui, EventType::Ack, &AckEvent::default())
            .await
            .unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), relay)
            .await
            .expect("relay did not stop")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(broker.subscriber_count(&topic), 0);
    }

    #[tokio::test]
    async fn subscribe_failure_is_returned() {
        let broker = MemoryBroker::new();
        broker.fail("down");

        let (tx, _rx) = mpsc::channel(1);
        let err = get_event_log_for_device(
            &broker,
            CancellationToken::new(),
            DeviceEui::default(),
            tx,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Broker(_)));
    }

    #[tokio::test]
    async fn cancellation_during_blocked_handoff() {
        let broker = MemoryBroker::new();
        let dev_eui = DeviceEui::new([7, 7, 7, 7, 7, 7, 7, 7]);
        let cancel = CancellationToken::new();
        // Capacity 1 and no consumer: the second handoff blocks.
        let (tx, _rx) = mpsc::channel(1);

        let relay = tokio::spawn({
            let broker = broker.clone();
            let cancel = cancel.clone();
            async move { get_event_log_for_device(&broker, cancel, dev_eui, tx).await }
        });

        let topic = device_event_topic(dev_eui);
        wait_for_subscriber(&broker, &topic).await;
        for _ in 0..2 {
            log_event_for_device(&broker, dev_eui, EventType::Ack, &AckEvent::default())
                .await
                .unwrap();
        }

        cancel.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(1), relay)
            .await
            .expect("cancellation was not honored")
            .unwrap();
        assert!(result.is_ok());
    }
}
