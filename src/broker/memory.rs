// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process broker backed by tokio broadcast channels.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::error::BrokerError;

use super::{EventBroker, EventStream};

/// Per-topic buffer between a publisher and a slow subscriber.
const CHANNEL_CAPACITY: usize = 256;

/// An in-process pub/sub broker.
///
/// Each topic maps to a tokio broadcast channel: every subscriber gets
/// its own copy of each payload, delivery to one subscriber is
/// independent of the others, and nothing is retained for subscribers
/// that attach later.
///
/// `MemoryBroker` is cheaply cloneable (via `Arc`); clones share the
/// same topic space. It is the substitute for a transport-backed broker
/// in tests and works as a real broker for single-process deployments.
///
/// # Buffering
///
/// Each subscription buffers up to 256 payloads. A subscriber that lags
/// further behind loses the oldest payloads for that subscription only;
/// the loss is logged and the stream continues.
///
/// # Examples
///
/// ```
/// use eventlog_relay::broker::{EventBroker, EventStream, MemoryBroker};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let broker = MemoryBroker::new();
/// let mut stream = broker.subscribe("some:topic").await.unwrap();
/// broker.publish("some:topic", b"payload".to_vec()).await.unwrap();
///
/// let payload = stream.next().await.unwrap().unwrap();
/// assert_eq!(payload, b"payload");
/// stream.close().await;
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    topics: RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>,
    /// Set once by `fail`; active streams terminate with this reason.
    failure: RwLock<Option<String>>,
}

impl MemoryBroker {
    /// Creates a new broker with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of active subscribers for a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Simulates a transport failure.
    ///
    /// All active subscription streams terminate with
    /// [`BrokerError::ConnectionLost`] and subsequent publish and
    /// subscribe calls fail with the same reason. Used to exercise the
    /// failure paths that a transport-backed broker produces when its
    /// connection drops.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(reason = %reason, "Simulating broker failure");
        *self.inner.failure.write() = Some(reason);
        // Dropping the senders wakes every receiver with a closed error.
        self.inner.topics.write().clear();
    }

    fn failure(&self) -> Option<String> {
        self.inner.failure.read().clone()
    }
}

impl EventBroker for MemoryBroker {
    type Stream = MemoryEventStream;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if let Some(reason) = self.failure() {
            return Err(BrokerError::ConnectionLost(reason));
        }

        let sender = self.inner.topics.read().get(topic).cloned();
        if let Some(tx) = sender {
            // A send error only means there is no subscriber right now,
            // which is not a publish failure.
            let delivered = tx.send(payload).unwrap_or(0);
            tracing::trace!(topic = %topic, delivered, "Published payload");
        } else {
            tracing::trace!(topic = %topic, "Published payload without subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Self::Stream, BrokerError> {
        if let Some(reason) = self.failure() {
            return Err(BrokerError::ConnectionLost(reason));
        }

        let rx = {
            let mut topics = self.inner.topics.write();
            let tx = topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
            tx.subscribe()
        };

        tracing::debug!(topic = %topic, "Subscribed to topic");
        Ok(MemoryEventStream {
            topic: topic.to_string(),
            rx,
            inner: Arc::clone(&self.inner),
        })
    }
}

/// A live subscription on a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryEventStream {
    topic: String,
    rx: broadcast::Receiver<Vec<u8>>,
    inner: Arc<Inner>,
}

impl EventStream for MemoryEventStream {
    async fn next(&mut self) -> Option<Result<Vec<u8>, BrokerError>> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(Ok(payload)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        topic = %self.topic,
                        skipped,
                        "Subscriber lagged behind; payloads dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return self
                        .inner
                        .failure
                        .read()
                        .clone()
                        .map(|reason| Err(BrokerError::ConnectionLost(reason)));
                }
            }
        }
    }

    async fn close(self) {
        let Self { topic, rx, inner } = self;
        drop(rx);

        // Drop the topic entry once the last subscriber is gone so the
        // map does not accumulate dead topics.
        let mut topics = inner.topics.write();
        if let Some(tx) = topics.get(&topic)
            && tx.receiver_count() == 0
        {
            topics.remove(&topic);
            tracing::debug!(topic = %topic, "Removed topic without subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscriber_succeeds() {
        let broker = MemoryBroker::new();
        broker.publish("t", b"payload".to_vec()).await.unwrap();
        assert_eq!(broker.subscriber_count("t"), 0);
    }

    #[tokio::test]
    async fn subscribe_then_receive() {
        let broker = MemoryBroker::new();
        let mut stream = broker.subscribe("t").await.unwrap();
        assert_eq!(broker.subscriber_count("t"), 1);

        broker.publish("t", vec![1, 2, 3]).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let broker = MemoryBroker::new();
        let mut stream_a = broker.subscribe("a").await.unwrap();
        let mut stream_b = broker.subscribe("b").await.unwrap();

        broker.publish("b", b"for-b".to_vec()).await.unwrap();
        broker.publish("a", b"for-a".to_vec()).await.unwrap();

        // Each stream sees only its own topic's payload.
        assert_eq!(stream_a.next().await.unwrap().unwrap(), b"for-a");
        assert_eq!(stream_b.next().await.unwrap().unwrap(), b"for-b");
    }

    #[tokio::test]
    async fn fan_out_to_multiple_subscribers() {
        let broker = MemoryBroker::new();
        let mut stream1 = broker.subscribe("t").await.unwrap();
        let mut stream2 = broker.subscribe("t").await.unwrap();
        assert_eq!(broker.subscriber_count("t"), 2);

        broker.publish("t", b"x".to_vec()).await.unwrap();
        assert_eq!(stream1.next().await.unwrap().unwrap(), b"x");
        assert_eq!(stream2.next().await.unwrap().unwrap(), b"x");
    }

    #[tokio::test]
    async fn no_replay_for_late_subscriber() {
        let broker = MemoryBroker::new();
        broker.publish("t", b"early".to_vec()).await.unwrap();

        let mut stream = broker.subscribe("t").await.unwrap();
        broker.publish("t", b"late".to_vec()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), b"late");
    }

    #[tokio::test]
    async fn close_releases_subscription() {
        let broker = MemoryBroker::new();
        let stream = broker.subscribe("t").await.unwrap();
        assert_eq!(broker.subscriber_count("t"), 1);

        stream.close().await;
        assert_eq!(broker.subscriber_count("t"), 0);
        assert!(!broker.inner.topics.read().contains_key("t"));
    }

    #[tokio::test]
    async fn close_keeps_topic_for_remaining_subscriber() {
        let broker = MemoryBroker::new();
        let stream1 = broker.subscribe("t").await.unwrap();
        let _stream2 = broker.subscribe("t").await.unwrap();

        stream1.close().await;
        assert_eq!(broker.subscriber_count("t"), 1);
    }

    #[tokio::test]
    async fn fail_terminates_streams_with_error() {
        let broker = MemoryBroker::new();
        let mut stream = broker.subscribe("t").await.unwrap();

        broker.fail("connection reset");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, BrokerError::ConnectionLost(reason) if reason == "connection reset"));
    }

    #[tokio::test]
    async fn fail_rejects_publish_and_subscribe() {
        let broker = MemoryBroker::new();
        broker.fail("gone");

        let err = broker.publish("t", vec![]).await.unwrap_err();
        assert!(matches!(err, BrokerError::ConnectionLost(_)));
        assert!(broker.subscribe("t").await.is_err());
    }

    #[tokio::test]
    async fn clones_share_topic_space() {
        let broker = MemoryBroker::new();
        let clone = broker.clone();

        let mut stream = broker.subscribe("t").await.unwrap();
        clone.publish("t", b"via-clone".to_vec()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), b"via-clone");
    }
}
