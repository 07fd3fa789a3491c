// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT-backed broker implementation.
//!
//! A single MQTT connection is shared by every publish and subscribe
//! call on the broker. Incoming messages are fanned out per topic to the
//! active [`MqttEventStream`]s; when the last stream for a topic closes,
//! the broker unsubscribes from the MQTT topic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::{broadcast, oneshot};

use crate::error::BrokerError;

use super::{EventBroker, EventStream};

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Per-topic buffer between the MQTT event loop and a slow subscriber.
const CHANNEL_CAPACITY: usize = 256;

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
struct MqttEventBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttEventBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// An event broker backed by a shared MQTT connection.
///
/// `MqttEventBroker` is cheaply cloneable (via `Arc`); all clones share
/// one connection and one subscription table, so any number of relay
/// tasks can publish and subscribe concurrently.
///
/// On connection loss every active stream terminates with
/// [`BrokerError::ConnectionLost`]; reconnection is the caller's
/// responsibility via a fresh broker.
///
/// # Examples
///
/// ```no_run
/// use eventlog_relay::broker::MqttEventBroker;
///
/// # async fn example() -> eventlog_relay::Result<()> {
/// let broker = MqttEventBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .credentials("user", "password")
///     .build()
///     .await?;
///
/// assert!(broker.is_connected());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MqttEventBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client for publishing and subscription management.
    client: AsyncClient,
    /// Fan-out channels for active subscriptions, by topic.
    topics: tokio::sync::RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>,
    /// Configuration used for this connection.
    config: MqttEventBrokerConfig,
    /// Connection status.
    connected: AtomicBool,
    /// Reason the connection was lost, if it was.
    failure: parking_lot::RwLock<Option<String>>,
}

impl MqttEventBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttEventBrokerBuilder {
        MqttEventBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns the number of topics with active subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.inner.topics.read().await.len()
    }

    /// Disconnects from the broker.
    ///
    /// Active subscription streams terminate; pending relay calls return.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect operation fails.
    pub async fn disconnect(&self) -> Result<(), BrokerError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.topics.write().await.clear();
        self.inner.client.disconnect().await.map_err(BrokerError::Mqtt)?;
        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn failure(&self) -> Option<String> {
        self.inner.failure.read().clone()
    }
}

impl EventBroker for MqttEventBroker {
    type Stream = MqttEventStream;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if let Some(reason) = self.failure() {
            return Err(BrokerError::ConnectionLost(reason));
        }

        tracing::debug!(topic = %topic, size = payload.len(), "Publishing to MQTT broker");
        self.inner
            .client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(BrokerError::Mqtt)
    }

    async fn subscribe(&self, topic: &str) -> Result<Self::Stream, BrokerError> {
        if let Some(reason) = self.failure() {
            return Err(BrokerError::ConnectionLost(reason));
        }

        let (rx, needs_mqtt_subscribe) = {
            let mut topics = self.inner.topics.write().await;
            let needs_mqtt_subscribe = !topics.contains_key(topic);
            let tx = topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
            (tx.subscribe(), needs_mqtt_subscribe)
        };

        if needs_mqtt_subscribe {
            if let Err(e) = self.inner.client.subscribe(topic, QoS::AtLeastOnce).await {
                self.inner.topics.write().await.remove(topic);
                return Err(BrokerError::Mqtt(e));
            }
            tracing::debug!(topic = %topic, "Subscribed to MQTT topic");
        }

        Ok(MqttEventStream {
            topic: topic.to_string(),
            rx,
            inner: Arc::clone(&self.inner),
        })
    }
}

impl std::fmt::Debug for MqttEventBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttEventBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// A live subscription on an [`MqttEventBroker`].
pub struct MqttEventStream {
    topic: String,
    rx: broadcast::Receiver<Vec<u8>>,
    inner: Arc<MqttBrokerInner>,
}

impl EventStream for MqttEventStream {
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

        // Unsubscribe from MQTT once the last stream for this topic is
        // gone, so the broker stops sending traffic nobody consumes.
        let mut topics = inner.topics.write().await;
        if let Some(tx) = topics.get(&topic)
            && tx.receiver_count() == 0
        {
            topics.remove(&topic);
            drop(topics);
            if let Err(e) = inner.client.unsubscribe(&topic).await {
                tracing::warn!(topic = %topic, error = %e, "Failed to unsubscribe from MQTT topic");
            } else {
                tracing::debug!(topic = %topic, "Unsubscribed from MQTT topic");
            }
        }
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use eventlog_relay::broker::MqttEventBroker;
///
/// # async fn example() -> eventlog_relay::Result<()> {
/// let broker = MqttEventBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttEventBrokerBuilder {
    config: MqttEventBrokerConfig,
}

impl MqttEventBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if the host is not set, the connection fails, or
    /// the connection times out.
    pub async fn build(self) -> Result<MqttEventBroker, BrokerError> {
        if self.config.host.is_empty() {
            return Err(BrokerError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        // Generate unique client ID (PID + counter to avoid conflicts).
        let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("eventlog_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let inner = MqttBrokerInner {
            client,
            topics: tokio::sync::RwLock::new(HashMap::new()),
            config: self.config.clone(),
            connected: AtomicBool::new(false),
            failure: parking_lot::RwLock::new(None),
        };

        let broker = MqttEventBroker {
            inner: Arc::new(inner),
        };

        // Channel to signal when ConnAck is received.
        let (connack_tx, connack_rx) = oneshot::channel();

        let broker_clone = broker.clone();
        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, connack_tx).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    "Connected to MQTT broker"
                );
                Ok(broker)
            }
            Ok(Err(_)) => Err(BrokerError::ConnectionFailed(
                "MQTT event loop terminated unexpectedly".to_string(),
            )),
            Err(_) => Err(BrokerError::ConnectionFailed(format!(
                "MQTT connection timeout after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// Drives the MQTT event loop, fanning incoming messages out to the
/// per-topic subscription channels.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttEventBroker,
    connack_tx: oneshot::Sender<()>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let sender = broker.inner.topics.read().await.get(&publish.topic).cloned();
                if let Some(tx) = sender {
                    // A send error only means every stream for the topic
                    // is mid-close; the payload can be discarded.
                    let _ = tx.send(publish.payload.to_vec());
                } else {
                    tracing::trace!(topic = %publish.topic, "No subscriber for MQTT message");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                fail_broker(&broker, "disconnected by broker").await;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT broker event loop error");
                fail_broker(&broker, e.to_string()).await;
                break;
            }
        }
    }
}

/// Records the failure reason and wakes every subscription stream.
async fn fail_broker(broker: &MqttEventBroker, reason: impl Into<String>) {
    let reason = reason.into();
    tracing::info!(reason = %reason, "MQTT broker connection lost");
    broker.inner.connected.store(false, Ordering::Release);
    *broker.inner.failure.write() = Some(reason);
    // Dropping the senders wakes every receiver with a closed error.
    broker.inner.topics.write().await.clear();
}
