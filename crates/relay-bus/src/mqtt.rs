//! # MQTT Transport
//!
//! Bus implementation backed by a broker via `rumqttc`.
//!
//! ```text
//!   MqttBus ──publish()──→ request channel ──→ MqttConnection (event loop) ──→ broker
//!                                                     │
//!                      next_message() ←── Publish ────┘
//! ```
//!
//! The event loop only makes progress while `MqttConnection` is polled, so
//! the owner must keep calling [`MessageSource::next_message`]. Publishing
//! never waits on the event loop: a full request channel is an error. Reconnects
//! are driven by `rumqttc` on the next poll; subscriptions are re-issued on
//! every CONNACK because sessions are clean.

use crate::message::{validate_topic_name, BusMessage, QualityOfService, TopicFilter};
use crate::publisher::MessagePublisher;
use crate::subscriber::MessageSource;
use crate::BusError;
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection parameters for [`connect`].
#[derive(Debug, Clone)]
pub struct MqttSettings {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// QoS for subscriptions and publishes.
    pub qos: QualityOfService,
    /// Capacity of the client request channel.
    pub channel_capacity: usize,
    /// Pause between failed polls while the transport reconnects.
    pub reconnect_delay: Duration,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "alert_service".to_string(),
            keep_alive: Duration::from_secs(60),
            qos: QualityOfService::AtLeastOnce,
            channel_capacity: 64,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl MqttSettings {
    /// Build `rumqttc` options from these settings.
    #[must_use]
    pub fn to_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options
    }

    /// `host:port` for logging.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Create a client/event-loop pair. No network I/O happens until the
/// returned connection is polled.
#[must_use]
pub fn connect(settings: &MqttSettings) -> (MqttBus, MqttConnection) {
    let (client, eventloop) = AsyncClient::new(settings.to_options(), settings.channel_capacity);

    let bus = MqttBus {
        client: client.clone(),
        qos: settings.qos,
        messages_published: AtomicU64::new(0),
    };
    let connection = MqttConnection {
        client,
        eventloop,
        filters: Vec::new(),
        qos: settings.qos,
        connected: false,
        reconnect_delay: settings.reconnect_delay,
        address: settings.address(),
    };
    (bus, connection)
}

/// Publishing half of an MQTT connection.
pub struct MqttBus {
    client: AsyncClient,
    qos: QualityOfService,
    messages_published: AtomicU64,
}

impl MqttBus {
    /// QoS used for publishes.
    #[must_use]
    pub fn qos(&self) -> QualityOfService {
        self.qos
    }

    /// Queue a DISCONNECT. It is sent the next time the connection is polled.
    pub fn disconnect(&self) -> Result<(), BusError> {
        self.client
            .try_disconnect()
            .map_err(|e| BusError::Transport(e.to_string()))
    }
}

#[async_trait]
impl MessagePublisher for MqttBus {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        validate_topic_name(&message.topic)?;

        let topic = message.topic;
        let bytes = message.payload.len();
        // The caller may be the task that polls the event loop, so waiting
        // for channel space would never return.
        self.client
            .try_publish(topic.as_str(), self.qos.into(), false, message.payload)
            .map_err(|e| BusError::Transport(format!("request queue full or closed: {e}")))?;

        self.messages_published.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %topic, bytes, qos = self.qos.level(), "Message queued for broker");
        Ok(())
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}

/// Receiving half of an MQTT connection; owns the event loop.
pub struct MqttConnection {
    client: AsyncClient,
    eventloop: EventLoop,
    filters: Vec<TopicFilter>,
    qos: QualityOfService,
    connected: bool,
    reconnect_delay: Duration,
    address: String,
}

impl MqttConnection {
    /// Register a subscription. It is issued now if connected and again
    /// after every reconnect.
    pub fn subscribe(&mut self, filter: TopicFilter) -> Result<(), BusError> {
        if self.connected {
            self.issue_subscribe(&filter)?;
        }
        self.filters.push(filter);
        Ok(())
    }

    /// Registered subscription filters.
    #[must_use]
    pub fn filters(&self) -> &[TopicFilter] {
        &self.filters
    }

    /// Whether the last CONNACK was a success and no error followed it.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Drive the event loop until the broker accepts the connection.
    ///
    /// Any transport error or refusal is returned as-is; no retry happens
    /// here. Inbound publishes seen before the CONNACK are discarded.
    pub async fn wait_connected(&mut self, deadline: Duration) -> Result<(), BusError> {
        let attempt = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => return self.on_connack(&ack),
                    Ok(other) => debug!(event = ?other, "Event before CONNACK"),
                    Err(e) => return Err(BusError::Connection(e.to_string())),
                }
            }
        };

        tokio::time::timeout(deadline, attempt)
            .await
            .map_err(|_| BusError::Timeout(deadline))?
    }

    /// Poll until the queued DISCONNECT has been written or `deadline`
    /// passes. Inbound messages arriving meanwhile are dropped.
    pub async fn close(mut self, deadline: Duration) {
        let drain = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(deadline, drain).await.is_err() {
            warn!(broker = %self.address, "Disconnect not confirmed before deadline");
        }
        self.connected = false;
    }

    fn on_connack(&mut self, ack: &ConnAck) -> Result<(), BusError> {
        if ack.code != ConnectReturnCode::Success {
            self.connected = false;
            return Err(BusError::Refused(format!("{:?}", ack.code)));
        }

        self.connected = true;
        info!(broker = %self.address, "Connected to MQTT broker");
        for filter in &self.filters {
            self.issue_subscribe(filter)?;
        }
        Ok(())
    }

    fn issue_subscribe(&self, filter: &TopicFilter) -> Result<(), BusError> {
        // try_subscribe: the event loop is the only consumer of the request
        // channel, so awaiting here could deadlock.
        self.client
            .try_subscribe(filter.as_str(), self.qos.into())
            .map_err(|e| BusError::Transport(e.to_string()))?;
        info!(filter = %filter, qos = self.qos.level(), "Subscribed to topic");
        Ok(())
    }
}

#[async_trait]
impl MessageSource for MqttConnection {
    async fn next_message(&mut self) -> Result<Option<BusMessage>, BusError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(Some(BusMessage::new(publish.topic, publish.payload.to_vec())));
                }
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if let Err(e) = self.on_connack(&ack) {
                        warn!(error = %e, "Reconnect rejected");
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!(broker = %self.address, "Broker sent DISCONNECT");
                    self.connected = false;
                }
                Ok(_) => {}
                Err(e) => {
                    if self.connected {
                        warn!(broker = %self.address, error = %e, "Unexpected disconnection");
                    } else {
                        debug!(broker = %self.address, error = %e, "Reconnect attempt failed");
                    }
                    self.connected = false;
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}
