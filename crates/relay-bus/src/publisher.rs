//! # Message Publisher
//!
//! Defines the publishing side of the bus and the in-memory implementation.

use crate::message::{validate_topic_name, BusMessage, TopicFilter};
use crate::subscriber::Subscription;
use crate::{BusError, DEFAULT_CHANNEL_CAPACITY};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing messages to a topic.
///
/// Implementations return once the message has been handed to the
/// transport; delivery confirmation is the transport's business.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message.
    async fn publish(&self, message: BusMessage) -> Result<(), BusError>;

    /// Total number of messages accepted for publishing.
    fn messages_published(&self) -> u64;
}

#[async_trait]
impl<P: MessagePublisher + ?Sized> MessagePublisher for Arc<P> {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        (**self).publish(message).await
    }

    fn messages_published(&self) -> u64 {
        (**self).messages_published()
    }
}

/// In-memory bus with MQTT topic semantics.
///
/// Uses `tokio::sync::broadcast` for fan-out; each subscription applies its
/// own topic filter. Stands in for the broker in tests and local runs.
pub struct InMemoryBus {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<BusMessage>,

    /// Active subscription count by filter.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to messages whose topic matches `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: TopicFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let key = filter.as_str().to_string();

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(key.clone()).or_insert(0) += 1;
        }

        debug!(filter = %filter, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), key)
    }

    /// Number of live subscriptions for a given filter string.
    #[must_use]
    pub fn subscriptions_for(&self, filter: &str) -> usize {
        self.subscriptions
            .read()
            .map(|subs| subs.get(filter).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBus {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        validate_topic_name(&message.topic)?;

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let topic = message.topic.clone();
        let bytes = message.len();
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(topic = %topic, bytes, receivers, "Message published");
            }
            Err(_) => {
                // Like a broker with no matching subscribers: accepted, dropped.
                warn!(topic = %topic, "Message dropped (no receivers)");
            }
        }
        Ok(())
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
