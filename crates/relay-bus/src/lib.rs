//! # Relay Bus - Topic-Addressed Messaging
//!
//! The transport seam of the alert relay. Everything above this crate talks
//! to a [`MessagePublisher`] and a [`MessageSource`]; which broker sits
//! behind them is decided at wiring time.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────────────────┐
//! │  Publisher   │ ────────────→ │ MqttBus | InMemoryBus    │
//! └──────────────┘               └──────────────────────────┘
//!                                            │
//! ┌──────────────┐ next_message()            │
//! │  Listener    │ ←─────────── MqttConnection | Subscription
//! └──────────────┘
//! ```
//!
//! ## Topics
//!
//! Topic names and filters follow MQTT 3.1.1: `/` separates levels, `+`
//! matches one level, `#` matches the rest. Both implementations apply the
//! same rules, so tests on the in-memory bus route exactly like the broker.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod message;
pub mod mqtt;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use error::BusError;
pub use message::{validate_topic_name, BusMessage, QualityOfService, TopicFilter};
pub use mqtt::{connect, MqttBus, MqttConnection, MqttSettings};
pub use publisher::{InMemoryBus, MessagePublisher};
pub use subscriber::{MessageSource, Subscription, SubscriptionError};

/// Maximum messages to buffer per in-memory subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
