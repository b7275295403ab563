//! # Relay Container
//!
//! Configuration plus the wiring that turns it into a running service.

pub mod config;
pub mod service;

pub use config::{BrokerConfig, ConfigError, RelayConfig, TopicConfig, DEFAULT_INBOUND_TOPIC};
pub use service::{build_service, BusRelayService};
