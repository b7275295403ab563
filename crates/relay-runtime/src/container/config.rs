//! # Relay Configuration
//!
//! Read once from the environment at startup and validated before anything
//! connects.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MQTT_BROKER` | `localhost` |
//! | `MQTT_PORT` | `1883` |
//! | `MQTT_CLIENT_ID` | `alert_service` |
//! | `MQTT_KEEPALIVE_SECS` | `60` |
//! | `MQTT_QOS` | `1` |
//! | `MQTT_CONNECT_TIMEOUT_SECS` | `10` |
//! | `SIMULATOR_TOPIC` | `stadium/events/emergency` |
//! | `BROADCAST_TOPIC` | `alerts/broadcast` |
//! | `CLIENT_TOPIC_PREFIX` | `alerts/client` |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use alert_relay::{TopicScheme, DEFAULT_BROADCAST_TOPIC, DEFAULT_CLIENT_TOPIC_PREFIX};
use relay_bus::{validate_topic_name, MqttSettings, QualityOfService, TopicFilter};
use thiserror::Error;

/// Default inbound topic the stadium simulator publishes on.
pub const DEFAULT_INBOUND_TOPIC: &str = "stadium/events/emergency";

/// Complete relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelayConfig {
    /// Broker connection.
    pub broker: BrokerConfig,
    /// Topic layout.
    pub topics: TopicConfig,
}

/// Broker connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// QoS for the inbound subscription and every publish.
    pub qos: QualityOfService,
    /// How long startup waits for the broker's CONNACK.
    pub connect_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "alert_service".to_string(),
            keep_alive_secs: 60,
            qos: QualityOfService::AtLeastOnce,
            connect_timeout_secs: 10,
        }
    }
}

/// Topic configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    /// Subscription filter for inbound events.
    pub inbound: String,
    pub broadcast: String,
    pub client_prefix: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            inbound: DEFAULT_INBOUND_TOPIC.to_string(),
            broadcast: DEFAULT_BROADCAST_TOPIC.to_string(),
            client_prefix: DEFAULT_CLIENT_TOPIC_PREFIX.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse '{value}' as a number")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var}: must be greater than zero")]
    Zero { var: &'static str },

    #[error("{var}: {value} exceeds the maximum of {max}")]
    TooLarge {
        var: &'static str,
        value: u64,
        max: u64,
    },

    #[error("MQTT_QOS: '{0}' is not 0, 1 or 2")]
    InvalidQos(String),

    #[error("MQTT_CLIENT_ID: must not be empty")]
    EmptyClientId,

    #[error("MQTT_BROKER: must not be empty")]
    EmptyHost,

    #[error("{var}: invalid topic '{topic}': {reason}")]
    InvalidTopic {
        var: &'static str,
        topic: String,
        reason: String,
    },
}

impl RelayConfig {
    /// Load and validate from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load and validate from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let qos = match lookup("MQTT_QOS") {
            Some(raw) => QualityOfService::from_str(&raw).map_err(|_| ConfigError::InvalidQos(raw))?,
            None => defaults.broker.qos,
        };

        let config = Self {
            broker: BrokerConfig {
                host: lookup("MQTT_BROKER").unwrap_or(defaults.broker.host),
                port: number(&lookup, "MQTT_PORT", defaults.broker.port)?,
                client_id: lookup("MQTT_CLIENT_ID").unwrap_or(defaults.broker.client_id),
                keep_alive_secs: number(&lookup, "MQTT_KEEPALIVE_SECS", defaults.broker.keep_alive_secs)?,
                qos,
                connect_timeout_secs: number(
                    &lookup,
                    "MQTT_CONNECT_TIMEOUT_SECS",
                    defaults.broker.connect_timeout_secs,
                )?,
            },
            topics: TopicConfig {
                inbound: lookup("SIMULATOR_TOPIC").unwrap_or(defaults.topics.inbound),
                broadcast: lookup("BROADCAST_TOPIC").unwrap_or(defaults.topics.broadcast),
                client_prefix: lookup("CLIENT_TOPIC_PREFIX").unwrap_or(defaults.topics.client_prefix),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every field. Called by the loaders; call it again after
    /// editing a config by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.broker.port == 0 {
            return Err(ConfigError::Zero { var: "MQTT_PORT" });
        }
        if self.broker.client_id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        // The MQTT CONNECT packet carries keep-alive as a 16-bit field.
        if self.broker.keep_alive_secs > u64::from(u16::MAX) {
            return Err(ConfigError::TooLarge {
                var: "MQTT_KEEPALIVE_SECS",
                value: self.broker.keep_alive_secs,
                max: u64::from(u16::MAX),
            });
        }
        if self.broker.connect_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                var: "MQTT_CONNECT_TIMEOUT_SECS",
            });
        }

        self.inbound_filter()?;
        publishable("BROADCAST_TOPIC", &self.topics.broadcast)?;
        publishable("CLIENT_TOPIC_PREFIX", &self.topics.client_prefix)?;
        if self.topics.client_prefix.ends_with('/') {
            return Err(ConfigError::InvalidTopic {
                var: "CLIENT_TOPIC_PREFIX",
                topic: self.topics.client_prefix.clone(),
                reason: "must not end with '/'".to_string(),
            });
        }
        Ok(())
    }

    /// Inbound subscription filter.
    pub fn inbound_filter(&self) -> Result<TopicFilter, ConfigError> {
        TopicFilter::new(self.topics.inbound.as_str()).map_err(|e| ConfigError::InvalidTopic {
            var: "SIMULATOR_TOPIC",
            topic: self.topics.inbound.clone(),
            reason: e.to_string(),
        })
    }

    /// Outbound topic layout.
    pub fn topic_scheme(&self) -> Result<TopicScheme, ConfigError> {
        TopicScheme::new(self.topics.broadcast.as_str(), self.topics.client_prefix.as_str()).map_err(
            |e| ConfigError::InvalidTopic {
                var: "BROADCAST_TOPIC",
                topic: self.topics.broadcast.clone(),
                reason: e.to_string(),
            },
        )
    }

    /// Settings for `relay_bus::connect`.
    #[must_use]
    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            host: self.broker.host.clone(),
            port: self.broker.port,
            client_id: self.broker.client_id.clone(),
            keep_alive: Duration::from_secs(self.broker.keep_alive_secs),
            qos: self.broker.qos,
            ..MqttSettings::default()
        }
    }

    /// Startup connect deadline.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.broker.connect_timeout_secs)
    }
}

fn number<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}

fn publishable(var: &'static str, topic: &str) -> Result<(), ConfigError> {
    validate_topic_name(topic).map_err(|e| ConfigError::InvalidTopic {
        var,
        topic: topic.to_string(),
        reason: e.to_string(),
    })
}
