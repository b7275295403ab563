//! # Bus Messages
//!
//! Defines the unit that flows through the bus and the MQTT topic rules
//! both bus implementations share.

use crate::BusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic level separator.
pub const LEVEL_SEPARATOR: char = '/';

/// A payload addressed to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Concrete topic name (never contains wildcards).
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Create a new message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualityOfService {
    /// Fire and forget (QoS 0).
    AtMostOnce,
    /// Acknowledged delivery (QoS 1).
    #[default]
    AtLeastOnce,
    /// Assured single delivery (QoS 2).
    ExactlyOnce,
}

impl QualityOfService {
    /// Numeric MQTT level.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QualityOfService {
    type Error = BusError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(BusError::InvalidQos(other)),
        }
    }
}

impl FromStr for QualityOfService {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level: u8 = s
            .trim()
            .parse()
            .map_err(|_| BusError::InvalidQos(u8::MAX))?;
        Self::try_from(level)
    }
}

impl From<QualityOfService> for rumqttc::QoS {
    fn from(qos: QualityOfService) -> Self {
        match qos {
            QualityOfService::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QualityOfService::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QualityOfService::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Check that `topic` can be published to.
///
/// Topic names must be non-empty and may not contain wildcards or NUL.
pub fn validate_topic_name(topic: &str) -> Result<(), BusError> {
    if topic.is_empty() {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "topic is empty",
        });
    }
    if topic.contains(['+', '#']) {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "wildcards are not allowed in topic names",
        });
    }
    if topic.contains('\0') {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "topic contains NUL",
        });
    }
    Ok(())
}

/// An MQTT subscription filter.
///
/// `+` matches exactly one level, `#` matches the remaining levels
/// (including none) and must be the last level. Topics starting with `$`
/// are not matched by filters whose first level is a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    filter: String,
}

impl TopicFilter {
    /// Parse and validate a filter.
    pub fn new(filter: impl Into<String>) -> Result<Self, BusError> {
        let filter = filter.into();
        if filter.is_empty() {
            return Err(BusError::InvalidTopic {
                topic: filter,
                reason: "filter is empty",
            });
        }

        let levels: Vec<&str> = filter.split(LEVEL_SEPARATOR).collect();
        let last = levels.len() - 1;
        for (i, level) in levels.iter().enumerate() {
            if level.contains('#') && (*level != "#" || i != last) {
                return Err(BusError::InvalidTopic {
                    topic: filter.clone(),
                    reason: "'#' must occupy the whole last level",
                });
            }
            if level.contains('+') && *level != "+" {
                return Err(BusError::InvalidTopic {
                    topic: filter.clone(),
                    reason: "'+' must occupy a whole level",
                });
            }
        }

        Ok(Self { filter })
    }

    /// Filter matching every non-`$` topic.
    #[must_use]
    pub fn all() -> Self {
        Self {
            filter: "#".to_string(),
        }
    }

    /// The filter string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.filter
    }

    /// Whether the filter contains any wildcard.
    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.filter.contains(['+', '#'])
    }

    /// Check if a concrete topic matches this filter.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        if topic.starts_with('$') && self.filter.starts_with(['+', '#']) {
            return false;
        }

        let mut topic_levels = topic.split(LEVEL_SEPARATOR);
        for filter_level in self.filter.split(LEVEL_SEPARATOR) {
            if filter_level == "#" {
                return true;
            }
            match topic_levels.next() {
                Some(level) if filter_level == "+" || filter_level == level => {}
                _ => return false,
            }
        }
        topic_levels.next().is_none()
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filter)
    }
}

impl FromStr for TopicFilter {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
