//! Error types for the alert relay.

use thiserror::Error;

/// Why an inbound message did not become an alert.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Payload bytes are not UTF-8.
    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Payload is not parseable JSON.
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// JSON is well-formed but not a valid event.
    #[error("Invalid event: {0}")]
    Validation(String),

    /// Alert could not be serialized.
    #[error("Failed to encode alert: {0}")]
    Encode(String),

    /// A transformation step failed unexpectedly.
    #[error("Internal error while processing event: {0}")]
    Internal(String),
}

impl RelayError {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::MalformedJson(_) => "malformed_json",
            Self::Validation(_) => "validation",
            Self::Encode(_) => "encode",
            Self::Internal(_) => "internal",
        }
    }
}

/// Failure to deliver an alert on one route.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// Client identifier cannot form a topic level.
    #[error("Invalid client id '{0}'")]
    InvalidClientId(String),

    /// Topic is not publishable.
    #[error("Invalid topic '{0}'")]
    InvalidTopic(String),

    /// Alert could not be serialized.
    #[error("Failed to encode alert {alert_id}: {reason}")]
    Encode { alert_id: u64, reason: String },

    /// The transport refused the message.
    #[error("Transport rejected publish to '{topic}': {reason}")]
    Transport { topic: String, reason: String },
}
