//! Bus error type.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by bus implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic name or filter is malformed.
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    /// QoS level outside 0..=2.
    #[error("Invalid QoS level: {0}")]
    InvalidQos(u8),

    /// The client could not hand a request to the transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection to the broker failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The broker answered the connect with a non-success code.
    #[error("Broker refused connection: {0}")]
    Refused(String),

    /// An operation did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The bus was closed.
    #[error("Message bus closed")]
    Closed,
}
