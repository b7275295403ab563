//! Outbound (Driven) port for the alert relay.

use async_trait::async_trait;
use thiserror::Error;

/// Transport failure reported by an [`AlertSink`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Where encoded alerts go.
///
/// `send` returns once the transport has accepted the payload; there is no
/// delivery acknowledgment at this level.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError>;
}

/// Recording sink for testing.
#[cfg(test)]
pub struct RecordingSink {
    pub sent: std::sync::Mutex<Vec<(String, Vec<u8>)>>,
    pub failing_topics: Vec<String>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            failing_topics: Vec::new(),
        }
    }

    pub fn failing_on(topic: &str) -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            failing_topics: vec![topic.to_string()],
        }
    }

    pub fn topics(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        if self.failing_topics.iter().any(|t| t == topic) {
            return Err(SinkError("simulated transport failure".to_string()));
        }
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}
