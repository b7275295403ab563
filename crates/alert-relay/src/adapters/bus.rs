//! Bus adapter: delivers alerts through any `relay_bus::MessagePublisher`.

use async_trait::async_trait;
use relay_bus::{BusMessage, MessagePublisher};

use crate::ports::outbound::{AlertSink, SinkError};

/// [`AlertSink`] over a bus publisher (MQTT in production, in-memory in tests).
pub struct BusSink<P> {
    publisher: P,
}

impl<P: MessagePublisher> BusSink<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// The wrapped publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

#[async_trait]
impl<P: MessagePublisher> AlertSink for BusSink<P> {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        self.publisher
            .publish(BusMessage::new(topic, payload))
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_bus::{InMemoryBus, TopicFilter};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_send_reaches_bus_subscriber() {
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe(TopicFilter::new("alerts/#").unwrap());
        let sink = BusSink::new(Arc::clone(&bus));

        sink.send("alerts/broadcast", b"{}".to_vec()).await.unwrap();

        let message = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(message.topic, "alerts/broadcast");
        assert_eq!(sink.publisher().messages_published(), 1);
    }

    #[tokio::test]
    async fn test_send_surfaces_bus_errors() {
        let sink = BusSink::new(InMemoryBus::new());

        let err = sink.send("alerts/#", b"{}".to_vec()).await.unwrap_err();
        assert!(err.0.contains("Invalid topic"));
    }
}
