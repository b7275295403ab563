//! # Alert Relay Service
//!
//! Application service implementing [`AlertRelayApi`]:
//!
//! ```text
//! payload ──decode──→ EmergencyEvent ──transform──→ Alert ──publish──→ topics
//!            │                           │
//!            └── RelayError (discard) ←──┘ (panics caught here)
//! ```
//!
//! Nothing escapes `handle_message` as a panic, so a bad message can never
//! take down the listener loop that drives it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::{decode_event, Alert, AlertTransformer, EmergencyEvent, EventTransform, RelayError};
use crate::ports::inbound::{AlertRelayApi, RelayOutcome};
use crate::ports::outbound::AlertSink;
use crate::publisher::{AlertPublisher, ClientId, PublishReport};

/// The relay: one transformer, one publisher.
pub struct AlertRelayService<S, T = AlertTransformer> {
    transformer: T,
    publisher: AlertPublisher<S>,
}

impl<S: AlertSink> AlertRelayService<S, AlertTransformer> {
    /// Service with a fresh transformer (first alert id is 1).
    pub fn new(publisher: AlertPublisher<S>) -> Self {
        Self::with_transformer(AlertTransformer::new(), publisher)
    }
}

impl<S: AlertSink, T: EventTransform> AlertRelayService<S, T> {
    pub fn with_transformer(transformer: T, publisher: AlertPublisher<S>) -> Self {
        Self {
            transformer,
            publisher,
        }
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    pub fn publisher(&self) -> &AlertPublisher<S> {
        &self.publisher
    }

    fn transform_guarded(&self, event: &EmergencyEvent) -> Result<Alert, RelayError> {
        catch_unwind(AssertUnwindSafe(|| self.transformer.transform(event))).map_err(|panic| {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "transformation panicked".to_string());
            RelayError::Internal(detail)
        })
    }
}

#[async_trait]
impl<S: AlertSink, T: EventTransform> AlertRelayApi for AlertRelayService<S, T> {
    async fn handle_message(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<RelayOutcome, RelayError> {
        let event = decode_event(payload).map_err(|e| {
            warn!(
                topic,
                bytes = payload.len(),
                reason = e.reason(),
                error = %e,
                "Discarding inbound message"
            );
            e
        })?;

        info!(
            topic,
            event_id = %event.event_id,
            event_type = %event.event_type,
            severity = %event.severity,
            "Received emergency event"
        );

        self.process_event(event).await
    }

    async fn process_event(&self, event: EmergencyEvent) -> Result<RelayOutcome, RelayError> {
        let alert = self.transform_guarded(&event).map_err(|e| {
            warn!(
                event_id = %event.event_id,
                reason = e.reason(),
                error = %e,
                "Discarding event after transformation failure"
            );
            e
        })?;

        let report = self.publisher.publish(&alert, &[]).await;
        Ok(RelayOutcome { alert, report })
    }

    async fn send_to_clients(&self, alert: &Alert, clients: &[ClientId]) -> PublishReport {
        self.publisher.send_to_clients(alert, clients).await
    }
}
