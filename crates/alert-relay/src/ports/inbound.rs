//! Inbound (Driving) port for the alert relay.

use async_trait::async_trait;

use crate::domain::{Alert, EmergencyEvent, RelayError};
use crate::publisher::{ClientId, PublishReport};

/// Result of relaying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// The alert derived from the event.
    pub alert: Alert,
    /// Per-route delivery results.
    pub report: PublishReport,
}

/// Primary API of the relay, driven by the inbound listener.
#[async_trait]
pub trait AlertRelayApi: Send + Sync {
    /// Decode a raw inbound payload, transform it and publish the alert.
    ///
    /// # Errors
    ///
    /// Any decode, validation or transformation failure. Publish failures
    /// are not errors here; they are reported in [`RelayOutcome::report`].
    async fn handle_message(&self, topic: &str, payload: &[u8])
        -> Result<RelayOutcome, RelayError>;

    /// Transform an already decoded event and publish the alert.
    async fn process_event(&self, event: EmergencyEvent) -> Result<RelayOutcome, RelayError>;

    /// Send an existing alert to specific clients only, without broadcasting.
    async fn send_to_clients(&self, alert: &Alert, clients: &[ClientId]) -> PublishReport;
}
