//! # Outbound Publisher
//!
//! Routes alerts to the broadcast topic and to per-client topics.
//!
//! ```text
//! alert ──→ {broadcast}                 (always, exactly once)
//!       ──→ {client_prefix}/{client_id} (once per requested client)
//! ```
//!
//! Every route gets the identical JSON payload. Failures are collected in a
//! [`PublishReport`] and logged; nothing is retried.

use std::fmt;

use relay_bus::validate_topic_name;
use tracing::{error, info};

use crate::domain::{encode_alert, Alert, AlertId, PublishError};
use crate::ports::outbound::AlertSink;

/// Default broadcast topic.
pub const DEFAULT_BROADCAST_TOPIC: &str = "alerts/broadcast";

/// Default prefix for per-client topics.
pub const DEFAULT_CLIENT_TOPIC_PREFIX: &str = "alerts/client";

/// Identifier of a downstream client; forms one topic level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Rejects ids that are empty or contain `/`, `+`, `#` or NUL.
    pub fn new(id: impl Into<String>) -> Result<Self, PublishError> {
        let id = id.into();
        if id.is_empty() || id.contains(['/', '+', '#', '\0']) {
            return Err(PublishError::InvalidClientId(id));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound topic layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    broadcast: String,
    client_prefix: String,
}

impl TopicScheme {
    /// Both topics must be publishable names; the prefix must not end in `/`.
    pub fn new(
        broadcast: impl Into<String>,
        client_prefix: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let broadcast = broadcast.into();
        let client_prefix = client_prefix.into();

        validate_topic_name(&broadcast).map_err(|_| PublishError::InvalidTopic(broadcast.clone()))?;
        validate_topic_name(&client_prefix)
            .map_err(|_| PublishError::InvalidTopic(client_prefix.clone()))?;
        if client_prefix.ends_with('/') {
            return Err(PublishError::InvalidTopic(client_prefix));
        }

        Ok(Self {
            broadcast,
            client_prefix,
        })
    }

    #[must_use]
    pub fn broadcast_topic(&self) -> &str {
        &self.broadcast
    }

    #[must_use]
    pub fn client_prefix(&self) -> &str {
        &self.client_prefix
    }

    /// `{prefix}/{client_id}`
    #[must_use]
    pub fn client_topic(&self, client: &ClientId) -> String {
        format!("{}/{}", self.client_prefix, client)
    }
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self {
            broadcast: DEFAULT_BROADCAST_TOPIC.to_string(),
            client_prefix: DEFAULT_CLIENT_TOPIC_PREFIX.to_string(),
        }
    }
}

/// Which audience a publish was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Broadcast,
    Client(ClientId),
}

impl Route {
    /// Metric/log label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Client(_) => "client",
        }
    }
}

/// Outcome of one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub route: Route,
    pub topic: String,
    pub error: Option<PublishError>,
}

impl RouteOutcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-route results for one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub alert_id: AlertId,
    pub outcomes: Vec<RouteOutcome>,
}

impl PublishReport {
    /// Whether the broadcast route was handed to the transport.
    #[must_use]
    pub fn broadcast_delivered(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.route == Route::Broadcast && o.is_delivered())
    }

    /// Number of routes handed to the transport.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    /// Routes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RouteOutcome> {
        self.outcomes.iter().filter(|o| !o.is_delivered())
    }

    /// True when every attempted route was delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Sends alerts through an [`AlertSink`] following a [`TopicScheme`].
pub struct AlertPublisher<S> {
    sink: S,
    topics: TopicScheme,
}

impl<S: AlertSink> AlertPublisher<S> {
    pub fn new(sink: S, topics: TopicScheme) -> Self {
        Self { sink, topics }
    }

    #[must_use]
    pub fn topics(&self) -> &TopicScheme {
        &self.topics
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Broadcast `alert`, then send it to each of `targets`.
    pub async fn publish(&self, alert: &Alert, targets: &[ClientId]) -> PublishReport {
        let mut routes = Vec::with_capacity(1 + targets.len());
        routes.push(Route::Broadcast);
        routes.extend(targets.iter().cloned().map(Route::Client));
        self.publish_routes(alert, routes).await
    }

    /// Send `alert` to the given clients only.
    pub async fn send_to_clients(&self, alert: &Alert, clients: &[ClientId]) -> PublishReport {
        let routes = clients.iter().cloned().map(Route::Client).collect();
        self.publish_routes(alert, routes).await
    }

    async fn publish_routes(&self, alert: &Alert, routes: Vec<Route>) -> PublishReport {
        let payload = match encode_alert(alert) {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(alert_id = alert.alert_id, error = %e, "Failed to encode alert");
                None
            }
        };

        let mut outcomes = Vec::with_capacity(routes.len());
        for route in routes {
            let topic = match &route {
                Route::Broadcast => self.topics.broadcast_topic().to_string(),
                Route::Client(client) => self.topics.client_topic(client),
            };

            let error = match &payload {
                Some(bytes) => self.send(alert.alert_id, &route, &topic, bytes.clone()).await,
                None => Some(PublishError::Encode {
                    alert_id: alert.alert_id,
                    reason: "serialization failed".to_string(),
                }),
            };
            outcomes.push(RouteOutcome { route, topic, error });
        }

        PublishReport {
            alert_id: alert.alert_id,
            outcomes,
        }
    }

    async fn send(
        &self,
        alert_id: AlertId,
        route: &Route,
        topic: &str,
        payload: Vec<u8>,
    ) -> Option<PublishError> {
        match self.sink.send(topic, payload).await {
            Ok(()) => {
                match route {
                    Route::Broadcast => {
                        info!(alert_id, topic, "Broadcast alert to all clients");
                    }
                    Route::Client(client) => {
                        info!(alert_id, client = %client, topic, "Sent alert to client");
                    }
                }
                None
            }
            Err(e) => {
                error!(alert_id, route = route.label(), topic, error = %e, "Failed to publish alert");
                Some(PublishError::Transport {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{decode_alert, EventTimestamp, EventType, Severity};
    use crate::ports::outbound::RecordingSink;

    fn alert(id: AlertId) -> Alert {
        Alert {
            alert_id: id,
            alert_type: EventType::Security,
            message: "SECURITY: Security incident near gate 4".to_string(),
            timestamp: EventTimestamp::parse("2025-12-09T10:30:00").unwrap(),
            severity: Severity::Medium,
            affected_areas: vec![405, 406],
        }
    }

    fn clients(ids: &[&str]) -> Vec<ClientId> {
        ids.iter().map(|id| ClientId::new(*id).unwrap()).collect()
    }

    #[test]
    fn test_client_id_validation() {
        assert!(ClientId::new("client_123").is_ok());
        assert!(ClientId::new("").is_err());
        assert!(ClientId::new("a/b").is_err());
        assert!(ClientId::new("a+").is_err());
        assert!(ClientId::new("#").is_err());
    }

    #[test]
    fn test_topic_scheme() {
        let scheme = TopicScheme::default();
        assert_eq!(scheme.broadcast_topic(), "alerts/broadcast");
        assert_eq!(
            scheme.client_topic(&ClientId::new("client_123").unwrap()),
            "alerts/client/client_123"
        );

        assert!(TopicScheme::new("alerts/#", "alerts/client").is_err());
        assert!(TopicScheme::new("alerts/broadcast", "alerts/client/").is_err());
        assert!(TopicScheme::new("", "alerts/client").is_err());
        assert!(TopicScheme::new("a/b", "c/+").is_err());
    }

    #[tokio::test]
    async fn test_publish_broadcasts_exactly_once() {
        let publisher = AlertPublisher::new(RecordingSink::new(), TopicScheme::default());

        let report = publisher.publish(&alert(1), &[]).await;

        assert_eq!(publisher.sink().topics(), vec!["alerts/broadcast"]);
        assert!(report.broadcast_delivered());
        assert_eq!(report.delivered(), 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_publish_to_targets() {
        let publisher = AlertPublisher::new(RecordingSink::new(), TopicScheme::default());

        let report = publisher
            .publish(&alert(3), &clients(&["client_123", "ops"]))
            .await;

        assert_eq!(
            publisher.sink().topics(),
            vec![
                "alerts/broadcast",
                "alerts/client/client_123",
                "alerts/client/ops"
            ]
        );
        assert_eq!(report.delivered(), 3);

        let sent = publisher.sink().sent.lock().unwrap();
        assert!(sent.iter().all(|(_, payload)| payload == &sent[0].1));
        assert_eq!(decode_alert(&sent[0].1).unwrap(), alert(3));
    }

    #[tokio::test]
    async fn test_send_to_clients_skips_broadcast() {
        let publisher = AlertPublisher::new(RecordingSink::new(), TopicScheme::default());

        let report = publisher.send_to_clients(&alert(4), &clients(&["c9"])).await;

        assert_eq!(publisher.sink().topics(), vec!["alerts/client/c9"]);
        assert!(!report.broadcast_delivered());
        assert_eq!(report.delivered(), 1);
    }

    #[tokio::test]
    async fn test_failed_route_does_not_stop_others() {
        let sink = RecordingSink::failing_on("alerts/broadcast");
        let publisher = AlertPublisher::new(sink, TopicScheme::default());

        let report = publisher.publish(&alert(5), &clients(&["c1"])).await;

        assert!(!report.broadcast_delivered());
        assert!(!report.is_complete());
        assert_eq!(report.delivered(), 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.route, Route::Broadcast);
        assert!(matches!(failure.error, Some(PublishError::Transport { .. })));
        assert_eq!(publisher.sink().topics(), vec!["alerts/client/c1"]);
    }

    #[tokio::test]
    async fn test_custom_scheme() {
        let scheme = TopicScheme::new("stadium/alerts/all", "stadium/alerts/to").unwrap();
        let publisher = AlertPublisher::new(RecordingSink::new(), scheme);

        publisher.publish(&alert(6), &clients(&["x"])).await;

        assert_eq!(
            publisher.sink().topics(),
            vec!["stadium/alerts/all", "stadium/alerts/to/x"]
        );
    }
}
