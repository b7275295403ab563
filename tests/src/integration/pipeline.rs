//! # Pipeline Integration Tests
//!
//! Runs the full relay (config → service → inbound listener) over the
//! in-memory bus and checks what lands on the alert topics.
//!
//! ## Flow Tested
//!
//! ```text
//! stadium/events/emergency ──→ InboundHandler ──→ AlertRelayService
//!                                                     │
//!                         alerts/broadcast ←──────────┤
//!                         alerts/client/{id} ←────────┘ (targeted sends)
//! ```

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use alert_relay::{decode_alert, AlertRelayApi, ClientId, EventType, Severity};
    use relay_bus::{BusMessage, InMemoryBus, MessagePublisher, Subscription, TopicFilter};
    use relay_runtime::{build_service, serve, BusRelayService, InboundHandler, RelayConfig};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const FIRE_EVENT: &str = r#"{"event_id":"evt_1","event_type":"FIRE","timestamp":"2025-12-09T10:30:00","severity":"HIGH","details":{"description":"Fire detected in section B","disabled_tiles":[101,102,103]}}"#;

    const FIRE_ALERT: &str = r#"{"alert_id":1,"alert_type":"FIRE","message":"FIRE: Fire detected in section B","timestamp":"2025-12-09T10:30:00","severity":"HIGH","affected_areas":[101,102,103]}"#;

    type Service = BusRelayService<Arc<InMemoryBus>>;

    /// A relay listening on the in-memory bus.
    struct Harness {
        config: RelayConfig,
        bus: Arc<InMemoryBus>,
        service: Arc<Service>,
        broadcast: Subscription,
        stop: oneshot::Sender<()>,
        task: JoinHandle<bool>,
    }

    impl Harness {
        fn start(config: RelayConfig) -> Self {
            let bus = Arc::new(InMemoryBus::new());
            let service = Arc::new(build_service(Arc::clone(&bus), &config).unwrap());
            let broadcast = bus.subscribe(TopicFilter::new(config.topics.broadcast.as_str()).unwrap());
            let mut inbound = bus.subscribe(config.inbound_filter().unwrap());
            let handler = InboundHandler::new(Arc::clone(&service));
            let (stop, stopped) = oneshot::channel::<()>();

            let task = tokio::spawn(async move {
                serve(&handler, &mut inbound, async {
                    let _ = stopped.await;
                })
                .await
                .is_ok()
            });

            Self {
                config,
                bus,
                service,
                broadcast,
                stop,
                task,
            }
        }

        async fn send(&self, payload: impl Into<Vec<u8>>) {
            self.bus
                .publish(BusMessage::new(self.config.topics.inbound.as_str(), payload))
                .await
                .unwrap();
        }

        async fn stop(self) -> bool {
            let _ = self.stop.send(());
            timeout(Duration::from_secs(1), self.task)
                .await
                .expect("relay did not stop")
                .unwrap()
        }
    }

    fn event(id: &str, event_type: &str, severity: &str, description: &str) -> String {
        serde_json::json!({
            "event_id": id,
            "event_type": event_type,
            "timestamp": "2025-12-09T11:00:00.250000",
            "location": {"section": "C", "level": 2},
            "severity": severity,
            "details": {"description": description, "disabled_tiles": [301, 302]},
        })
        .to_string()
    }

    async fn next(sub: &mut Subscription) -> BusMessage {
        timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for alert")
            .expect("bus closed")
    }

    async fn assert_quiet(sub: &mut Subscription) {
        assert!(
            timeout(Duration::from_millis(100), sub.recv()).await.is_err(),
            "unexpected extra message"
        );
    }

    // =============================================================================
    // INTEGRATION TESTS: EVENT TOPIC → BROADCAST TOPIC
    // =============================================================================

    #[tokio::test]
    async fn test_reference_event_produces_reference_alert() {
        let mut relay = Harness::start(RelayConfig::default());

        relay.send(FIRE_EVENT).await;

        let message = next(&mut relay.broadcast).await;
        assert_eq!(message.topic, "alerts/broadcast");
        assert_eq!(String::from_utf8(message.payload).unwrap(), FIRE_ALERT);
        assert_quiet(&mut relay.broadcast).await;
        assert!(relay.stop().await);
    }

    #[tokio::test]
    async fn test_ids_increase_and_skip_invalid_messages() {
        let mut relay = Harness::start(RelayConfig::default());

        relay.send(event("a", "SECURITY", "LOW", "first")).await;
        relay.send(b"\xff\xfe not utf8".to_vec()).await;
        relay.send("{\"event_id\": ").await;
        relay.send(event("b", "EARTHQUAKE", "HIGH", "unknown type")).await;
        relay.send(event("c", "FIRE", "SEVERE", "unknown severity")).await;
        relay.send(event("", "FIRE", "HIGH", "empty id")).await;
        relay.send(event("d", "EVACUATION", "CRITICAL", "second")).await;
        relay
            .send(
                r#"{"event_id":"e","event_type":"MEDICAL","timestamp":"2025-12-09 11:05:00","severity":"MEDIUM","metadata":{"description":"third"}}"#,
            )
            .await;

        let mut alerts = Vec::new();
        for _ in 0..3 {
            alerts.push(decode_alert(&next(&mut relay.broadcast).await.payload).unwrap());
        }
        assert_quiet(&mut relay.broadcast).await;

        let ids: Vec<_> = alerts.iter().map(|a| a.alert_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(alerts[0].message, "SECURITY: first");
        assert_eq!(alerts[1].alert_type, EventType::Evacuation);
        assert_eq!(alerts[1].severity, Severity::Critical);
        assert_eq!(alerts[1].timestamp.as_str(), "2025-12-09T11:00:00.250000");
        assert_eq!(alerts[2].message, "MEDICAL: third");
        assert!(alerts[2].affected_areas.is_empty());
        assert!(relay.stop().await);
    }

    #[tokio::test]
    async fn test_each_event_broadcast_exactly_once() {
        let mut relay = Harness::start(RelayConfig::default());
        let mut clients = relay.bus.subscribe(TopicFilter::new("alerts/client/#").unwrap());

        for i in 0..20 {
            relay.send(event(&format!("evt_{i}"), "MEDICAL", "HIGH", "x")).await;
        }

        let mut ids = BTreeSet::new();
        for _ in 0..20 {
            let alert = decode_alert(&next(&mut relay.broadcast).await.payload).unwrap();
            assert!(ids.insert(alert.alert_id), "duplicate alert {}", alert.alert_id);
        }
        assert_eq!(ids, (1..=20).collect());
        assert_quiet(&mut relay.broadcast).await;
        assert_quiet(&mut clients).await;
        assert!(relay.stop().await);
    }

    #[tokio::test]
    async fn test_other_topics_are_ignored() {
        let mut relay = Harness::start(RelayConfig::default());

        relay
            .bus
            .publish(BusMessage::new("stadium/events/weather", FIRE_EVENT))
            .await
            .unwrap();
        assert_quiet(&mut relay.broadcast).await;

        relay.send(FIRE_EVENT).await;
        let alert = decode_alert(&next(&mut relay.broadcast).await.payload).unwrap();
        assert_eq!(alert.alert_id, 1);
        assert!(relay.stop().await);
    }

    // =============================================================================
    // INTEGRATION TESTS: TARGETED DELIVERY
    // =============================================================================

    #[tokio::test]
    async fn test_targeted_send_reaches_only_that_client() {
        let mut relay = Harness::start(RelayConfig::default());
        let mut mine = relay.bus.subscribe(TopicFilter::new("alerts/client/client_123").unwrap());
        let mut other = relay.bus.subscribe(TopicFilter::new("alerts/client/client_456").unwrap());

        relay.send(FIRE_EVENT).await;
        let broadcast = next(&mut relay.broadcast).await;
        let alert = decode_alert(&broadcast.payload).unwrap();

        let report = relay
            .service
            .send_to_clients(&alert, &[ClientId::new("client_123").unwrap()])
            .await;
        assert!(report.is_complete());

        let direct = next(&mut mine).await;
        assert_eq!(direct.topic, "alerts/client/client_123");
        assert_eq!(direct.payload, broadcast.payload);
        assert_quiet(&mut other).await;
        assert_quiet(&mut relay.broadcast).await;
        assert!(relay.stop().await);
    }

    // =============================================================================
    // INTEGRATION TESTS: CONFIGURATION AND CONCURRENCY
    // =============================================================================

    #[tokio::test]
    async fn test_custom_topics() {
        let config = RelayConfig::from_lookup(|key| match key {
            "SIMULATOR_TOPIC" => Some("venue/+/emergency".to_string()),
            "BROADCAST_TOPIC" => Some("venue/alerts".to_string()),
            _ => None,
        })
        .unwrap();
        let mut relay = Harness::start(config);

        relay
            .bus
            .publish(BusMessage::new("venue/north/emergency", FIRE_EVENT))
            .await
            .unwrap();

        let message = next(&mut relay.broadcast).await;
        assert_eq!(message.topic, "venue/alerts");
        assert_eq!(String::from_utf8(message.payload).unwrap(), FIRE_ALERT);
        assert!(relay.stop().await);
    }

    #[tokio::test]
    async fn test_listeners_sharing_a_service_never_reuse_ids() {
        let bus = Arc::new(InMemoryBus::new());
        let service = Arc::new(build_service(Arc::clone(&bus), &RelayConfig::default()).unwrap());
        let mut broadcast = bus.subscribe(TopicFilter::new("alerts/broadcast").unwrap());
        let (stop, stopped) = tokio::sync::watch::channel(false);

        let mut tasks = Vec::new();
        for zone in ["north", "south"] {
            let handler = InboundHandler::new(Arc::clone(&service));
            let mut inbound = bus.subscribe(TopicFilter::new(format!("stadium/{zone}/emergency")).unwrap());
            let stopped = stopped.clone();
            tasks.push(tokio::spawn(async move { handler.run(&mut inbound, stopped).await }));
        }

        for i in 0..50 {
            for zone in ["north", "south"] {
                bus.publish(BusMessage::new(
                    format!("stadium/{zone}/emergency"),
                    event(&format!("{zone}_{i}"), "FIRE", "LOW", zone),
                ))
                .await
                .unwrap();
            }
        }

        let mut ids = BTreeSet::new();
        for _ in 0..100 {
            let alert = decode_alert(&next(&mut broadcast).await.payload).unwrap();
            assert!(ids.insert(alert.alert_id));
        }
        assert_eq!(ids, (1..=100).collect());

        stop.send(true).unwrap();
        for task in tasks {
            assert!(timeout(Duration::from_secs(1), task).await.unwrap().unwrap().is_ok());
        }
    }
}
