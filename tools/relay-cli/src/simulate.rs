//! Stadium event simulator.
//!
//! Publishes a fixed set of emergencies to the inbound topic, one every
//! `interval`, each at a random section and level.

use std::time::Duration;

use alert_relay::{
    encode_event, EmergencyEvent, EventDetails, EventTimestamp, EventType, Location, Severity,
    TileId,
};
use anyhow::{Context, Result};
use rand::Rng;
use relay_bus::{BusMessage, MessagePublisher};
use uuid::Uuid;

/// Sections an event can be placed in.
pub const SECTIONS: [&str; 4] = ["A", "B", "C", "D"];

/// Highest stadium level.
pub const MAX_LEVEL: i64 = 3;

/// One canned emergency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    pub event_type: EventType,
    pub severity: Severity,
    pub description: &'static str,
    pub disabled_tiles: Vec<TileId>,
}

/// The emergencies `simulate` sends, in order.
#[must_use]
pub fn canned_events() -> Vec<EventTemplate> {
    vec![
        EventTemplate {
            event_type: EventType::Fire,
            severity: Severity::High,
            description: "Fire detected in section B",
            disabled_tiles: vec![101, 102, 103, 201, 202],
        },
        EventTemplate {
            event_type: EventType::Security,
            severity: Severity::Medium,
            description: "Security incident near gate 4",
            disabled_tiles: vec![405, 406],
        },
        EventTemplate {
            event_type: EventType::Medical,
            severity: Severity::High,
            description: "Medical emergency in section C",
            disabled_tiles: vec![301],
        },
        EventTemplate {
            event_type: EventType::Evacuation,
            severity: Severity::Critical,
            description: "Evacuation required - all sections",
            disabled_tiles: (100..500).collect(),
        },
    ]
}

/// Instantiate `template` with a fresh id, the current time and a random
/// location.
pub fn build_event<R: Rng>(template: &EventTemplate, rng: &mut R) -> EmergencyEvent {
    let section = SECTIONS[rng.gen_range(0..SECTIONS.len())];
    let level = rng.gen_range(1..=MAX_LEVEL);

    EmergencyEvent {
        event_id: format!("evt_{}", Uuid::new_v4().simple()),
        event_type: template.event_type,
        timestamp: EventTimestamp::now(),
        location_id: None,
        location: Some(Location::section_level(section, level)),
        severity: template.severity,
        details: Some(EventDetails::new(
            template.description,
            template.disabled_tiles.clone(),
        )),
        metadata: None,
    }
}

/// Publish every canned event to `topic`, pausing `interval` between them.
///
/// Returns the number of events published.
pub async fn run<P, R>(publisher: &P, topic: &str, interval: Duration, rng: &mut R) -> Result<usize>
where
    P: MessagePublisher + ?Sized,
    R: Rng + Send,
{
    let templates = canned_events();
    let total = templates.len();

    for (i, template) in templates.iter().enumerate() {
        let event = build_event(template, rng);
        let payload = encode_event(&event).context("Failed to encode event")?;

        publisher
            .publish(BusMessage::new(topic, payload))
            .await
            .with_context(|| format!("Failed to publish {} event", event.event_type))?;

        println!("[Event {}/{}]", i + 1, total);
        println!("✓ Published {} event", event.event_type);
        println!("  Event ID: {}", event.event_id);
        println!("  Severity: {}", event.severity);
        println!("  Details: {}\n", template.description);

        if i + 1 < total {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_relay::decode_event;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use relay_bus::{InMemoryBus, TopicFilter};

    #[test]
    fn test_canned_events() {
        let events = canned_events();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, EventType::ALL.to_vec());
        assert_eq!(events[3].severity, Severity::Critical);
        assert_eq!(events[3].disabled_tiles.len(), 400);
        assert_eq!(events[3].disabled_tiles.first(), Some(&100));
        assert_eq!(events[3].disabled_tiles.last(), Some(&499));
    }

    #[test]
    fn test_build_event_is_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for template in canned_events() {
            let event = build_event(&template, &mut rng);
            let location = event.location.clone().unwrap();

            assert!(SECTIONS.contains(&location.section().unwrap()));
            assert!((1..=MAX_LEVEL).contains(&location.level().unwrap()));
            assert_eq!(event.description(), Some(template.description));

            let decoded = decode_event(&encode_event(&event).unwrap()).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_event_ids_are_unique() {
        let mut rng = StdRng::seed_from_u64(1);
        let template = &canned_events()[0];
        let a = build_event(template, &mut rng);
        let b = build_event(template, &mut rng);
        assert_ne!(a.event_id, b.event_id);
    }

    #[tokio::test]
    async fn test_run_publishes_all_events() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe(TopicFilter::new("stadium/events/emergency").unwrap());
        let mut rng = StdRng::seed_from_u64(3);

        let sent = run(&bus, "stadium/events/emergency", Duration::ZERO, &mut rng)
            .await
            .unwrap();

        assert_eq!(sent, 4);
        assert_eq!(bus.messages_published(), 4);
        for expected in EventType::ALL {
            let message = sub.try_recv().unwrap().unwrap();
            assert_eq!(decode_event(&message.payload).unwrap().event_type, expected);
        }
    }
}
