//! # Event → Alert Transformation
//!
//! | Alert field | Source |
//! |-------------|--------|
//! | `alert_id` | transformer counter (1, 2, 3, ...) |
//! | `alert_type` | `event_type` |
//! | `message` | `"{event_type}: {description}"` |
//! | `timestamp` | `timestamp`, verbatim |
//! | `severity` | `severity` |
//! | `affected_areas` | `details.disabled_tiles`, else `[]` |
//!
//! `location` is never read.

use std::sync::atomic::{AtomicU64, Ordering};

use super::entities::{Alert, AlertId, EmergencyEvent, EventType};

/// First identifier handed out by a fresh transformer.
pub const FIRST_ALERT_ID: AlertId = 1;

/// Used in the alert message when the event has no description.
pub const DEFAULT_DESCRIPTION: &str = "Emergency detected";

/// Maps one event to one alert.
///
/// Implementations may keep state (the id counter) but must be callable
/// through a shared reference.
pub trait EventTransform: Send + Sync {
    fn transform(&self, event: &EmergencyEvent) -> Alert;
}

/// The standard transformer, owning the alert-id counter.
///
/// The counter is atomic so one transformer can be shared between
/// listeners without handing out duplicate ids.
#[derive(Debug)]
pub struct AlertTransformer {
    next_id: AtomicU64,
}

impl AlertTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(FIRST_ALERT_ID)
    }

    #[must_use]
    pub fn starting_at(first_id: AlertId) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
        }
    }

    /// Identifier the next alert will get.
    #[must_use]
    pub fn peek_next_id(&self) -> AlertId {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Default for AlertTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTransform for AlertTransformer {
    fn transform(&self, event: &EmergencyEvent) -> Alert {
        let alert_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        Alert {
            alert_id,
            alert_type: event.event_type,
            message: alert_message(event.event_type, event.description()),
            timestamp: event.timestamp.clone(),
            severity: event.severity,
            affected_areas: event.disabled_tiles().to_vec(),
        }
    }
}

/// `"{event_type}: {description}"`, with [`DEFAULT_DESCRIPTION`] standing in
/// for a missing description.
#[must_use]
pub fn alert_message(event_type: EventType, description: Option<&str>) -> String {
    format!(
        "{}: {}",
        event_type,
        description.unwrap_or(DEFAULT_DESCRIPTION)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{EventDetails, EventTimestamp, Location, Severity};
    use std::sync::Arc;

    fn event(event_type: EventType, severity: Severity, details: Option<EventDetails>) -> EmergencyEvent {
        EmergencyEvent {
            event_id: "evt_test".to_string(),
            event_type,
            timestamp: EventTimestamp::parse("2025-12-09T10:30:00").unwrap(),
            location_id: None,
            location: Some(Location::section_level("B", 2)),
            severity,
            details,
            metadata: None,
        }
    }

    #[test]
    fn test_copies_fields() {
        let transformer = AlertTransformer::new();
        let source = event(
            EventType::Fire,
            Severity::High,
            Some(EventDetails::new("Fire detected in section B", vec![101, 102, 103])),
        );

        let alert = transformer.transform(&source);

        assert_eq!(alert.alert_id, 1);
        assert_eq!(alert.alert_type, source.event_type);
        assert_eq!(alert.timestamp, source.timestamp);
        assert_eq!(alert.severity, source.severity);
        assert_eq!(alert.message, "FIRE: Fire detected in section B");
        assert_eq!(alert.affected_areas, vec![101, 102, 103]);
    }

    #[test]
    fn test_ids_follow_call_order() {
        let transformer = AlertTransformer::new();
        let ids: Vec<_> = EventType::ALL
            .iter()
            .cycle()
            .take(10)
            .map(|t| transformer.transform(&event(*t, Severity::Low, None)).alert_id)
            .collect();

        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(transformer.peek_next_id(), 11);
    }

    #[test]
    fn test_missing_details() {
        let transformer = AlertTransformer::new();
        let alert = transformer.transform(&event(EventType::Evacuation, Severity::Critical, None));

        assert_eq!(alert.message, "EVACUATION: Emergency detected");
        assert!(alert.affected_areas.is_empty());
    }

    #[test]
    fn test_details_without_description_or_tiles() {
        let transformer = AlertTransformer::new();
        let alert = transformer.transform(&event(
            EventType::Security,
            Severity::Medium,
            Some(EventDetails::default()),
        ));

        assert_eq!(alert.message, "SECURITY: Emergency detected");
        assert!(alert.affected_areas.is_empty());
    }

    #[test]
    fn test_location_does_not_matter() {
        let a = AlertTransformer::new();
        let b = AlertTransformer::new();
        let with_location = event(EventType::Medical, Severity::High, None);
        let mut without_location = with_location.clone();
        without_location.location = None;

        assert_eq!(a.transform(&with_location), b.transform(&without_location));
    }

    #[test]
    fn test_starting_at() {
        let transformer = AlertTransformer::starting_at(500);
        let alert = transformer.transform(&event(EventType::Fire, Severity::Low, None));
        assert_eq!(alert.alert_id, 500);
    }

    #[test]
    fn test_shared_counter_is_unique_across_threads() {
        let transformer = Arc::new(AlertTransformer::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&transformer);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| t.transform(&event(EventType::Fire, Severity::Low, None)).alert_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<AlertId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=1000).collect::<Vec<_>>());
    }
}
