//! Domain entities for the alert relay.
//!
//! `EmergencyEvent` is what producers send; `Alert` is what subscribers get.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat};
use serde_json::Number;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::errors::RelayError;

/// Alert identifier, unique and increasing within one process lifetime.
pub type AlertId = u64;

/// Tile identifier as sent by the stadium simulator.
pub type TileId = i64;

/// Kind of emergency. Also the alert type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Fire,
    Security,
    Medical,
    Evacuation,
}

impl EventType {
    /// Every accepted event type.
    pub const ALL: [EventType; 4] = [
        EventType::Fire,
        EventType::Security,
        EventType::Medical,
        EventType::Evacuation,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "FIRE",
            Self::Security => "SECURITY",
            Self::Medical => "MEDICAL",
            Self::Evacuation => "EVACUATION",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RelayError::Validation(format!("unknown event type '{s}'")))
    }
}

/// Event severity. Carried through unchanged; no ordering is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Every accepted severity.
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| RelayError::Validation(format!("unknown severity '{s}'")))
    }
}

/// Epoch values above this magnitude are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 20_000_000_000;

/// Producer-assigned ISO-8601 timestamp.
///
/// Validated on the way in, but the producer's text is kept verbatim so the
/// alert carries exactly what the event carried. Unix epoch numbers are also
/// accepted and rendered as UTC RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct EventTimestamp(String);

/// Wire forms of a timestamp.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Epoch(Number),
}

impl EventTimestamp {
    const NAIVE_FORMATS: [&'static str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    const OFFSET_FORMATS: [&'static str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M%:z",
    ];

    /// Parse and keep `raw`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, RelayError> {
        let raw = raw.into();
        if Self::interpret(&raw).is_some() {
            Ok(Self(raw))
        } else {
            Err(RelayError::Validation(format!("invalid timestamp '{raw}'")))
        }
    }

    /// Seconds (or milliseconds, past [`EPOCH_MILLIS_THRESHOLD`]) since the
    /// Unix epoch.
    pub fn from_epoch(value: &Number) -> Result<Self, RelayError> {
        let invalid = || RelayError::Validation(format!("invalid epoch timestamp {value}"));

        let (secs, nanos) = match value.as_i64() {
            Some(n) if n.abs() > EPOCH_MILLIS_THRESHOLD => {
                (n.div_euclid(1000), (n.rem_euclid(1000) * 1_000_000) as u32)
            }
            Some(n) => (n, 0),
            None => {
                let mut f = value.as_f64().ok_or_else(invalid)?;
                if f.abs() > EPOCH_MILLIS_THRESHOLD as f64 {
                    f /= 1000.0;
                }
                if !f.is_finite() || f.abs() > i64::MAX as f64 {
                    return Err(invalid());
                }
                let whole = f.floor();
                let nanos = ((f - whole) * 1e9).round().min(999_999_999.0) as u32;
                (whole as i64, nanos)
            }
        };

        DateTime::from_timestamp(secs, nanos)
            .map(|dt| Self(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)))
            .ok_or_else(invalid)
    }

    /// Current local time without offset, microsecond precision.
    #[must_use]
    pub fn now() -> Self {
        Self(
            Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        )
    }

    /// The producer's text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The instant, if the text carried an offset.
    #[must_use]
    pub fn with_offset(&self) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.0) {
            return Some(dt);
        }
        let raw = match self.0.strip_suffix('Z') {
            Some(rest) => format!("{rest}+00:00"),
            None => self.0.clone(),
        };
        Self::OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(&raw, fmt).ok())
    }

    /// Wall-clock reading, ignoring any offset.
    #[must_use]
    pub fn naive(&self) -> Option<NaiveDateTime> {
        Self::interpret(&self.0)
    }

    fn interpret(raw: &str) -> Option<NaiveDateTime> {
        let candidate = Self(raw.to_string());
        if let Some(dt) = candidate.with_offset() {
            return Some(dt.naive_local());
        }
        Self::NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

impl TryFrom<String> for EventTimestamp {
    type Error = RelayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl<'de> Deserialize<'de> for EventTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Text(text) => Self::parse(text),
            RawTimestamp::Epoch(number) => Self::from_epoch(&number),
        }
        .map_err(de::Error::custom)
    }
}

impl From<EventTimestamp> for String {
    fn from(ts: EventTimestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for EventTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the event happened. Opaque to the relay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(pub Map<String, Value>);

impl Location {
    /// Build from the simulator's section/level pair.
    #[must_use]
    pub fn section_level(section: &str, level: i64) -> Self {
        let mut map = Map::new();
        map.insert("section".to_string(), Value::from(section));
        map.insert("level".to_string(), Value::from(level));
        Self(map)
    }

    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.0.get("section").and_then(Value::as_str)
    }

    #[must_use]
    pub fn level(&self) -> Option<i64> {
        self.0.get("level").and_then(Value::as_i64)
    }
}

/// Free-form event payload. Only `description` and `disabled_tiles` are read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_tiles: Option<Vec<TileId>>,

    /// Anything else the producer attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventDetails {
    pub fn new(description: impl Into<String>, disabled_tiles: Vec<TileId>) -> Self {
        Self {
            description: Some(description.into()),
            disabled_tiles: Some(disabled_tiles),
            extra: Map::new(),
        }
    }
}

/// Inbound event from the stadium simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub timestamp: EventTimestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    pub severity: Severity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EventDetails>,

    /// Older simulator builds send the details under this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventDetails>,
}

impl EmergencyEvent {
    /// `details`, falling back to `metadata`.
    #[must_use]
    pub fn effective_details(&self) -> Option<&EventDetails> {
        self.details.as_ref().or(self.metadata.as_ref())
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.effective_details()
            .and_then(|d| d.description.as_deref())
    }

    /// Tiles disabled by the event; empty when none were reported.
    #[must_use]
    pub fn disabled_tiles(&self) -> &[TileId] {
        self.effective_details()
            .and_then(|d| d.disabled_tiles.as_deref())
            .unwrap_or(&[])
    }

    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.event_id.trim().is_empty() {
            return Err(RelayError::Validation("event_id is empty".to_string()));
        }
        Ok(())
    }
}

/// Outbound alert. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: AlertId,
    pub alert_type: EventType,
    pub message: String,
    pub timestamp: EventTimestamp,
    pub severity: Severity,
    #[serde(default)]
    pub affected_areas: Vec<TileId>,
}
