//! Alert watcher: what a downstream client sees.

use alert_relay::{decode_alert, Alert, ClientId, TopicScheme};
use anyhow::{Context, Result};
use relay_bus::{BusMessage, MessageSource, TopicFilter};
use serde_json::{Map, Value};

const RULE: &str = "============================================================";

/// Filters a client subscribes to: the broadcast topic and its own topic.
pub fn watch_filters(topics: &TopicScheme, client: &ClientId) -> Result<Vec<TopicFilter>> {
    Ok(vec![
        TopicFilter::new(topics.broadcast_topic()).context("Invalid broadcast topic")?,
        TopicFilter::new(topics.client_topic(client)).context("Invalid client topic")?,
    ])
}

/// Banner for one received alert.
#[must_use]
pub fn render_alert(topic: &str, alert: &Alert) -> String {
    format!(
        "{RULE}\n\
         🚨 ALERT RECEIVED on {topic}\n\
         {RULE}\n\
         Alert ID:       {}\n\
         Type:           {}\n\
         Severity:       {}\n\
         Message:        {}\n\
         Timestamp:      {}\n\
         Affected Areas: {:?}\n\
         {RULE}",
        alert.alert_id,
        alert.alert_type,
        alert.severity,
        alert.message,
        alert.timestamp,
        alert.affected_areas,
    )
}

/// Banner for a JSON object that is not a well-formed alert. Missing
/// fields show as `-`.
#[must_use]
pub fn render_fields(topic: &str, fields: &Map<String, Value>) -> String {
    let field = |name: &str| match fields.get(name) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    };

    format!(
        "{RULE}\n\
         🚨 ALERT RECEIVED on {topic}\n\
         {RULE}\n\
         Alert ID:       {}\n\
         Type:           {}\n\
         Severity:       {}\n\
         Message:        {}\n\
         Timestamp:      {}\n\
         Affected Areas: {}\n\
         {RULE}",
        field("alert_id"),
        field("alert_type"),
        field("severity"),
        field("message"),
        field("timestamp"),
        field("affected_areas"),
    )
}

/// Text printed for an inbound message, decodable or not.
///
/// Payloads that are JSON objects but not valid alerts are still shown
/// field by field.
#[must_use]
pub fn describe(message: &BusMessage) -> String {
    let err = match decode_alert(&message.payload) {
        Ok(alert) => return render_alert(&message.topic, &alert),
        Err(e) => e,
    };

    match serde_json::from_slice::<Value>(&message.payload) {
        Ok(Value::Object(fields)) => render_fields(&message.topic, &fields),
        _ => format!("✗ Failed to decode alert on {}: {}", message.topic, err),
    }
}

/// Print every message from `source` until it closes.
///
/// Returns the number of messages seen.
pub async fn run<S>(source: &mut S) -> Result<usize>
where
    S: MessageSource + ?Sized,
{
    let mut seen = 0;
    while let Some(message) = source.next_message().await? {
        println!("\n{}\n", describe(&message));
        seen += 1;
    }
    Ok(seen)
}
