//! JSON codec for events and alerts.

use serde_json::error::Category;

use super::entities::{Alert, EmergencyEvent};
use super::errors::RelayError;

/// Decode and validate an inbound payload.
///
/// Syntax errors map to [`RelayError::MalformedJson`]; schema violations
/// (missing fields, unknown enum values, bad types) map to
/// [`RelayError::Validation`].
pub fn decode_event(payload: &[u8]) -> Result<EmergencyEvent, RelayError> {
    let text = std::str::from_utf8(payload).map_err(|e| RelayError::InvalidUtf8(e.to_string()))?;

    let event: EmergencyEvent = serde_json::from_str(text).map_err(|e| match e.classify() {
        Category::Data => RelayError::Validation(e.to_string()),
        Category::Syntax | Category::Eof | Category::Io => RelayError::MalformedJson(e.to_string()),
    })?;

    event.validate()?;
    Ok(event)
}

/// Encode an event the way producers send it.
pub fn encode_event(event: &EmergencyEvent) -> Result<Vec<u8>, RelayError> {
    serde_json::to_vec(event).map_err(|e| RelayError::Encode(e.to_string()))
}

/// Encode an alert for the outbound topics.
pub fn encode_alert(alert: &Alert) -> Result<Vec<u8>, RelayError> {
    serde_json::to_vec(alert).map_err(|e| RelayError::Encode(e.to_string()))
}

/// Decode an alert as subscribers receive it.
pub fn decode_alert(payload: &[u8]) -> Result<Alert, RelayError> {
    serde_json::from_slice(payload).map_err(|e| match e.classify() {
        Category::Data => RelayError::Validation(e.to_string()),
        _ => RelayError::MalformedJson(e.to_string()),
    })
}
