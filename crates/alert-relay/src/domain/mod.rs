//! Domain layer: entities, codec and the transformation rule.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod transformer;

pub use codec::{decode_alert, decode_event, encode_alert, encode_event};
pub use entities::{
    Alert, AlertId, EmergencyEvent, EventDetails, EventTimestamp, EventType, Location, Severity,
    TileId,
};
pub use errors::{PublishError, RelayError};
pub use transformer::{
    alert_message, AlertTransformer, EventTransform, DEFAULT_DESCRIPTION, FIRST_ALERT_ID,
};
