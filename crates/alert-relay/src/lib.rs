//! # Alert Relay
//!
//! Turns emergency events published by venue sensors into alerts for
//! downstream clients.
//!
//! ## Purpose
//!
//! Consumes JSON `EmergencyEvent`s from one inbound topic, derives one
//! `Alert` per valid event, and publishes it to the broadcast topic (and,
//! when asked, to per-client topics). Invalid messages are logged and
//! dropped; they never stop the relay.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Alert ids are unique and strictly increasing, starting at 1 | `domain/transformer.rs` - atomic counter |
//! | Invalid events consume no id and publish nothing | `service.rs` - decode before transform |
//! | Unknown `event_type`/`severity` values are rejected | `domain/entities.rs` - closed enums |
//! | Each valid event is broadcast exactly once | `publisher.rs` - `publish()` |
//! | Every route carries the identical payload | `publisher.rs` - encode once |
//! | Transform panics never escape | `service.rs` - `catch_unwind` |
//!
//! ## Message Flow
//!
//! ```text
//! [inbound topic] ──decode──→ EmergencyEvent ──transform──→ Alert
//!                                                            │
//!                      ┌─────────────────────────────────────┤
//!                      ↓                                     ↓
//!             alerts/broadcast                 alerts/client/{client_id}
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/bus.rs - BusSink over any relay-bus publisher         │
//! │  service.rs      - AlertRelayService (AlertRelayApi impl)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - AlertRelayApi trait                        │
//! │  ports/outbound.rs - AlertSink trait                            │
//! │  publisher.rs      - topic scheme and routing                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs    - EmergencyEvent, Alert, enums           │
//! │  domain/transformer.rs - event → alert rule, id counter         │
//! │  domain/codec.rs       - JSON decode/encode                     │
//! │  domain/errors.rs      - RelayError, PublishError               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod publisher;
pub mod service;

pub use adapters::BusSink;
pub use domain::*;
pub use ports::{AlertRelayApi, AlertSink, RelayOutcome, SinkError};
pub use publisher::{
    AlertPublisher, ClientId, PublishReport, Route, RouteOutcome, TopicScheme,
    DEFAULT_BROADCAST_TOPIC, DEFAULT_CLIENT_TOPIC_PREFIX,
};
pub use service::AlertRelayService;
