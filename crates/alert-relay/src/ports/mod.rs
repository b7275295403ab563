//! Ports (hexagonal architecture).
//!
//! - `inbound`: what the relay offers to the listener
//! - `outbound`: what the relay needs from a transport

pub mod inbound;
pub mod outbound;

pub use inbound::{AlertRelayApi, RelayOutcome};
pub use outbound::{AlertSink, SinkError};
