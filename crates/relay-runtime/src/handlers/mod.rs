//! # Event Handlers
//!
//! The inbound listener loop feeding the relay service.

pub mod listener;

pub use listener::InboundHandler;
