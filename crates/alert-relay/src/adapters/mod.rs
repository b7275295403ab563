//! Adapters connecting the relay's ports to `relay-bus`.

pub mod bus;

pub use bus::BusSink;
