//! # Alert Relay Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (decode → transform → encode)
//! └── src/integration/  # Event topic → relay → alert topics, over the in-memory bus
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p relay-tests
//!
//! # Benchmarks
//! cargo bench -p relay-tests
//! ```

pub mod integration;
