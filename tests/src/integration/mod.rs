//! Cross-crate pipeline tests.

pub mod pipeline;
