//! Tracing/logging setup shared by every stockroom entry point.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, init_with};
