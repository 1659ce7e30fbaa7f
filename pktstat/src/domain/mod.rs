//! Domain model for pktstat
//!
//! This module contains configuration types and errors that provide:
//! - One explicit configuration bundle handed to the core (no globals)
//! - Structured error handling separating startup failures from retryable reads

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{BackendKind, CaptureConfig, OutputMode, RunSettings, MAX_SNAPLEN};

pub use errors::{CaptureError, ConfigError, ExportError};
