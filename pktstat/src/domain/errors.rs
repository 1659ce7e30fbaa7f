//! Structured error types for pktstat
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Invalid capture configuration, detected before any socket is created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Interface buffer size is too small: {target_bytes} bytes cannot hold a single \
         {block_size}-byte ring block"
    )]
    BufferTooSmall { target_bytes: usize, block_size: usize },

    #[error("Snapshot length must be greater than zero")]
    InvalidSnaplen,

    #[error("System page size must be a power of two, got {0}")]
    InvalidPageSize(usize),

    #[error("Buffer size of {0} MB overflows the address space")]
    BufferOverflow(usize),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Interface {0} not found")]
    InterfaceNotFound(String),

    #[error("Permission denied opening {0}: raw capture requires root or CAP_NET_RAW")]
    PermissionDenied(String),

    #[error("Invalid filter expression {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Unsupported link type {0}")]
    UnsupportedLinkType(i32),

    #[error("Capture source closed")]
    Closed,

    /// No frame became ready within the poll window
    #[error("Read timed out")]
    Timeout,

    /// The blocking read was interrupted by a signal
    #[error("Read interrupted")]
    Interrupted,

    /// The current batch of frames was unusable; the next read starts fresh
    #[error("Transient read failure: {0}")]
    Transient(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pcap(#[from] pcap::Error),
}

impl CaptureError {
    /// Whether the capture loop should simply issue the next read
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::Timeout | CaptureError::Interrupted | CaptureError::Transient(_) => true,
            CaptureError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Whether the failure is a user configuration problem rather than a runtime one
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            CaptureError::Config(_)
                | CaptureError::InvalidFilter { .. }
                | CaptureError::InterfaceNotFound(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
