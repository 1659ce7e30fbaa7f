//! Configuration bundle consumed by the capture core
//!
//! Built once by the CLI layer (see [`crate::cli::Args`]) and passed by
//! reference into the components that need it.

use std::time::Duration;

/// Snapshot length used when the caller asks for "maximum" (0)
pub const MAX_SNAPLEN: u32 = 65_535;

/// Default ring buffer size in megabytes
pub const DEFAULT_BUFFER_MB: usize = 8;

/// Wildcard interface capturing on every device
pub const ANY_INTERFACE: &str = "any";

/// Which capture backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Memory-mapped ring where the platform has one, libpcap otherwise
    #[default]
    Auto,
    /// Always use the libpcap live capture handle
    Pcap,
}

/// How reports are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

/// Frame Source parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub interface: String,
    /// Snapshot length in bytes (0 means [`MAX_SNAPLEN`])
    pub snaplen: u32,
    /// Target ring size in megabytes
    pub buffer_mb: usize,
    /// Packet filter expression; empty matches everything
    pub filter: String,
    /// Re-insert stripped 802.1Q tags into delivered frames
    pub add_vlan: bool,
    pub backend: BackendKind,
}

impl CaptureConfig {
    /// Snapshot length with the "0 = maximum" convention resolved
    #[must_use]
    pub fn effective_snaplen(&self) -> u32 {
        if self.snaplen == 0 {
            MAX_SNAPLEN
        } else {
            self.snaplen
        }
    }

    /// Whether the wildcard interface was requested
    #[must_use]
    pub fn is_any_interface(&self) -> bool {
        self.interface == ANY_INTERFACE
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: ANY_INTERFACE.to_string(),
            snaplen: 0,
            buffer_mb: DEFAULT_BUFFER_MB,
            filter: String::new(),
            add_vlan: false,
            backend: BackendKind::Auto,
        }
    }
}

/// Session parameters for the lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Hard capture timeout (`None` = unbounded)
    pub timeout: Option<Duration>,
    /// Periodic report interval (`None` = final report only)
    pub report_interval: Option<Duration>,
    pub output: OutputMode,
    /// Number of aggregator threads draining the event queue
    pub consumers: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { timeout: None, report_interval: None, output: OutputMode::Text, consumers: 1 }
    }
}
