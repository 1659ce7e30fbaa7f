//! # Frame Source
//!
//! Opens a capture handle on a network interface and yields raw frames one at
//! a time. Two backends sit behind the [`FrameSource`] trait:
//!
//! - `ring`: `AF_PACKET` socket with a `TPACKET_V3` memory-mapped receive ring
//!   (Linux only, default there)
//! - `live`: libpcap live capture handle (everywhere else, or `--pcap`)
//!
//! Frames are borrowed: the slice returned by [`FrameSource::read_next`] stays
//! valid only until the next call on the same source. Callers that need the
//! data longer must copy it. Closing happens on drop.

pub mod bpf;
pub mod iface;
pub mod layout;
pub mod live;
#[cfg(target_os = "linux")]
pub mod ring;

pub use bpf::BpfInstruction;
pub use iface::find_first_ether_iface;
pub use layout::RingLayout;
pub use live::LiveSource;
#[cfg(target_os = "linux")]
pub use ring::RingSource;

use crate::decode::LinkType;
use crate::domain::{CaptureConfig, CaptureError};
#[cfg(target_os = "linux")]
use crate::domain::BackendKind;

/// Kernel-side counters, cumulative since the source was opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropStats {
    /// Frames seen by the kernel filter
    pub received: u64,
    /// Frames lost because the ring or buffer was full
    pub dropped: u64,
}

/// A stream of captured frames.
pub trait FrameSource {
    /// Next captured frame.
    ///
    /// # Errors
    /// Retryable errors ([`CaptureError::is_retryable`]) mean "nothing right
    /// now, call again". Anything else ends the capture.
    fn read_next(&mut self) -> Result<&[u8], CaptureError>;

    /// Framing of the returned bytes
    fn link_type(&self) -> LinkType;

    /// Loss counters, if the backend exposes them
    fn drop_stats(&mut self) -> Option<DropStats> {
        None
    }
}

/// The backend selected at open time
pub enum Backend {
    #[cfg(target_os = "linux")]
    Ring(RingSource),
    Live(LiveSource),
}

impl Backend {
    /// Open the backend `config` asks for.
    ///
    /// # Errors
    /// Ring sizing and filter errors surface before any kernel resource is
    /// created. Unknown interfaces and missing privileges are reported as
    /// [`CaptureError::InterfaceNotFound`] / [`CaptureError::PermissionDenied`].
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        #[cfg(target_os = "linux")]
        {
            if config.backend == BackendKind::Auto {
                return RingSource::open(config).map(Backend::Ring);
            }
        }
        LiveSource::open(config).map(Backend::Live)
    }

    /// Short backend name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(target_os = "linux")]
            Backend::Ring(_) => "af_packet",
            Backend::Live(_) => "pcap",
        }
    }
}

impl FrameSource for Backend {
    fn read_next(&mut self) -> Result<&[u8], CaptureError> {
        match self {
            #[cfg(target_os = "linux")]
            Backend::Ring(source) => source.read_next(),
            Backend::Live(source) => source.read_next(),
        }
    }

    fn link_type(&self) -> LinkType {
        match self {
            #[cfg(target_os = "linux")]
            Backend::Ring(source) => source.link_type(),
            Backend::Live(source) => source.link_type(),
        }
    }

    fn drop_stats(&mut self) -> Option<DropStats> {
        match self {
            #[cfg(target_os = "linux")]
            Backend::Ring(source) => source.drop_stats(),
            Backend::Live(source) => source.drop_stats(),
        }
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_next(&mut self) -> Result<&[u8], CaptureError> {
        (**self).read_next()
    }

    fn link_type(&self) -> LinkType {
        (**self).link_type()
    }

    fn drop_stats(&mut self) -> Option<DropStats> {
        (**self).drop_stats()
    }
}
