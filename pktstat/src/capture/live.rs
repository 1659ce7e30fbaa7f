//! libpcap live capture backend
//!
//! Used off Linux and whenever `--pcap` is given. The handle is opened with a
//! short read timeout so the capture loop gets a chance to observe shutdown
//! even on an idle interface.

use log::info;
use pcap::{Active, Capture, Linktype};

use super::{DropStats, FrameSource};
use crate::decode::LinkType;
use crate::domain::{CaptureConfig, CaptureError};

/// Read timeout handed to libpcap
pub const READ_TIMEOUT_MS: i32 = 100;

/// `DLT_RAW` as reported by `pcap_datalink` on most platforms
const DLT_RAW: i32 = 12;

/// libpcap live capture handle
pub struct LiveSource {
    capture: Capture<Active>,
    link: LinkType,
}

impl LiveSource {
    /// Open a promiscuous live handle on `config.interface`.
    ///
    /// # Errors
    /// [`CaptureError::InvalidFilter`] if libpcap rejects the filter,
    /// [`CaptureError::UnsupportedLinkType`] for framings the decoder cannot
    /// read, otherwise the classified libpcap error.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let snaplen = i32::try_from(config.effective_snaplen()).unwrap_or(i32::MAX);
        let buffer =
            i32::try_from(config.buffer_mb.saturating_mul(1024 * 1024)).unwrap_or(i32::MAX);

        let mut capture = Capture::from_device(config.interface.as_str())
            .and_then(|inactive| {
                inactive
                    .snaplen(snaplen)
                    .promisc(true)
                    .timeout(READ_TIMEOUT_MS)
                    .buffer_size(buffer)
                    .open()
            })
            .map_err(|e| classify_open_error(&config.interface, e))?;

        if !config.filter.is_empty() {
            capture.filter(&config.filter, true).map_err(|e| CaptureError::InvalidFilter {
                filter: config.filter.clone(),
                reason: e.to_string(),
            })?;
        }

        let datalink = capture.get_datalink();
        let link = link_type(datalink).ok_or(CaptureError::UnsupportedLinkType(datalink.0))?;

        info!("pcap capture on {} (link type {link:?}, snaplen {snaplen})", config.interface);
        Ok(Self { capture, link })
    }
}

impl FrameSource for LiveSource {
    fn read_next(&mut self) -> Result<&[u8], CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(packet.data),
            Err(pcap::Error::TimeoutExpired) => Err(CaptureError::Timeout),
            Err(pcap::Error::NoMorePackets) => Err(CaptureError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    fn link_type(&self) -> LinkType {
        self.link
    }

    fn drop_stats(&mut self) -> Option<DropStats> {
        let stats = self.capture.stats().ok()?;
        Some(DropStats {
            received: u64::from(stats.received),
            dropped: u64::from(stats.dropped) + u64::from(stats.if_dropped),
        })
    }
}

/// Decoder framing for a libpcap data link type
fn link_type(datalink: Linktype) -> Option<LinkType> {
    match datalink {
        Linktype::ETHERNET => Some(LinkType::Ethernet),
        Linktype::LINUX_SLL => Some(LinkType::LinuxSll),
        Linktype::RAW | Linktype::IPV4 | Linktype::IPV6 | Linktype(DLT_RAW) => {
            Some(LinkType::RawIp)
        }
        _ => None,
    }
}

fn classify_open_error(interface: &str, err: pcap::Error) -> CaptureError {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission") || msg.contains("not permitted") {
        CaptureError::PermissionDenied(interface.to_string())
    } else if msg.contains("no such device") || msg.contains("doesn't exist") {
        CaptureError::InterfaceNotFound(interface.to_string())
    } else {
        CaptureError::Pcap(err)
    }
}
