//! CLI argument definitions

use std::time::Duration;

use clap::Parser;

use crate::capture::find_first_ether_iface;
use crate::domain::types::DEFAULT_BUFFER_MB;
use crate::domain::{BackendKind, CaptureConfig, OutputMode, RunSettings};

/// Default capture timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Parser, Debug)]
#[command(
    name = "pktstat",
    version,
    about = "Per-flow packet and bitrate statistics for a network interface",
    after_help = "\
EXAMPLES:
    sudo pktstat                              Auto-select interface, report after 10 minutes
    sudo pktstat -i eth0 -f 'tcp port 443'    Only HTTPS traffic on eth0
    sudo pktstat -i any -t 30 -j              30 second capture on all interfaces, JSON output
    sudo pktstat --interval 5 -t 0            Report every 5 seconds until Ctrl-C"
)]
pub struct Args {
    /// Interface to read from (default: first interface that is up, else "any")
    #[arg(short, long)]
    pub iface: Option<String>,

    /// Snapshot length in bytes (0 = 65535)
    #[arg(short, long, default_value_t = 0)]
    pub snaplen: u32,

    /// Capture buffer size in MB
    #[arg(short, long = "bufsize", default_value_t = DEFAULT_BUFFER_MB)]
    pub bufsize: usize,

    /// BPF filter expression
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Re-insert 802.1Q tags stripped by the kernel
    #[arg(short = 'v', long, alias = "add_vlan")]
    pub add_vlan: bool,

    /// Output in JSON format
    #[arg(short, long)]
    pub json: bool,

    /// Stop capturing after N seconds (0 = until interrupted)
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Print a report every N seconds (0 = final report only)
    #[arg(long, default_value_t = 0)]
    pub interval: u64,

    /// Aggregator threads draining the packet queue
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub consumers: u16,

    /// Use libpcap even where the memory-mapped ring is available
    #[arg(long)]
    pub pcap: bool,
}

impl Args {
    /// Capture parameters, resolving the default interface if none was given
    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            interface: self.iface.clone().unwrap_or_else(find_first_ether_iface),
            snaplen: self.snaplen,
            buffer_mb: self.bufsize,
            filter: self.filter.trim().to_string(),
            add_vlan: self.add_vlan,
            backend: if self.pcap { BackendKind::Pcap } else { BackendKind::Auto },
        }
    }

    #[must_use]
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            timeout: non_zero_secs(self.timeout),
            report_interval: non_zero_secs(self.interval),
            output: if self.json { OutputMode::Json } else { OutputMode::Text },
            consumers: usize::from(self.consumers),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
