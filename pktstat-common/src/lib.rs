//! # Shared Flow Data Model
//!
//! Types and wire constants shared between the capture path (decoder,
//! BPF compiler) and the aggregation/reporting side of `pktstat`.
//!
//! ## Key Types
//!
//! - [`FlowKey`] - Unidirectional 5-tuple identifying a flow
//! - [`Protocol`] - Deepest recognized layer of a packet
//! - [`FlowStats`] - Running totals kept per flow
//! - [`CaptureEvent`] - One accepted packet, handed from capture to aggregation
//!
//! ## Ordering
//!
//! `FlowKey` implements a total order (source address, destination address,
//! protocol, source port, destination port). Reports use it as the tie-break
//! after bitrate so output is reproducible regardless of hash map iteration.

use std::fmt;
use std::net::IpAddr;

// ============================================================================
// Link Layer Constants
// ============================================================================

/// IPv4 EtherType
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// IPv6 EtherType
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// IEEE 802.1Q customer VLAN tag
pub const ETHERTYPE_VLAN: u16 = 0x8100;

/// IEEE 802.1ad service VLAN tag (QinQ outer tag)
pub const ETHERTYPE_QINQ: u16 = 0x88A8;

/// Legacy pre-standard QinQ outer tag still emitted by some switches
pub const ETHERTYPE_QINQ_LEGACY: u16 = 0x9100;

/// Length of the Linux cooked capture (`LINKTYPE_LINUX_SLL`) header.
///
/// The protocol field sits in the last two bytes.
pub const LINUX_SLL_HEADER_LEN: usize = 16;

/// Maximum number of stacked VLAN tags skipped before giving up
pub const MAX_VLAN_TAGS: usize = 2;

// ============================================================================
// IP Protocol Numbers
// ============================================================================

pub const IPPROTO_HOPOPTS: u8 = 0;
pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ROUTING: u8 = 43;
pub const IPPROTO_FRAGMENT: u8 = 44;
pub const IPPROTO_AH: u8 = 51;
pub const IPPROTO_ICMPV6: u8 = 58;
pub const IPPROTO_DSTOPTS: u8 = 60;

/// Upper bound on IPv6 extension headers walked per packet
pub const MAX_IPV6_EXTENSIONS: usize = 8;

// ============================================================================
// Flow Identity
// ============================================================================

/// Deepest recognized layer of a packet.
///
/// `Ipv4` / `Ipv6` are used when the network layer was decoded but the payload
/// protocol is not one of the tracked transports (or the packet is a
/// non-initial fragment). Variant order is the tie-break order in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Icmpv4,
    Icmpv6,
}

impl Protocol {
    /// Textual protocol name used by every renderer
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Ipv4 => "IPv4",
            Protocol::Ipv6 => "IPv6",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmpv4 => "ICMPv4",
            Protocol::Icmpv6 => "ICMPv6",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a unidirectional traffic flow.
///
/// Ports are zero for protocols without ports. Equality, hashing and ordering
/// are structural over all five fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub proto: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    /// Key for a protocol without ports
    #[must_use]
    pub const fn without_ports(src_ip: IpAddr, dst_ip: IpAddr, proto: Protocol) -> Self {
        Self { src_ip, dst_ip, proto, src_port: 0, dst_port: 0 }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Running totals for one flow.
///
/// `bytes` and `packets` only ever grow. `bitrate` is derived: it is rewritten
/// by every snapshot from `bytes` and the elapsed time of that snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowStats {
    pub bytes: u64,
    pub packets: u64,
    /// Bits per second as of the last snapshot
    pub bitrate: f64,
}

impl FlowStats {
    /// Fold one packet of `len` bytes into the totals
    #[inline]
    pub fn record(&mut self, len: u64) {
        self.bytes = self.bytes.saturating_add(len);
        self.packets = self.packets.saturating_add(1);
    }
}

/// One accepted packet travelling from the capture thread to the aggregator.
///
/// Consumed exactly once, never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureEvent {
    pub key: FlowKey,
    /// Captured frame length in bytes
    pub len: u64,
}
