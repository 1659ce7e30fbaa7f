//! # Protocol Decoder
//!
//! Turns one captured frame into a [`FlowKey`] in a single forward pass:
//!
//! ```text
//! link header ──► [VLAN tags] ──► IPv4 | IPv6 [ext headers] ──► TCP | UDP | ICMPv4 | ICMPv6
//! ```
//!
//! ## Protocol Tag
//!
//! The deepest recognized layer wins. A complete transport header yields
//! `Tcp`/`Udp`/`Icmpv4`/`Icmpv6`; an unrecognized IP payload protocol or a
//! non-initial fragment yields `Ipv4`/`Ipv6` with zero ports.
//!
//! ## Rejection
//!
//! Frames without an IPv4/IPv6 layer, and frames whose headers are truncated or
//! malformed at any layer, are [`Rejected`] as a whole. A key is never built
//! from a partially decoded frame. Truncated *payloads* (snapshot length shorter
//! than the packet) are fine: only header bytes are required.
//!
//! Decoding never allocates and never panics, including on empty input.

use std::net::IpAddr;

use etherparse::{
    Ethernet2HeaderSlice, Icmpv4Slice, Icmpv6Slice, Ipv4HeaderSlice, Ipv6HeaderSlice,
    SingleVlanHeaderSlice, TcpHeaderSlice, UdpHeaderSlice,
};
use pktstat_common::{
    FlowKey, Protocol, ETHERTYPE_IPV4, ETHERTYPE_IPV6, ETHERTYPE_QINQ, ETHERTYPE_QINQ_LEGACY,
    ETHERTYPE_VLAN, IPPROTO_AH, IPPROTO_DSTOPTS, IPPROTO_FRAGMENT, IPPROTO_HOPOPTS, IPPROTO_ICMP,
    IPPROTO_ICMPV6, IPPROTO_ROUTING, IPPROTO_TCP, IPPROTO_UDP, LINUX_SLL_HEADER_LEN,
    MAX_IPV6_EXTENSIONS, MAX_VLAN_TAGS,
};

/// Framing of the bytes delivered by a capture backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// Ethernet II, optionally VLAN tagged
    Ethernet,
    /// Linux cooked capture v1 (libpcap on the `any` device)
    LinuxSll,
    /// No link header, the frame starts with the IP header
    RawIp,
}

/// Layer at which a frame failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Link,
    Network,
    Transport,
}

/// Why a frame produced no flow key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Header bytes missing or inconsistent at the given layer
    Malformed(Layer),
    /// Valid link layer carrying something other than IPv4/IPv6
    NotIp,
}

/// Decode a frame into its flow key.
///
/// # Errors
/// Returns [`Rejected`] for non-IP traffic and for truncated or malformed
/// headers. Rejected frames must not be counted anywhere.
pub fn decode(frame: &[u8], link: LinkType) -> Result<FlowKey, Rejected> {
    let (ether_type, network) = match link {
        LinkType::Ethernet => ethernet(frame)?,
        LinkType::LinuxSll => linux_sll(frame)?,
        LinkType::RawIp => return raw_ip(frame),
    };

    match ether_type {
        ETHERTYPE_IPV4 => ipv4(network),
        ETHERTYPE_IPV6 => ipv6(network),
        _ => Err(Rejected::NotIp),
    }
}

fn ethernet(frame: &[u8]) -> Result<(u16, &[u8]), Rejected> {
    let eth =
        Ethernet2HeaderSlice::from_slice(frame).map_err(|_| Rejected::Malformed(Layer::Link))?;
    skip_vlan_tags(eth.ether_type().0, &frame[eth.slice().len()..])
}

fn linux_sll(frame: &[u8]) -> Result<(u16, &[u8]), Rejected> {
    if frame.len() < LINUX_SLL_HEADER_LEN {
        return Err(Rejected::Malformed(Layer::Link));
    }
    let protocol =
        u16::from_be_bytes([frame[LINUX_SLL_HEADER_LEN - 2], frame[LINUX_SLL_HEADER_LEN - 1]]);
    skip_vlan_tags(protocol, &frame[LINUX_SLL_HEADER_LEN..])
}

fn raw_ip(frame: &[u8]) -> Result<FlowKey, Rejected> {
    match frame.first().map(|b| b >> 4) {
        Some(4) => ipv4(frame),
        Some(6) => ipv6(frame),
        Some(_) => Err(Rejected::NotIp),
        None => Err(Rejected::Malformed(Layer::Network)),
    }
}

/// VLAN tags never become part of the key
fn skip_vlan_tags(mut ether_type: u16, mut rest: &[u8]) -> Result<(u16, &[u8]), Rejected> {
    for _ in 0..MAX_VLAN_TAGS {
        if !matches!(ether_type, ETHERTYPE_VLAN | ETHERTYPE_QINQ | ETHERTYPE_QINQ_LEGACY) {
            break;
        }
        let vlan = SingleVlanHeaderSlice::from_slice(rest)
            .map_err(|_| Rejected::Malformed(Layer::Link))?;
        ether_type = vlan.ether_type().0;
        rest = &rest[vlan.slice().len()..];
    }
    Ok((ether_type, rest))
}

fn ipv4(data: &[u8]) -> Result<FlowKey, Rejected> {
    let ip = Ipv4HeaderSlice::from_slice(data).map_err(|_| Rejected::Malformed(Layer::Network))?;
    let header = ip.slice();
    let src = IpAddr::V4(ip.source_addr());
    let dst = IpAddr::V4(ip.destination_addr());

    // Only the first fragment carries the transport header
    let fragment_offset = u16::from_be_bytes([header[6], header[7]]) & 0x1FFF;
    if fragment_offset != 0 {
        return Ok(FlowKey::without_ports(src, dst, Protocol::Ipv4));
    }

    // Drop link padding; a zero total length (segmentation offload) keeps everything
    let total = usize::from(ip.total_len());
    let end = if total >= header.len() { total.min(data.len()) } else { data.len() };

    transport(ip.protocol().0, &data[header.len()..end], src, dst, Protocol::Ipv4)
}

fn ipv6(data: &[u8]) -> Result<FlowKey, Rejected> {
    let ip = Ipv6HeaderSlice::from_slice(data).map_err(|_| Rejected::Malformed(Layer::Network))?;
    let header_len = ip.slice().len();
    let src = IpAddr::V6(ip.source_addr());
    let dst = IpAddr::V6(ip.destination_addr());

    // Payload length 0 is a jumbogram (or offload); keep what was captured
    let payload_len = usize::from(ip.payload_length());
    let end =
        if payload_len == 0 { data.len() } else { (header_len + payload_len).min(data.len()) };

    let mut next_header = ip.next_header().0;
    let mut payload = &data[header_len..end];

    for _ in 0..MAX_IPV6_EXTENSIONS {
        if !matches!(
            next_header,
            IPPROTO_HOPOPTS | IPPROTO_ROUTING | IPPROTO_DSTOPTS | IPPROTO_FRAGMENT | IPPROTO_AH
        ) {
            break;
        }
        let Some(&[ext_next, ext_len, b2, b3]) =
            payload.get(..4).and_then(|s| <&[u8; 4]>::try_from(s).ok())
        else {
            return Err(Rejected::Malformed(Layer::Network));
        };
        let len = match next_header {
            IPPROTO_FRAGMENT => {
                if u16::from_be_bytes([b2, b3]) >> 3 != 0 {
                    return Ok(FlowKey::without_ports(src, dst, Protocol::Ipv6));
                }
                8
            }
            IPPROTO_AH => (usize::from(ext_len) + 2) * 4,
            _ => (usize::from(ext_len) + 1) * 8,
        };
        if payload.len() < len {
            return Err(Rejected::Malformed(Layer::Network));
        }
        next_header = ext_next;
        payload = &payload[len..];
    }

    transport(next_header, payload, src, dst, Protocol::Ipv6)
}

fn transport(
    protocol: u8,
    payload: &[u8],
    src_ip: IpAddr,
    dst_ip: IpAddr,
    network: Protocol,
) -> Result<FlowKey, Rejected> {
    let key = match protocol {
        IPPROTO_TCP => {
            let tcp = TcpHeaderSlice::from_slice(payload).map_err(malformed_transport)?;
            FlowKey {
                src_ip,
                dst_ip,
                proto: Protocol::Tcp,
                src_port: tcp.source_port(),
                dst_port: tcp.destination_port(),
            }
        }
        IPPROTO_UDP => {
            let udp = UdpHeaderSlice::from_slice(payload).map_err(malformed_transport)?;
            FlowKey {
                src_ip,
                dst_ip,
                proto: Protocol::Udp,
                src_port: udp.source_port(),
                dst_port: udp.destination_port(),
            }
        }
        IPPROTO_ICMP => {
            Icmpv4Slice::from_slice(payload).map_err(malformed_transport)?;
            FlowKey::without_ports(src_ip, dst_ip, Protocol::Icmpv4)
        }
        IPPROTO_ICMPV6 => {
            Icmpv6Slice::from_slice(payload).map_err(malformed_transport)?;
            FlowKey::without_ports(src_ip, dst_ip, Protocol::Icmpv6)
        }
        _ => FlowKey::without_ports(src_ip, dst_ip, network),
    };
    Ok(key)
}

fn malformed_transport<E>(_: E) -> Rejected {
    Rejected::Malformed(Layer::Transport)
}
