//! Common routines for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use etherparse::PacketBuilder;
use pktstat::capture::FrameSource;
use pktstat::decode::LinkType;
use pktstat::domain::CaptureError;

pub const MAC_A: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
pub const MAC_B: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];

const ETH_IPV4_UDP: usize = 14 + 20 + 8;
const ETH_IPV4_TCP: usize = 14 + 20 + 20;

/// Ethernet/IPv4/UDP frame of exactly `frame_len` bytes
pub fn udp_frame(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, frame_len: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(MAC_A, MAC_B).ipv4(src, dst, 64).udp(sport, dport);
    let payload = vec![0u8; frame_len - ETH_IPV4_UDP];
    let mut out = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut out, &payload).unwrap();
    assert_eq!(out.len(), frame_len);
    out
}

/// Ethernet/IPv4/TCP frame of exactly `frame_len` bytes
pub fn tcp_frame(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, frame_len: usize) -> Vec<u8> {
    let builder =
        PacketBuilder::ethernet2(MAC_A, MAC_B).ipv4(src, dst, 64).tcp(sport, dport, 1, 65_535);
    let payload = vec![0u8; frame_len - ETH_IPV4_TCP];
    let mut out = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut out, &payload).unwrap();
    assert_eq!(out.len(), frame_len);
    out
}

/// ARP request: valid link layer, no IP
pub fn arp_frame() -> Vec<u8> {
    let mut frame = Vec::with_capacity(42);
    frame.extend_from_slice(&[0xff; 6]);
    frame.extend_from_slice(&MAC_A);
    frame.extend_from_slice(&0x0806u16.to_be_bytes());
    frame.extend_from_slice(&[0u8; 28]);
    frame
}

/// What a replay source does once its frames run out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenEmpty {
    /// Report end of input
    Close,
    /// Behave like an idle interface: retryable timeouts forever
    Idle,
}

/// In-memory frame source
pub struct ReplaySource {
    frames: VecDeque<Vec<u8>>,
    current: Vec<u8>,
    when_empty: WhenEmpty,
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<u8>>, when_empty: WhenEmpty) -> Self {
        Self { frames: frames.into(), current: Vec::new(), when_empty }
    }
}

impl FrameSource for ReplaySource {
    fn read_next(&mut self) -> Result<&[u8], CaptureError> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.current = frame;
                Ok(self.current.as_slice())
            }
            None if self.when_empty == WhenEmpty::Idle => {
                std::thread::sleep(Duration::from_millis(1));
                Err(CaptureError::Timeout)
            }
            None => Err(CaptureError::Closed),
        }
    }

    fn link_type(&self) -> LinkType {
        LinkType::Ethernet
    }
}

/// Endless source cycling through a fixed set of frames, counting deliveries
pub struct EndlessSource {
    frames: Vec<Vec<u8>>,
    next: usize,
    pub delivered: Arc<AtomicU64>,
}

impl EndlessSource {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self { frames, next: 0, delivered: Arc::new(AtomicU64::new(0)) }
    }
}

impl FrameSource for EndlessSource {
    fn read_next(&mut self) -> Result<&[u8], CaptureError> {
        let index = self.next % self.frames.len();
        self.next += 1;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(self.frames[index].as_slice())
    }

    fn link_type(&self) -> LinkType {
        LinkType::Ethernet
    }
}
