//! # `AF_PACKET` Receive Ring
//!
//! Raw packet socket with a `TPACKET_V3` ring shared with the kernel.
//!
//! ## Ring Protocol
//!
//! ```text
//! block 0   block 1   block 2        block N-1
//! ┌───────┐ ┌───────┐ ┌───────┐     ┌───────┐
//! │ USER  │ │ USER  │ │KERNEL │ ... │KERNEL │
//! └───────┘ └───────┘ └───────┘     └───────┘
//!     ▲ cursor
//! ```
//!
//! The kernel fills a block with frames and flips its status to
//! `TP_STATUS_USER` (or retires a partially filled block after
//! [`BLOCK_RETIRE_TIMEOUT_MS`]). User space walks the frames of that block,
//! writes `TP_STATUS_KERNEL` back and moves to the next block in ring order.
//! A block is returned only when the next read needs a new one, so the slice
//! handed out by `read_next` is never overwritten while the caller holds it.
//!
//! The status word is read and written with volatile accesses, paired with
//! acquire/release fences around the frame data.

#![allow(unsafe_code)] // raw socket, mmap and ring access

use std::ffi::CString;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::{self, NonNull};
use std::sync::atomic::{fence, Ordering};

use log::{debug, info};
use pktstat_common::ETHERTYPE_VLAN;

use super::bpf::{self, BpfInstruction};
use super::layout::{page_size, RingLayout};
use super::{DropStats, FrameSource};
use crate::decode::LinkType;
use crate::domain::{CaptureConfig, CaptureError};

// <linux/if_packet.h>
const PACKET_RX_RING: libc::c_int = 5;
const PACKET_STATISTICS: libc::c_int = 6;
const PACKET_VERSION: libc::c_int = 10;
const TPACKET_V3: libc::c_int = 2;

const TP_STATUS_KERNEL: u32 = 0;
const TP_STATUS_USER: u32 = 1 << 0;
const TP_STATUS_VLAN_VALID: u32 = 1 << 4;
const TP_STATUS_VLAN_TPID_VALID: u32 = 1 << 6;

// struct tpacket_block_desc, hdr.bh1 fields
const BLOCK_STATUS: usize = 8;
const BLOCK_NUM_PKTS: usize = 12;
const BLOCK_FIRST_PKT: usize = 16;

// struct tpacket3_hdr
const PKT_NEXT_OFFSET: usize = 0;
const PKT_SNAPLEN: usize = 12;
const PKT_STATUS: usize = 20;
const PKT_MAC: usize = 24;
const PKT_VLAN_TCI: usize = 32;
const PKT_VLAN_TPID: usize = 36;
const PKT_HEADER_LEN: usize = 48;

/// Partially filled blocks are handed to user space after this long
pub const BLOCK_RETIRE_TIMEOUT_MS: u32 = 64;

/// Upper bound on a single wait for the next block
const POLL_TIMEOUT_MS: libc::c_int = 100;

/// Destination MAC + source MAC
const MAC_ADDRS_LEN: usize = 12;

#[repr(C)]
struct TpacketReq3 {
    tp_block_size: u32,
    tp_block_nr: u32,
    tp_frame_size: u32,
    tp_frame_nr: u32,
    tp_retire_blk_tov: u32,
    tp_sizeof_priv: u32,
    tp_feature_req_word: u32,
}

#[repr(C)]
#[derive(Default)]
struct TpacketStatsV3 {
    tp_packets: u32,
    tp_drops: u32,
    tp_freeze_q_cnt: u32,
}

/// Memory-mapped `TPACKET_V3` capture socket
pub struct RingSource {
    fd: OwnedFd,
    ring: NonNull<u8>,
    layout: RingLayout,
    interface: String,
    /// Index of the block under the cursor
    block: usize,
    /// Whether that block is currently owned by user space
    holding: bool,
    /// Frames left to walk in the held block
    remaining: u32,
    /// Offset of the next frame header within the held block
    offset: usize,
    add_vlan: bool,
    /// Frame with its VLAN tag re-inserted
    scratch: Vec<u8>,
    drops: DropStats,
}

// SAFETY: the mapping is private to this value and only touched through &mut self
unsafe impl Send for RingSource {}

impl RingSource {
    /// Open a packet socket on `config.interface`, size and map its ring,
    /// attach the filter and bind.
    ///
    /// # Errors
    /// Sizing and filter compilation fail before the socket is created.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let snaplen = config.effective_snaplen();
        let layout = RingLayout::compute(config.buffer_mb, snaplen as usize, page_size())?;

        // Attached even without a filter: its `ret #snaplen` is the only snapshot
        // length cap a TPACKET_V3 ring has
        let program = bpf::compile(&config.filter, LinkType::Ethernet, snaplen)?;

        let ifindex =
            if config.is_any_interface() { 0 } else { interface_index(&config.interface)? };

        let fd = open_socket(&config.interface)?;
        set_option(&fd, libc::SOL_PACKET, PACKET_VERSION, &TPACKET_V3)?;
        attach_filter(&fd, &config.filter, &program)?;

        let req = ring_request(&layout)?;
        set_option(&fd, libc::SOL_PACKET, PACKET_RX_RING, &req)
            .map_err(|e| permission(e, &config.interface))?;
        let ring = map_ring(&fd, layout.total_bytes())?;

        let mut source = Self {
            fd,
            ring,
            layout,
            interface: config.interface.clone(),
            block: 0,
            holding: false,
            remaining: 0,
            offset: 0,
            add_vlan: config.add_vlan,
            scratch: Vec::with_capacity(snaplen as usize + 4),
            drops: DropStats::default(),
        };
        // Dropping `source` on failure unmaps the ring and closes the socket
        source.bind(ifindex)?;

        info!(
            "AF_PACKET ring on {}: {} blocks x {} bytes, frame {} bytes, {} filter instructions",
            source.interface,
            layout.block_count,
            layout.block_size,
            layout.frame_size,
            program.len()
        );
        Ok(source)
    }

    fn bind(&mut self, ifindex: libc::c_int) -> Result<(), CaptureError> {
        // SAFETY: sockaddr_ll is plain data, all-zero is a valid value
        let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::c_ushort;
        addr.sll_protocol = eth_p_all();
        addr.sll_ifindex = ifindex;

        // SAFETY: addr outlives the call and the length matches its type
        let rc = unsafe {
            libc::bind(
                self.fd.as_raw_fd(),
                ptr::addr_of!(addr).cast::<libc::sockaddr>(),
                socklen::<libc::sockaddr_ll>(),
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::ENODEV) => CaptureError::InterfaceNotFound(self.interface.clone()),
                _ => permission(err, &self.interface),
            });
        }
        Ok(())
    }

    fn block_ptr(&self) -> *mut u8 {
        // SAFETY: block < block_count, so the offset stays inside the mapping
        unsafe { self.ring.as_ptr().add(self.block * self.layout.block_size) }
    }

    fn block_ready(&self) -> bool {
        // SAFETY: status word of a block inside the mapping, 4-byte aligned
        let status =
            unsafe { ptr::read_volatile(self.block_ptr().add(BLOCK_STATUS).cast::<u32>()) };
        fence(Ordering::Acquire);
        status & TP_STATUS_USER != 0
    }

    /// Hand the held block back to the kernel and advance the cursor
    fn release_block(&mut self) {
        if !self.holding {
            return;
        }
        fence(Ordering::Release);
        // SAFETY: see block_ready
        unsafe {
            ptr::write_volatile(self.block_ptr().add(BLOCK_STATUS).cast::<u32>(), TP_STATUS_KERNEL);
        }
        self.holding = false;
        self.remaining = 0;
        self.block = (self.block + 1) % self.layout.block_count;
    }

    fn acquire_block(&mut self) -> Result<(), CaptureError> {
        if !self.block_ready() {
            self.wait_readable()?;
            if !self.block_ready() {
                return Err(CaptureError::Timeout);
            }
        }

        let desc = self.block_ptr();
        // SAFETY: the block belongs to user space until release_block
        let (num_pkts, first) =
            unsafe { (read_u32(desc, BLOCK_NUM_PKTS), read_u32(desc, BLOCK_FIRST_PKT)) };
        self.holding = true;
        self.remaining = num_pkts;
        self.offset = first as usize;

        if num_pkts == 0 {
            return Err(CaptureError::Transient("retired block carried no frames"));
        }
        Ok(())
    }

    fn wait_readable(&self) -> Result<(), CaptureError> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN | libc::POLLERR,
            revents: 0,
        };
        // SAFETY: one valid pollfd
        let rc = unsafe { libc::poll(&mut pfd, 1, POLL_TIMEOUT_MS) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            return Err(if err.kind() == io::ErrorKind::Interrupted {
                CaptureError::Interrupted
            } else {
                CaptureError::Io(err)
            });
        }
        if rc == 0 {
            return Err(CaptureError::Timeout);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
            if let Some(err) = self.socket_error() {
                return Err(CaptureError::Io(err));
            }
        }
        Ok(())
    }

    /// Pending `SO_ERROR` on the socket (e.g. the interface went down)
    fn socket_error(&self) -> Option<io::Error> {
        let mut code: libc::c_int = 0;
        let mut len = socklen::<libc::c_int>();
        // SAFETY: code/len are valid for writes of their declared sizes
        let rc = unsafe {
            libc::getsockopt(
                self.fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_ERROR,
                ptr::addr_of_mut!(code).cast(),
                &mut len,
            )
        };
        if rc < 0 {
            return Some(io::Error::last_os_error());
        }
        (code != 0).then(|| io::Error::from_raw_os_error(code))
    }

    fn next_frame(&mut self) -> Result<&[u8], CaptureError> {
        let block_size = self.layout.block_size;
        let offset = self.offset;
        if offset + PKT_HEADER_LEN > block_size {
            self.remaining = 0;
            return Err(CaptureError::Transient("frame header outside its block"));
        }

        let block = self.block_ptr();
        // SAFETY: header lies inside the held block (checked above)
        let (next, snaplen, status, mac, tci, tpid) = unsafe {
            let hdr = block.add(offset);
            (
                read_u32(hdr, PKT_NEXT_OFFSET),
                read_u32(hdr, PKT_SNAPLEN),
                read_u32(hdr, PKT_STATUS),
                read_u16(hdr, PKT_MAC),
                read_u32(hdr, PKT_VLAN_TCI),
                read_u16(hdr, PKT_VLAN_TPID),
            )
        };
        self.remaining -= 1;
        self.offset = offset + next as usize;

        let start = offset + usize::from(mac);
        let len = snaplen as usize;
        if start + len > block_size {
            self.remaining = 0;
            return Err(CaptureError::Transient("frame data outside its block"));
        }

        // SAFETY: range checked against the held block, which user space owns
        // until the next read_next
        let data = unsafe { std::slice::from_raw_parts(block.add(start), len) };

        if self.add_vlan {
            if let Some(tpid) = stripped_vlan_tpid(status, tpid) {
                #[allow(clippy::cast_possible_truncation)]
                let tci = tci as u16;
                return Ok(reinsert_vlan(data, tpid, tci, &mut self.scratch));
            }
        }
        Ok(data)
    }
}

/// TPID of the 802.1Q tag the kernel moved into the frame header, if any.
///
/// Older kernels report the TCI without the TPID; those tags are plain 802.1Q.
fn stripped_vlan_tpid(status: u32, tpid: u16) -> Option<u16> {
    if status & TP_STATUS_VLAN_VALID == 0 {
        return None;
    }
    Some(if status & TP_STATUS_VLAN_TPID_VALID != 0 { tpid } else { ETHERTYPE_VLAN })
}

/// Rebuild `data` with a VLAN tag after the MAC addresses.
///
/// The result lives in `scratch`, which is reused across frames. Frames too
/// short to hold the MAC addresses are returned unchanged.
fn reinsert_vlan<'a>(data: &'a [u8], tpid: u16, tci: u16, scratch: &'a mut Vec<u8>) -> &'a [u8] {
    if data.len() < MAC_ADDRS_LEN {
        return data;
    }
    scratch.clear();
    scratch.extend_from_slice(&data[..MAC_ADDRS_LEN]);
    scratch.extend_from_slice(&tpid.to_be_bytes());
    scratch.extend_from_slice(&tci.to_be_bytes());
    scratch.extend_from_slice(&data[MAC_ADDRS_LEN..]);
    scratch.as_slice()
}

impl FrameSource for RingSource {
    fn read_next(&mut self) -> Result<&[u8], CaptureError> {
        if self.remaining == 0 {
            self.release_block();
            self.acquire_block()?;
        }
        self.next_frame()
    }

    fn link_type(&self) -> LinkType {
        LinkType::Ethernet
    }

    fn drop_stats(&mut self) -> Option<DropStats> {
        let mut stats = TpacketStatsV3::default();
        let mut len = socklen::<TpacketStatsV3>();
        // SAFETY: stats/len are valid for writes of their declared sizes
        let rc = unsafe {
            libc::getsockopt(
                self.fd.as_raw_fd(),
                libc::SOL_PACKET,
                PACKET_STATISTICS,
                ptr::addr_of_mut!(stats).cast(),
                &mut len,
            )
        };
        if rc < 0 {
            debug!("PACKET_STATISTICS failed: {}", io::Error::last_os_error());
            return Some(self.drops);
        }
        // The kernel resets its counters on every read
        self.drops.received += u64::from(stats.tp_packets);
        self.drops.dropped += u64::from(stats.tp_drops);
        Some(self.drops)
    }
}

impl Drop for RingSource {
    fn drop(&mut self) {
        // SAFETY: ring was returned by mmap with exactly this length
        let rc = unsafe { libc::munmap(self.ring.as_ptr().cast(), self.layout.total_bytes()) };
        if rc < 0 {
            debug!("munmap failed: {}", io::Error::last_os_error());
        }
    }
}

/// # Safety
/// `base + offset .. base + offset + 4` must be readable.
unsafe fn read_u32(base: *const u8, offset: usize) -> u32 {
    ptr::read_unaligned(base.add(offset).cast::<u32>())
}

/// # Safety
/// `base + offset .. base + offset + 2` must be readable.
unsafe fn read_u16(base: *const u8, offset: usize) -> u16 {
    ptr::read_unaligned(base.add(offset).cast::<u16>())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn eth_p_all() -> u16 {
    (libc::ETH_P_ALL as u16).to_be()
}

#[allow(clippy::cast_possible_truncation)]
fn socklen<T>() -> libc::socklen_t {
    mem::size_of::<T>() as libc::socklen_t
}

fn permission(err: io::Error, interface: &str) -> CaptureError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        CaptureError::PermissionDenied(interface.to_string())
    } else {
        CaptureError::Io(err)
    }
}

fn interface_index(interface: &str) -> Result<libc::c_int, CaptureError> {
    let not_found = || CaptureError::InterfaceNotFound(interface.to_string());
    let name = CString::new(interface).map_err(|_| not_found())?;
    // SAFETY: name is a valid NUL-terminated string
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(not_found());
    }
    libc::c_int::try_from(index).map_err(|_| not_found())
}

fn open_socket(interface: &str) -> Result<OwnedFd, CaptureError> {
    // SAFETY: plain syscall, the result is checked before use
    let raw = unsafe {
        libc::socket(
            libc::AF_PACKET,
            libc::SOCK_RAW | libc::SOCK_CLOEXEC,
            libc::c_int::from(eth_p_all()),
        )
    };
    if raw < 0 {
        return Err(permission(io::Error::last_os_error(), interface));
    }
    // SAFETY: raw is a fresh descriptor owned by nobody else
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

fn set_option<T>(
    fd: &OwnedFd,
    level: libc::c_int,
    name: libc::c_int,
    value: &T,
) -> io::Result<()> {
    // SAFETY: value is valid for reads of size_of::<T>() bytes
    let rc = unsafe {
        libc::setsockopt(fd.as_raw_fd(), level, name, ptr::from_ref(value).cast(), socklen::<T>())
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn attach_filter(
    fd: &OwnedFd,
    filter: &str,
    program: &[BpfInstruction],
) -> Result<(), CaptureError> {
    let mut code: Vec<libc::sock_filter> = program
        .iter()
        .map(|i| libc::sock_filter { code: i.code, jt: i.jt, jf: i.jf, k: i.k })
        .collect();
    let len = libc::c_ushort::try_from(code.len()).map_err(|_| CaptureError::InvalidFilter {
        filter: filter.to_string(),
        reason: format!("program too long ({} instructions)", code.len()),
    })?;
    let fprog = libc::sock_fprog { len, filter: code.as_mut_ptr() };
    set_option(fd, libc::SOL_SOCKET, libc::SO_ATTACH_FILTER, &fprog)?;
    Ok(())
}

fn ring_request(layout: &RingLayout) -> Result<TpacketReq3, CaptureError> {
    let overflow = || {
        CaptureError::Io(io::Error::new(io::ErrorKind::InvalidInput, "ring geometry exceeds u32"))
    };
    let frame_nr = layout.frames_per_block() * layout.block_count;
    Ok(TpacketReq3 {
        tp_block_size: u32::try_from(layout.block_size).map_err(|_| overflow())?,
        tp_block_nr: u32::try_from(layout.block_count).map_err(|_| overflow())?,
        tp_frame_size: u32::try_from(layout.frame_size).map_err(|_| overflow())?,
        tp_frame_nr: u32::try_from(frame_nr).map_err(|_| overflow())?,
        tp_retire_blk_tov: BLOCK_RETIRE_TIMEOUT_MS,
        tp_sizeof_priv: 0,
        tp_feature_req_word: 0,
    })
}

fn map_ring(fd: &OwnedFd, len: usize) -> Result<NonNull<u8>, CaptureError> {
    // SAFETY: fresh shared mapping of the socket's ring; checked below
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd.as_raw_fd(),
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(CaptureError::Io(io::Error::last_os_error()));
    }
    NonNull::new(addr.cast::<u8>())
        .ok_or_else(|| CaptureError::Io(io::Error::other("mmap returned null")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use etherparse::PacketBuilder;
    use pktstat_common::{Protocol, ETHERTYPE_QINQ};
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    fn udp_frame() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([0x02, 0, 0, 0, 0, 1], [0x02, 0, 0, 0, 0, 2])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(5353, 53);
        let mut frame = Vec::with_capacity(builder.size(16));
        builder.write(&mut frame, &[0u8; 16]).unwrap();
        frame
    }

    #[test]
    fn test_vlan_tpid_needs_vlan_valid() {
        assert_eq!(stripped_vlan_tpid(TP_STATUS_USER, ETHERTYPE_QINQ), None);
        assert_eq!(stripped_vlan_tpid(TP_STATUS_VLAN_TPID_VALID, ETHERTYPE_QINQ), None);
    }

    #[test]
    fn test_vlan_tpid_falls_back_to_8021q() {
        assert_eq!(stripped_vlan_tpid(TP_STATUS_VLAN_VALID, 0), Some(ETHERTYPE_VLAN));
        assert_eq!(
            stripped_vlan_tpid(TP_STATUS_VLAN_VALID | TP_STATUS_VLAN_TPID_VALID, ETHERTYPE_QINQ),
            Some(ETHERTYPE_QINQ)
        );
    }

    #[test]
    fn test_reinserted_vlan_frame_keys_like_untagged() {
        let frame = udp_frame();
        let untagged = decode(&frame, LinkType::Ethernet).unwrap();
        let mut scratch = Vec::with_capacity(frame.len() + 4);
        let capacity = scratch.capacity();

        for tpid in [ETHERTYPE_VLAN, ETHERTYPE_QINQ] {
            let tagged = reinsert_vlan(&frame, tpid, 0x2042, &mut scratch);
            assert_eq!(tagged.len(), frame.len() + 4);
            assert_eq!(&tagged[..MAC_ADDRS_LEN], &frame[..MAC_ADDRS_LEN]);
            assert_eq!(&tagged[12..14], &tpid.to_be_bytes());
            assert_eq!(&tagged[14..16], &[0x20, 0x42]);
            assert_eq!(&tagged[16..], &frame[MAC_ADDRS_LEN..]);
            assert_eq!(decode(tagged, LinkType::Ethernet), Ok(untagged));
        }
        assert_eq!(scratch.capacity(), capacity);
    }

    #[test]
    fn test_reinsert_vlan_leaves_runt_frames_alone() {
        let runt = [0xaa; MAC_ADDRS_LEN - 1];
        let mut scratch = Vec::new();
        assert_eq!(reinsert_vlan(&runt, ETHERTYPE_VLAN, 1, &mut scratch), &runt[..]);
        assert!(scratch.is_empty());
    }

    /// Live ring on the loopback device. Needs root or `CAP_NET_RAW`;
    /// skipped otherwise.
    #[test]
    fn test_loopback_ring_caps_frames_at_snaplen() {
        const SNAPLEN: u32 = 96;
        const DATAGRAMS: usize = 20;

        // SAFETY: geteuid has no preconditions
        if unsafe { libc::geteuid() } != 0 {
            eprintln!("skipping: AF_PACKET capture needs root");
            return;
        }
        let config = CaptureConfig {
            interface: "lo".to_string(),
            snaplen: SNAPLEN,
            ..CaptureConfig::default()
        };
        let mut source = match RingSource::open(&config) {
            Ok(source) => source,
            Err(CaptureError::PermissionDenied(_)) => {
                eprintln!("skipping: CAP_NET_RAW missing");
                return;
            }
            Err(e) => panic!("opening ring on lo: {e}"),
        };

        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sport = socket.local_addr().unwrap().port();
        for _ in 0..DATAGRAMS {
            socket.send_to(&[0x5a; 1000], "127.0.0.1:9").unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut largest = 0;
        let mut ours = 0;
        while ours < DATAGRAMS && Instant::now() < deadline {
            match source.read_next() {
                Ok(frame) => {
                    largest = largest.max(frame.len());
                    if let Ok(key) = decode(frame, LinkType::Ethernet) {
                        let from_us = key.src_port == sport && key.dst_port == 9;
                        if key.proto == Protocol::Udp && from_us {
                            assert_eq!(frame.len(), SNAPLEN as usize);
                            ours += 1;
                        }
                    }
                }
                Err(e) if e.is_retryable() => {}
                Err(e) => panic!("ring read failed: {e}"),
            }
        }

        assert!(ours > 0, "no datagram seen on lo");
        assert!(largest <= SNAPLEN as usize, "delivered {largest} bytes with snaplen {SNAPLEN}");
        let stats = source.drop_stats().unwrap();
        assert!(stats.received >= ours as u64);
    }

    #[test]
    fn test_ring_request_matches_layout() {
        let layout = RingLayout::compute(8, 1500, 4096).unwrap();
        let req = ring_request(&layout).unwrap();
        assert_eq!(req.tp_block_size, 2048 * 128);
        assert_eq!(req.tp_block_nr, 32);
        assert_eq!(req.tp_frame_size, 2048);
        assert_eq!(req.tp_frame_nr, 128 * 32);
        assert_eq!(req.tp_retire_blk_tov, BLOCK_RETIRE_TIMEOUT_MS);
    }

    #[test]
    fn test_eth_p_all_is_network_order() {
        assert_eq!(u16::from_be(eth_p_all()), 0x0003);
    }

    #[test]
    fn test_unknown_interface_index() {
        let err = interface_index("definitely-not-a-nic0").unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InterfaceNotFound(name) if name == "definitely-not-a-nic0"
        ));
        assert!(matches!(interface_index("bad\0name"), Err(CaptureError::InterfaceNotFound(_))));
    }

    #[test]
    fn test_open_rejects_small_buffer_before_socket() {
        let config = CaptureConfig { buffer_mb: 0, ..CaptureConfig::default() };
        let err = RingSource::open(&config).err().unwrap();
        assert!(matches!(err, CaptureError::Config(_)));
    }

    #[test]
    fn test_open_rejects_bad_filter_before_socket() {
        let config = CaptureConfig { filter: "port ((".to_string(), ..CaptureConfig::default() };
        let err = RingSource::open(&config).err().unwrap();
        assert!(matches!(err, CaptureError::InvalidFilter { .. }));
    }
}
