//! # pktstat - Live Per-Flow Traffic Statistics
//!
//! pktstat captures packets from a network interface, keys each one by its
//! flow (addresses, ports, protocol) and reports per-flow byte and packet
//! counts plus bitrate, heaviest flows first.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Network Interface (kernel)                   │
//! │  • BPF filter attached to the socket                            │
//! │  • TPACKET_V3 ring (Linux) or libpcap buffer                    │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ borrowed frames
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Capture thread (spawn_blocking)                    │
//! │   FrameSource::read_next ──► decode ──► bounded queue send      │
//! │                                 │                               │
//! │                                 └──► RunTotals (atomics)        │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ CaptureEvent
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Aggregator thread(s)                               │
//! │   recv + drain batch ──► lock FlowTable once ──► apply          │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ snapshot (tick / final)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   analysis::snapshot ──► Report ──► export (text | JSON)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: Frame sources (`AF_PACKET` ring, libpcap), ring sizing,
//!   BPF compilation, default interface selection
//! - [`decode`]: Frame to [`FlowKey`](pktstat_common::FlowKey) decoder
//! - [`aggregation`]: Flow table, run totals, event queue, batching consumer,
//!   capture loop
//! - [`analysis`]: Bitrate computation and report ordering
//! - [`export`]: Text and JSON renderers, bitrate formatting
//! - [`lifecycle`]: Shutdown token, signals, timeout, periodic reports
//! - [`cli`]: Command-line argument parsing
//! - [`preflight`]: Interface and privilege checks before capture
//! - [`domain`]: Configuration types and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Ten minute capture on the first active interface
//! sudo ./pktstat
//!
//! # DNS traffic on eth0 for 30 seconds, as JSON
//! sudo ./pktstat -i eth0 -f 'udp port 53' -t 30 -j
//! ```

pub mod aggregation;
pub mod analysis;
pub mod capture;
pub mod cli;
pub mod decode;
pub mod domain;
pub mod export;
pub mod lifecycle;
pub mod preflight;
