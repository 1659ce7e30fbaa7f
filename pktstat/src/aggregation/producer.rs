//! Capture loop: read → decode → enqueue
//!
//! Runs on one dedicated thread. It blocks only inside `read_next` or on a
//! full queue, and checks the shutdown token once per iteration.

use crossbeam_channel::Sender;
use log::{debug, warn};
use pktstat_common::CaptureEvent;

use super::RunTotals;
use crate::capture::{DropStats, FrameSource};
use crate::decode::decode;
use crate::domain::CaptureError;
use crate::lifecycle::Shutdown;

/// Why the capture loop stopped
#[derive(Debug)]
pub enum CaptureEnd {
    /// The shutdown token was triggered
    Cancelled,
    /// The source has no more frames (e.g. end of a savefile)
    SourceClosed,
    /// Every receiver is gone
    QueueClosed,
    /// A non-retryable read error
    Failed(CaptureError),
}

/// Counters kept by the capture loop
#[derive(Debug)]
pub struct CaptureSummary {
    pub accepted: u64,
    pub rejected: u64,
    /// Retryable read outcomes (timeouts, interrupts)
    pub retries: u64,
    pub drops: Option<DropStats>,
    pub end: CaptureEnd,
}

/// Pull frames from `source` until shutdown, end of input or a fatal error.
///
/// Accepted frames are sent to `tx` and then counted in `totals`; rejected
/// frames are dropped without touching either.
pub fn run_capture<S: FrameSource + ?Sized>(
    source: &mut S,
    tx: &Sender<CaptureEvent>,
    totals: &RunTotals,
    shutdown: &Shutdown,
) -> CaptureSummary {
    let link = source.link_type();
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    let mut retries = 0u64;

    let end = loop {
        if shutdown.is_triggered() {
            break CaptureEnd::Cancelled;
        }

        let frame = match source.read_next() {
            Ok(frame) => frame,
            Err(e) if e.is_retryable() => {
                retries += 1;
                continue;
            }
            Err(CaptureError::Closed) => break CaptureEnd::SourceClosed,
            Err(e) => {
                warn!("Capture stopped: {e}");
                break CaptureEnd::Failed(e);
            }
        };

        let len = frame.len() as u64;
        match decode(frame, link) {
            Ok(key) => {
                if tx.send(CaptureEvent { key, len }).is_err() {
                    break CaptureEnd::QueueClosed;
                }
                totals.record(len);
                accepted += 1;
            }
            Err(_) => rejected += 1,
        }
    };

    let drops = source.drop_stats();
    debug!(
        "Capture loop done: {accepted} accepted, {rejected} rejected, {retries} retries ({end:?})"
    );
    CaptureSummary { accepted, rejected, retries, drops, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::event_channel;
    use crate::decode::LinkType;
    use crate::lifecycle::ShutdownReason;
    use std::collections::VecDeque;

    /// Replays canned read outcomes, then reports Closed
    struct Scripted {
        reads: VecDeque<Result<Vec<u8>, CaptureError>>,
        current: Vec<u8>,
    }

    impl FrameSource for Scripted {
        fn read_next(&mut self) -> Result<&[u8], CaptureError> {
            match self.reads.pop_front() {
                Some(Ok(frame)) => {
                    self.current = frame;
                    Ok(self.current.as_slice())
                }
                Some(Err(e)) => Err(e),
                None => Err(CaptureError::Closed),
            }
        }

        fn link_type(&self) -> LinkType {
            LinkType::RawIp
        }
    }

    fn udp_frame(payload: usize) -> Vec<u8> {
        let builder =
            etherparse::PacketBuilder::ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64).udp(1234, 53);
        let payload = vec![0u8; payload];
        let mut out = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut out, &payload).unwrap();
        out
    }

    #[test]
    fn test_counts_and_retries() {
        let mut source = Scripted {
            reads: VecDeque::from(vec![
                Ok(udp_frame(10)),
                Err(CaptureError::Timeout),
                Ok(vec![0xde, 0xad]),
                Err(CaptureError::Interrupted),
                Ok(udp_frame(20)),
            ]),
            current: Vec::new(),
        };
        let (tx, rx) = event_channel(16);
        let totals = RunTotals::default();

        let summary = run_capture(&mut source, &tx, &totals, &Shutdown::new());
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.retries, 2);
        assert!(matches!(summary.end, CaptureEnd::SourceClosed));

        assert_eq!(totals.packets(), 2);
        assert_eq!(totals.bytes(), (28 + 10) + (28 + 20));
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_fatal_error_ends_loop() {
        let mut source = Scripted {
            reads: VecDeque::from(vec![
                Err(CaptureError::UnsupportedLinkType(105)),
                Ok(udp_frame(1)),
            ]),
            current: Vec::new(),
        };
        let (tx, _rx) = event_channel(4);
        let summary = run_capture(&mut source, &tx, &RunTotals::default(), &Shutdown::new());
        assert!(matches!(summary.end, CaptureEnd::Failed(CaptureError::UnsupportedLinkType(105))));
        assert_eq!(summary.accepted, 0);
    }

    #[test]
    fn test_cancelled_before_first_read() {
        let mut source =
            Scripted { reads: VecDeque::from(vec![Ok(udp_frame(1))]), current: Vec::new() };
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::Interrupted);
        let (tx, _rx) = event_channel(4);
        let summary = run_capture(&mut source, &tx, &RunTotals::default(), &shutdown);
        assert!(matches!(summary.end, CaptureEnd::Cancelled));
        assert_eq!(source.reads.len(), 1);
    }

    #[test]
    fn test_closed_queue_stops_without_counting() {
        let mut source =
            Scripted { reads: VecDeque::from(vec![Ok(udp_frame(1))]), current: Vec::new() };
        let (tx, rx) = event_channel(4);
        drop(rx);
        let totals = RunTotals::default();
        let summary = run_capture(&mut source, &tx, &totals, &Shutdown::new());
        assert!(matches!(summary.end, CaptureEnd::QueueClosed));
        assert_eq!(totals.packets(), 0);
    }
}
