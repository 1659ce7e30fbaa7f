//! Batched consumer draining the event queue into the flow table
//!
//! ```text
//! recv() ──► try_recv() × up to BATCH_LIMIT-1 ──► lock ──► apply ──► unlock
//!   ▲                                                                  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lock acquisitions are bounded by the batch ceiling, not the packet rate.
//! The loop ends only once every sender is gone *and* the queue is empty, so
//! nothing enqueued before shutdown is lost.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;
use pktstat_common::CaptureEvent;

use super::FlowTable;

/// Events buffered between the capture thread and the aggregators
pub const QUEUE_CAPACITY: usize = 2048;

/// Maximum events applied per lock acquisition
pub const BATCH_LIMIT: usize = 256;

/// Bounded capture-to-aggregator queue. A full queue blocks the sender.
#[must_use]
pub fn event_channel(capacity: usize) -> (Sender<CaptureEvent>, Receiver<CaptureEvent>) {
    bounded(capacity)
}

pub struct Aggregator {
    rx: Receiver<CaptureEvent>,
    table: Arc<FlowTable>,
    batch: Vec<CaptureEvent>,
    batch_limit: usize,
}

impl Aggregator {
    #[must_use]
    pub fn new(rx: Receiver<CaptureEvent>, table: Arc<FlowTable>) -> Self {
        Self::with_batch_limit(rx, table, BATCH_LIMIT)
    }

    #[must_use]
    pub fn with_batch_limit(
        rx: Receiver<CaptureEvent>,
        table: Arc<FlowTable>,
        batch_limit: usize,
    ) -> Self {
        let batch_limit = batch_limit.max(1);
        Self { rx, table, batch: Vec::with_capacity(batch_limit), batch_limit }
    }

    /// Drain until the channel is closed and empty. Returns the number of
    /// events applied.
    pub fn run(mut self) -> u64 {
        let mut applied = 0u64;
        let mut batches = 0u64;

        while let Ok(first) = self.rx.recv() {
            self.batch.push(first);
            while self.batch.len() < self.batch_limit {
                match self.rx.try_recv() {
                    Ok(event) => self.batch.push(event),
                    Err(_) => break,
                }
            }

            self.table.apply_batch(&self.batch);
            applied += self.batch.len() as u64;
            batches += 1;
            self.batch.clear();
        }

        debug!("Aggregator drained {applied} events in {batches} batches");
        applied
    }
}

/// Start `count` aggregator threads sharing one receiver.
///
/// # Errors
/// Returns the OS error if a thread cannot be spawned.
pub fn spawn_aggregators(
    count: usize,
    rx: &Receiver<CaptureEvent>,
    table: &Arc<FlowTable>,
) -> io::Result<Vec<JoinHandle<u64>>> {
    (0..count.max(1))
        .map(|i| {
            let aggregator = Aggregator::new(rx.clone(), Arc::clone(table));
            thread::Builder::new().name(format!("pktstat-agg-{i}")).spawn(move || aggregator.run())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktstat_common::{FlowKey, Protocol};
    use std::net::{IpAddr, Ipv4Addr};

    fn key(port: u16) -> FlowKey {
        FlowKey {
            src_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            dst_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            proto: Protocol::Udp,
            src_port: port,
            dst_port: 9,
        }
    }

    #[test]
    fn test_drains_buffered_events_after_close() {
        let table = Arc::new(FlowTable::new());
        let (tx, rx) = event_channel(64);
        for i in 0..50u16 {
            tx.send(CaptureEvent { key: key(i % 5), len: 10 }).unwrap();
        }
        drop(tx);

        let applied = Aggregator::with_batch_limit(rx, Arc::clone(&table), 8).run();
        assert_eq!(applied, 50);
        assert_eq!(table.len(), 5);
        for port in 0..5 {
            let stats = table.get(&key(port)).unwrap();
            assert_eq!((stats.packets, stats.bytes), (10, 100));
        }
    }

    #[test]
    fn test_zero_batch_limit_is_clamped() {
        let table = Arc::new(FlowTable::new());
        let (tx, rx) = event_channel(4);
        tx.send(CaptureEvent { key: key(1), len: 1 }).unwrap();
        drop(tx);
        assert_eq!(Aggregator::with_batch_limit(rx, table, 0).run(), 1);
    }

    #[test]
    fn test_multiple_consumers_share_the_load() {
        let table = Arc::new(FlowTable::new());
        let (tx, rx) = event_channel(QUEUE_CAPACITY);
        let handles = spawn_aggregators(3, &rx, &table).unwrap();
        drop(rx);

        for i in 0..10_000u16 {
            tx.send(CaptureEvent { key: key(i % 7), len: 3 }).unwrap();
        }
        drop(tx);

        let applied: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(applied, 10_000);
        let packets: u64 = table.lock().values().map(|s| s.packets).sum();
        assert_eq!(packets, 10_000);
    }
}
