//! Shared per-flow state and run-wide counters
//!
//! [`FlowTable`] is the only mutable state touched by more than two tasks.
//! It sits behind a single mutex; writers take it once per batch, the report
//! engine once per snapshot. [`RunTotals`] are lock-free.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pktstat_common::{CaptureEvent, FlowKey, FlowStats};

/// Capacity hint so sustained high flow cardinality does not rehash
pub const FLOW_TABLE_CAPACITY: usize = 8192;

/// Map of flow key to running totals, behind one lock
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: Mutex<HashMap<FlowKey, FlowStats>>,
}

impl FlowTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(FLOW_TABLE_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { flows: Mutex::new(HashMap::with_capacity(capacity)) }
    }

    /// Exclusive access to the map.
    ///
    /// A writer that panicked mid-batch leaves only complete additions behind,
    /// so a poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, HashMap<FlowKey, FlowStats>> {
        self.flows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold a batch of events in under one lock acquisition
    pub fn apply_batch(&self, batch: &[CaptureEvent]) {
        if batch.is_empty() {
            return;
        }
        let mut flows = self.lock();
        for event in batch {
            flows.entry(event.key).or_default().record(event.len);
        }
    }

    /// Copy of one flow's totals
    #[must_use]
    pub fn get(&self, key: &FlowKey) -> Option<FlowStats> {
        self.lock().get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bytes and packets across all flows
#[derive(Debug, Default)]
pub struct RunTotals {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl RunTotals {
    #[inline]
    pub fn record(&self, len: u64) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len, Ordering::Relaxed);
    }

    #[must_use]
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktstat_common::Protocol;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    fn key(last: u8, proto: Protocol) -> FlowKey {
        FlowKey {
            src_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)),
            dst_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 254)),
            proto,
            src_port: 1000,
            dst_port: 53,
        }
    }

    #[test]
    fn test_apply_batch_accumulates() {
        let table = FlowTable::new();
        let a = key(1, Protocol::Udp);
        let b = key(2, Protocol::Tcp);
        table.apply_batch(&[
            CaptureEvent { key: a, len: 100 },
            CaptureEvent { key: b, len: 500 },
            CaptureEvent { key: a, len: 200 },
        ]);

        assert_eq!(table.len(), 2);
        let stats = table.get(&a).unwrap();
        assert_eq!((stats.bytes, stats.packets), (300, 2));
        let stats = table.get(&b).unwrap();
        assert_eq!((stats.bytes, stats.packets), (500, 1));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let table = FlowTable::new();
        table.apply_batch(&[]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let table = Arc::new(FlowTable::new());
        table.apply_batch(&[CaptureEvent { key: key(1, Protocol::Udp), len: 10 }]);

        let poisoner = Arc::clone(&table);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("writer died");
        })
        .join();

        table.apply_batch(&[CaptureEvent { key: key(1, Protocol::Udp), len: 10 }]);
        assert_eq!(table.get(&key(1, Protocol::Udp)).unwrap().bytes, 20);
    }

    #[test]
    fn test_run_totals() {
        let totals = RunTotals::default();
        totals.record(100);
        totals.record(200);
        assert_eq!(totals.packets(), 2);
        assert_eq!(totals.bytes(), 300);
    }
}
