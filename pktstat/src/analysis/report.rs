//! Point-in-time snapshot of the flow table.
//!
//! # Ordering
//!
//! Descending bitrate, then ascending [`FlowKey`]. The map has no iteration
//! order, so the key tie-break is what makes two snapshots of unchanged data
//! identical.
//!
//! # Zero elapsed time
//!
//! A snapshot taken before any measurable time has passed reports a bitrate
//! of `0.0` for every flow.

// Byte counts are converted to f64 for rate arithmetic
#![allow(clippy::cast_precision_loss)]

use std::cmp::Ordering;
use std::time::Duration;

use pktstat_common::{FlowKey, FlowStats};

use crate::aggregation::{FlowTable, RunTotals};

/// One row of a report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRecord {
    pub key: FlowKey,
    pub stats: FlowStats,
}

/// Everything the renderers need
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Flows in report order
    pub flows: Vec<FlowRecord>,
    pub total_packets: u64,
    pub total_bytes: u64,
    /// Measurement window the bitrates were computed against
    pub elapsed: Duration,
}

impl Report {
    /// Snapshot `table` and read `totals` for a window of `elapsed`
    #[must_use]
    pub fn capture(table: &FlowTable, totals: &RunTotals, elapsed: Duration) -> Self {
        let flows = snapshot(table, elapsed);
        Self { flows, total_packets: totals.packets(), total_bytes: totals.bytes(), elapsed }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Bits per second for `bytes` over `elapsed_secs`; `0.0` for an empty window
#[must_use]
pub fn bitrate(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        bytes as f64 * 8.0 / elapsed_secs
    } else {
        0.0
    }
}

/// Recompute every flow's bitrate against `elapsed`, store it back, and
/// return the flows in report order.
///
/// The table lock is held for the read-and-annotate pass only; sorting
/// happens on the copy.
#[must_use]
pub fn snapshot(table: &FlowTable, elapsed: Duration) -> Vec<FlowRecord> {
    let secs = elapsed.as_secs_f64();

    let mut records: Vec<FlowRecord> = {
        let mut flows = table.lock();
        flows
            .iter_mut()
            .map(|(key, stats)| {
                stats.bitrate = bitrate(stats.bytes, secs);
                FlowRecord { key: *key, stats: *stats }
            })
            .collect()
    };

    records.sort_unstable_by(report_order);
    records
}

fn report_order(a: &FlowRecord, b: &FlowRecord) -> Ordering {
    b.stats.bitrate.total_cmp(&a.stats.bitrate).then_with(|| a.key.cmp(&b.key))
}
