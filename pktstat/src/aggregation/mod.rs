//! # Aggregation Pipeline
//!
//! ```text
//! capture thread                      aggregator thread(s)
//! ┌──────────────────────┐  bounded   ┌──────────────────────┐
//! │ read → decode → send │ ─────────► │ recv + drain batch   │
//! │ RunTotals += len     │   queue    │ lock FlowTable once  │
//! └──────────────────────┘            └──────────────────────┘
//! ```
//!
//! Backpressure, not loss: a full queue blocks the capture thread. Loss under
//! load can only happen in the kernel ring, where it is counted.

pub mod aggregator;
pub mod flow_table;
pub mod producer;

pub use aggregator::{event_channel, spawn_aggregators, Aggregator, BATCH_LIMIT, QUEUE_CAPACITY};
pub use flow_table::{FlowTable, RunTotals, FLOW_TABLE_CAPACITY};
pub use producer::{run_capture, CaptureEnd, CaptureSummary};
