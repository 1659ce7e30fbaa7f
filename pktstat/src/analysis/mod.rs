//! Stats/report engine
//!
//! Turns the shared flow table into an ordered, bitrate-annotated view,
//! independent of how it is rendered (see [`crate::export`]).

pub mod report;

pub use report::{bitrate, snapshot, FlowRecord, Report};
