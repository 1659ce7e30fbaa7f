//! Command-line interface for pktstat
//!
//! Flag parsing lives here and nowhere else: the rest of the crate only sees
//! the [`CaptureConfig`](crate::domain::CaptureConfig) and
//! [`RunSettings`](crate::domain::RunSettings) built from [`Args`].

pub mod args;

pub use args::Args;
