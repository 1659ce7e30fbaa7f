//! Report rendering
//!
//! Two renderings of the same [`Report`]: plain text lines for a terminal and
//! a JSON array for machine consumption.

pub mod bitrate;
pub mod json;
pub mod text;

pub use bitrate::format_bitrate;
pub use json::{write_json, FlowJson};
pub use text::write_text;

use std::io::Write;

use crate::analysis::Report;
use crate::domain::{ExportError, OutputMode};

/// Render `report` in the requested `mode`.
///
/// # Errors
/// Propagates serialization and write failures.
pub fn render<W: Write>(report: &Report, mode: OutputMode, out: &mut W) -> Result<(), ExportError> {
    match mode {
        OutputMode::Text => write_text(report, out),
        OutputMode::Json => write_json(report, out),
    }?;
    out.flush()?;
    Ok(())
}
