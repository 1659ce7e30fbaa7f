//! JSON report: an array of flow objects in report order.
//!
//! ```json
//! [{"srcIp":"10.0.0.3","dstIp":"10.0.0.4","proto":"TCP","srcPort":40000,"dstPort":80,
//!   "size":500,"packets":1,"bitrate":4000.0}]
//! ```

use std::io::Write;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::analysis::{FlowRecord, Report};
use crate::domain::ExportError;

/// Wire shape of one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowJson {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub proto: String,
    pub src_port: u16,
    pub dst_port: u16,
    /// Cumulative bytes
    pub size: u64,
    pub packets: u64,
    pub bitrate: f64,
}

impl From<&FlowRecord> for FlowJson {
    fn from(record: &FlowRecord) -> Self {
        Self {
            src_ip: record.key.src_ip,
            dst_ip: record.key.dst_ip,
            proto: record.key.proto.as_str().to_string(),
            src_port: record.key.src_port,
            dst_port: record.key.dst_port,
            size: record.stats.bytes,
            packets: record.stats.packets,
            bitrate: record.stats.bitrate,
        }
    }
}

/// Write the flows as one JSON array followed by a newline.
///
/// # Errors
/// Serialization or write failures on `out`.
pub fn write_json<W: Write>(report: &Report, out: &mut W) -> Result<(), ExportError> {
    let flows: Vec<FlowJson> = report.flows.iter().map(FlowJson::from).collect();
    serde_json::to_writer(&mut *out, &flows)?;
    writeln!(out)?;
    Ok(())
}
