//! Line-oriented report
//!
//! ```text
//! bitrate: 4.00 Kbps, packets: 1, bytes: 500, proto: TCP, src: 10.0.0.3:40000, dst: 10.0.0.4:80
//! bitrate: 2.40 Kbps, packets: 2, bytes: 300, proto: UDP, src: 10.0.0.1:5000, dst: 10.0.0.2:53
//!
//! Read total packets: 3, total bytes: 800 in 1.00 seconds
//! ```

use std::io::Write;

use super::format_bitrate;
use crate::analysis::Report;
use crate::domain::ExportError;

/// Write one line per flow, then the totals line.
///
/// # Errors
/// Propagates write failures on `out`.
pub fn write_text<W: Write>(report: &Report, out: &mut W) -> Result<(), ExportError> {
    for flow in &report.flows {
        let (key, stats) = (&flow.key, &flow.stats);
        writeln!(
            out,
            "bitrate: {}, packets: {}, bytes: {}, proto: {}, src: {}:{}, dst: {}:{}",
            format_bitrate(stats.bitrate),
            stats.packets,
            stats.bytes,
            key.proto,
            key.src_ip,
            key.src_port,
            key.dst_ip,
            key.dst_port,
        )?;
    }

    writeln!(
        out,
        "\nRead total packets: {}, total bytes: {} in {:.2} seconds",
        report.total_packets,
        report.total_bytes,
        report.elapsed_secs()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FlowRecord;
    use pktstat_common::{FlowKey, FlowStats, Protocol};
    use std::net::{IpAddr, Ipv6Addr};
    use std::time::Duration;

    #[test]
    fn test_text_layout() {
        let key = FlowKey {
            src_ip: IpAddr::V6(Ipv6Addr::LOCALHOST),
            dst_ip: IpAddr::V6(Ipv6Addr::LOCALHOST),
            proto: Protocol::Udp,
            src_port: 5353,
            dst_port: 53,
        };
        let report = Report {
            flows: vec![FlowRecord {
                key,
                stats: FlowStats { bytes: 300, packets: 2, bitrate: 2400.0 },
            }],
            total_packets: 2,
            total_bytes: 300,
            elapsed: Duration::from_secs(1),
        };

        let mut out = Vec::new();
        write_text(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "bitrate: 2.40 Kbps, packets: 2, bytes: 300, proto: UDP, src: ::1:5353, dst: ::1:53\n\
             \n\
             Read total packets: 2, total bytes: 300 in 1.00 seconds\n"
        );
    }

    #[test]
    fn test_empty_report_still_has_totals() {
        let report =
            Report { flows: Vec::new(), total_packets: 0, total_bytes: 0, elapsed: Duration::ZERO };
        let mut out = Vec::new();
        write_text(&report, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\nRead total packets: 0, total bytes: 0 in 0.00 seconds\n"
        );
    }
}
