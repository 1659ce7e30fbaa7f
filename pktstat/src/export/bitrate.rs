//! Human-readable bitrate

const KBPS: f64 = 1_000.0;
const MBPS: f64 = 1_000.0 * KBPS;
const GBPS: f64 = 1_000.0 * MBPS;
const TBPS: f64 = 1_000.0 * GBPS;

/// Format bits per second with a decimal SI unit and two decimals,
/// e.g. `12.50 Mbps`. Terabits is the largest unit.
#[must_use]
pub fn format_bitrate(bps: f64) -> String {
    let (value, unit) = if bps < KBPS {
        (bps, "bps")
    } else if bps < MBPS {
        (bps / KBPS, "Kbps")
    } else if bps < GBPS {
        (bps / MBPS, "Mbps")
    } else if bps < TBPS {
        (bps / GBPS, "Gbps")
    } else {
        (bps / TBPS, "Tbps")
    };
    format!("{value:.2} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(format_bitrate(0.0), "0.00 bps");
        assert_eq!(format_bitrate(999.0), "999.00 bps");
        assert_eq!(format_bitrate(1_000.0), "1.00 Kbps");
        assert_eq!(format_bitrate(2_400.0), "2.40 Kbps");
        assert_eq!(format_bitrate(12_500_000.0), "12.50 Mbps");
        assert_eq!(format_bitrate(3_000_000_000.0), "3.00 Gbps");
        assert_eq!(format_bitrate(4.2e12), "4.20 Tbps");
        assert_eq!(format_bitrate(5.0e15), "5000.00 Tbps");
    }
}
