//! Pre-flight checks for pktstat
//!
//! Validates the interface and capture privileges before any socket is
//! opened, so the common mistakes fail with a clear message instead of a raw
//! errno from deep inside the capture backend.

#![allow(unsafe_code)] // geteuid() requires unsafe

use crate::domain::{CaptureConfig, CaptureError};
use crate::domain::types::ANY_INTERFACE;

/// `CAP_NET_RAW` bit in the capability sets of `/proc/<pid>/status`
#[cfg(target_os = "linux")]
const CAP_NET_RAW: u32 = 13;

/// Run all pre-flight checks for `config`
///
/// # Errors
/// [`CaptureError::InterfaceNotFound`] or [`CaptureError::PermissionDenied`].
pub fn run_preflight_checks(config: &CaptureConfig) -> Result<(), CaptureError> {
    check_interface_exists(&config.interface)?;
    check_privileges(&config.interface)?;
    Ok(())
}

/// Check that the interface exists (the wildcard always does)
///
/// # Errors
/// [`CaptureError::InterfaceNotFound`] if the system does not know it.
pub fn check_interface_exists(interface: &str) -> Result<(), CaptureError> {
    if interface == ANY_INTERFACE {
        return Ok(());
    }
    if interface_known(interface) {
        Ok(())
    } else {
        Err(CaptureError::InterfaceNotFound(interface.to_string()))
    }
}

#[cfg(target_os = "linux")]
fn interface_known(interface: &str) -> bool {
    !interface.contains('/') && std::path::Path::new("/sys/class/net").join(interface).exists()
}

#[cfg(not(target_os = "linux"))]
fn interface_known(interface: &str) -> bool {
    // Without a device list, let the backend produce the error
    pcap::Device::list().map_or(true, |devices| devices.iter().any(|d| d.name == interface))
}

/// Check for root or `CAP_NET_RAW`
#[cfg(target_os = "linux")]
fn check_privileges(interface: &str) -> Result<(), CaptureError> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // Unreadable status: let the socket call decide
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return Ok(());
    };
    match has_cap_net_raw(&status) {
        Some(false) => Err(CaptureError::PermissionDenied(interface.to_string())),
        Some(true) | None => Ok(()),
    }
}

/// libpcap reports `/dev/bpf*` access problems itself
#[cfg(not(target_os = "linux"))]
fn check_privileges(_interface: &str) -> Result<(), CaptureError> {
    Ok(())
}

/// Parse the effective capability set out of `/proc/<pid>/status`
#[cfg(target_os = "linux")]
fn has_cap_net_raw(status: &str) -> Option<bool> {
    let hex = status.lines().find_map(|line| line.strip_prefix("CapEff:"))?.trim();
    let caps = u64::from_str_radix(hex, 16).ok()?;
    Some(caps & (1 << CAP_NET_RAW) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_always_exists() {
        assert!(check_interface_exists("any").is_ok());
    }

    #[test]
    fn test_interface_not_found() {
        let err = check_interface_exists("nope-not-here0").unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InterfaceNotFound(ref name) if name == "nope-not-here0"
        ));
        assert!(err.to_string().contains("not found"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_path_like_names_rejected() {
        assert!(check_interface_exists("../lo").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_cap_net_raw_parsing() {
        let with = "Name:\tpktstat\nCapInh:\t0000000000000000\nCapEff:\t0000000000002000\n";
        let without = "Name:\tpktstat\nCapEff:\t0000000000000000\n";
        let full = "CapEff:\t000001ffffffffff\n";
        assert_eq!(has_cap_net_raw(with), Some(true));
        assert_eq!(has_cap_net_raw(without), Some(false));
        assert_eq!(has_cap_net_raw(full), Some(true));
        assert_eq!(has_cap_net_raw("Name:\tpktstat\n"), None);
        assert_eq!(has_cap_net_raw("CapEff:\tzz\n"), None);
    }
}
