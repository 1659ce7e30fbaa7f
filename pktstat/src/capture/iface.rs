//! Default interface selection
//!
//! Container bridges (`docker*`) are never picked.

use log::debug;
use pcap::Device;

use crate::domain::types::ANY_INTERFACE;

/// Name of the first interface that is up, not loopback, not a container
/// bridge and has an address.
///
/// Falls back to [`ANY_INTERFACE`] when nothing qualifies or the device list
/// cannot be read.
#[must_use]
pub fn find_first_ether_iface() -> String {
    let devices = match Device::list() {
        Ok(devices) => devices,
        Err(e) => {
            debug!("Device list unavailable ({e}), using {ANY_INTERFACE}");
            return ANY_INTERFACE.to_string();
        }
    };

    devices
        .into_iter()
        .find(|d| is_candidate(&d.name, d.flags.is_up(), d.flags.is_loopback(), d.addresses.len()))
        .map_or_else(|| ANY_INTERFACE.to_string(), |d| d.name)
}

fn is_candidate(name: &str, up: bool, loopback: bool, addresses: usize) -> bool {
    up && !loopback && addresses > 0 && name != ANY_INTERFACE && !name.contains("docker")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_rules() {
        assert!(is_candidate("eth0", true, false, 1));
        assert!(!is_candidate("eth0", false, false, 1));
        assert!(!is_candidate("lo", true, true, 2));
        assert!(!is_candidate("eth1", true, false, 0));
        assert!(!is_candidate("any", true, false, 1));
        assert!(!is_candidate("docker0", true, false, 1));
    }

    #[test]
    fn test_selection_never_empty() {
        assert!(!find_first_ether_iface().is_empty());
    }
}
