// ── Active subnet scan ──
//
// IPv4 CIDR parsing and host enumeration. Host bits in the input are
// ignored (`192.168.1.7/24` scans `192.168.1.0/24`). /31 and /32 ranges
// have no network or broadcast address, so every address is a host.

use std::net::Ipv4Addr;

use crate::error::CoreError;

/// Split `a.b.c.d/len` into address and prefix. A bare address is a /32.
pub fn parse_ipv4_cidr(cidr: &str) -> Result<(Ipv4Addr, u8), CoreError> {
    let cidr = cidr.trim();
    let (host, prefix) = cidr.split_once('/').unwrap_or((cidr, "32"));
    let host_ip = host.parse::<Ipv4Addr>().map_err(|_| CoreError::Config {
        message: format!("invalid IPv4 network address '{host}'"),
    })?;
    let prefix_len = prefix.parse::<u8>().map_err(|_| CoreError::Config {
        message: format!("invalid IPv4 prefix length '{prefix}'"),
    })?;
    if prefix_len > 32 {
        return Err(CoreError::Config {
            message: format!("IPv4 prefix length must be <= 32, got {prefix_len}"),
        });
    }
    Ok((host_ip, prefix_len))
}

/// Widest range a scan accepts from configuration (65 534 hosts).
pub const MIN_SCAN_PREFIX: u8 = 16;

/// Parse `cidr` and reject ranges wider than [`MIN_SCAN_PREFIX`].
pub fn validate_scan_range(cidr: &str) -> Result<(), CoreError> {
    let (_, prefix) = parse_ipv4_cidr(cidr)?;
    if prefix < MIN_SCAN_PREFIX {
        return Err(CoreError::Config {
            message: format!(
                "network range /{prefix} is too wide to scan, use /{MIN_SCAN_PREFIX} or narrower"
            ),
        });
    }
    Ok(())
}

/// Every host address of `cidr`, in ascending order. Lazy, so wide ranges
/// cost nothing until consumed.
pub fn host_addresses(cidr: &str) -> Result<impl Iterator<Item = Ipv4Addr>, CoreError> {
    let (ip, prefix) = parse_ipv4_cidr(cidr)?;
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    let network = u32::from(ip) & mask;
    let broadcast = network | !mask;

    let (first, last) = if prefix >= 31 {
        (network, broadcast)
    } else {
        (network + 1, broadcast - 1)
    };
    Ok((first..=last).map(Ipv4Addr::from))
}
