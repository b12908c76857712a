//! Local address discovery
//!
//! The peer needs the address its GRE packets will leave from. Interfaces
//! are walked in the order the kernel reports them and the first usable
//! IPv4 address wins.

use std::net::{IpAddr, Ipv4Addr};

use gretun_common::{GretunError, GretunResult};

/// First candidate that is IPv4 (or IPv4-mapped), not loopback and not
/// unspecified.
pub fn select_local_address<I>(candidates: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    candidates
        .into_iter()
        .find_map(|ip| match ip.to_canonical() {
            IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some(v4),
            _ => None,
        })
}

/// Determine a usable local address from the host's interfaces.
#[cfg(target_os = "linux")]
pub fn discover_local_address() -> GretunResult<Ipv4Addr> {
    use std::net::SocketAddrV4;

    let addrs = nix::ifaddrs::getifaddrs()
        .map_err(|e| GretunError::discovery(format!("getifaddrs failed: {}", e)))?;

    let candidates = addrs.filter_map(|ifa| {
        let sin = *ifa.address?.as_sockaddr_in()?;
        Some(IpAddr::V4(*SocketAddrV4::from(sin).ip()))
    });

    select_local_address(candidates)
        .ok_or_else(|| GretunError::discovery("no non-loopback IPv4 address configured"))
}

#[cfg(not(target_os = "linux"))]
pub fn discover_local_address() -> GretunResult<Ipv4Addr> {
    Err(GretunError::discovery(
        "interface enumeration is only supported on Linux",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_skips_loopback_and_unspecified() {
        let candidates = ips(&["127.0.0.1", "0.0.0.0", "10.5.0.40", "10.5.0.41"]);
        assert_eq!(
            select_local_address(candidates),
            Some(Ipv4Addr::new(10, 5, 0, 40))
        );
    }

    #[test]
    fn test_skips_ipv6() {
        let candidates = ips(&["::1", "fe80::1", "2001:db8::5", "192.168.1.7"]);
        assert_eq!(
            select_local_address(candidates),
            Some(Ipv4Addr::new(192, 168, 1, 7))
        );
    }

    #[test]
    fn test_accepts_mapped_ipv4() {
        let candidates = ips(&["::ffff:10.1.2.3"]);
        assert_eq!(
            select_local_address(candidates),
            Some(Ipv4Addr::new(10, 1, 2, 3))
        );
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(select_local_address(ips(&["127.0.0.1", "::1"])), None);
        assert_eq!(select_local_address(Vec::new()), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_discovery_never_returns_loopback() {
        if let Ok(addr) = discover_local_address() {
            assert!(!addr.is_loopback());
            assert!(!addr.is_unspecified());
        }
    }
}
