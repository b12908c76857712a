//! Address fixtures shared by coordinator and peer tests

use std::net::{IpAddr, Ipv4Addr};

/// Coordinator transport address used throughout the tests.
pub const COORDINATOR_IP: Ipv4Addr = Ipv4Addr::new(10, 5, 0, 18);

/// The three /30 pairs the coordinator ships with.
pub fn default_pairs() -> Vec<(Ipv4Addr, Ipv4Addr)> {
    vec![
        (Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(192, 168, 0, 2)),
        (Ipv4Addr::new(192, 168, 0, 5), Ipv4Addr::new(192, 168, 0, 6)),
        (Ipv4Addr::new(192, 168, 0, 9), Ipv4Addr::new(192, 168, 0, 10)),
    ]
}

/// `count` consecutive /30 pairs starting at 172.16.0.0.
pub fn sequential_pairs(count: u16) -> Vec<(Ipv4Addr, Ipv4Addr)> {
    (0..u32::from(count))
        .map(|i| {
            let base = u32::from(Ipv4Addr::new(172, 16, 0, 0)) + 4 * i;
            (Ipv4Addr::from(base + 1), Ipv4Addr::from(base + 2))
        })
        .collect()
}

/// Distinct peer identity number `n`.
pub fn peer(n: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 5, 1, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_pairs() {
        let pairs = sequential_pairs(70);
        assert_eq!(pairs.len(), 70);
        assert_eq!(pairs[0], (Ipv4Addr::new(172, 16, 0, 1), Ipv4Addr::new(172, 16, 0, 2)));
        assert_eq!(pairs[69], (Ipv4Addr::new(172, 16, 1, 21), Ipv4Addr::new(172, 16, 1, 22)));
    }

    #[test]
    fn test_peers_are_distinct() {
        assert_ne!(peer(1), peer(2));
    }
}
