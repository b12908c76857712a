//! Tunnel type definitions and constants

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Interface name prefix; slot `n` drives interface `gre<n>`.
pub const TUNNEL_IFNAME_PREFIX: &str = "gre";

/// Prefix length of the point-to-point sub-range dedicated to one tunnel.
pub const DEFAULT_PREFIX_LEN: u8 = 30;

/// TTL set on the outer GRE header.
pub const TUNNEL_TTL: u8 = 255;

/// Interface index used on the peer side, which only ever has one tunnel.
pub const PEER_TUNNEL_INDEX: u32 = 1;

/// Everything needed to bring one GRE interface up or down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSpec {
    /// Interface number (`gre<index>`)
    pub index: u32,
    /// Underlying transport address of this host
    pub local: IpAddr,
    /// Underlying transport address of the other end
    pub remote: IpAddr,
    /// Point-to-point address assigned to the interface
    pub address: Ipv4Addr,
    /// Prefix length of `address`
    pub prefix_len: u8,
}

impl TunnelSpec {
    /// Create a new spec with the default /30 prefix.
    pub fn new(index: u32, local: IpAddr, remote: IpAddr, address: Ipv4Addr) -> Self {
        Self {
            index,
            local,
            remote,
            address,
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }

    /// Override the prefix length (builder pattern)
    pub fn with_prefix_len(mut self, prefix_len: u8) -> Self {
        self.prefix_len = prefix_len;
        self
    }

    /// Kernel interface name, e.g. `gre1`.
    pub fn ifname(&self) -> String {
        format!("{}{}", TUNNEL_IFNAME_PREFIX, self.index)
    }

    /// Interface address in CIDR form, e.g. `192.168.0.1/30`.
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_len)
    }
}

impl fmt::Display for TunnelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (local {}, remote {}, address {})",
            self.ifname(),
            self.local,
            self.remote,
            self.cidr()
        )
    }
}
