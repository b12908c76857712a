//! Configuration file support for gretund
//!
//! Loads and validates the coordinator configuration from a TOML file.
//! Default location: /etc/gretun/gretund.toml

use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use gretun_common::{GretunError, GretunResult, DEFAULT_PREFIX_LEN};
use serde::Deserialize;
use tracing::warn;

use crate::pool::{AddressPair, TunnelPool};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gretun/gretund.toml";

/// Complete gretund configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address the control plane listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// This host's transport address, the local end of every tunnel
    #[serde(default = "default_local_endpoint")]
    pub local_endpoint: IpAddr,

    /// Prefix length of each point-to-point sub-range
    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,

    /// Run provisioning commands through sudo
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,

    /// Ordered address pairs, one per slot
    #[serde(default = "default_tunnels")]
    pub tunnels: Vec<AddressPair>,
}

// Default functions
fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
}

fn default_local_endpoint() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 5, 0, 18))
}

fn default_prefix_len() -> u8 {
    DEFAULT_PREFIX_LEN
}

fn default_use_sudo() -> bool {
    true
}

fn default_tunnels() -> Vec<AddressPair> {
    vec![
        AddressPair::new(Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(192, 168, 0, 2)),
        AddressPair::new(Ipv4Addr::new(192, 168, 0, 5), Ipv4Addr::new(192, 168, 0, 6)),
        AddressPair::new(Ipv4Addr::new(192, 168, 0, 9), Ipv4Addr::new(192, 168, 0, 10)),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            local_endpoint: default_local_endpoint(),
            prefix_len: default_prefix_len(),
            use_sudo: default_use_sudo(),
            tunnels: default_tunnels(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> GretunResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| {
                GretunError::config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(GretunError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> GretunResult<Self> {
        toml::from_str(content).map_err(|e| GretunError::config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> GretunResult<()> {
        if self.tunnels.is_empty() {
            return Err(GretunError::config("at least one tunnel pair is required"));
        }

        if self.prefix_len == 0 || self.prefix_len > 32 {
            return Err(GretunError::config(format!(
                "prefix_len must be 1-32, got {}",
                self.prefix_len
            )));
        }

        let mut seen = HashSet::new();
        for pair in &self.tunnels {
            if pair.server == pair.client {
                return Err(GretunError::config(format!(
                    "server and client address are both {}",
                    pair.server
                )));
            }
            for address in [pair.server, pair.client] {
                if !seen.insert(address) {
                    return Err(GretunError::config(format!(
                        "address {} is used by more than one tunnel",
                        address
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build the in-memory pool described by this configuration.
    pub fn build_pool(&self) -> TunnelPool {
        TunnelPool::new(
            self.local_endpoint,
            self.tunnels.iter().copied(),
            self.prefix_len,
        )
    }
}
