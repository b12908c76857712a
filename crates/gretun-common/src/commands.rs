//! Shell command builders for GRE tunnel operations

use crate::shell::{self, shellquote};
use crate::types::{TunnelSpec, TUNNEL_TTL};

/// Build the GRE interface creation command
pub fn build_add_tunnel_cmd(spec: &TunnelSpec) -> String {
    format!(
        "{} tunnel add {} mode gre remote {} local {} ttl {}",
        shell::IP_CMD,
        shellquote(&spec.ifname()),
        shellquote(&spec.remote.to_string()),
        shellquote(&spec.local.to_string()),
        TUNNEL_TTL
    )
}

/// Build the GRE interface deletion command
pub fn build_del_tunnel_cmd(spec: &TunnelSpec) -> String {
    format!(
        "{} tunnel del {}",
        shell::IP_CMD,
        shellquote(&spec.ifname())
    )
}

/// Build the link up/down command
pub fn build_set_link_cmd(spec: &TunnelSpec, up: bool) -> String {
    format!(
        "{} link set {} {}",
        shell::IP_CMD,
        shellquote(&spec.ifname()),
        if up { "up" } else { "down" }
    )
}

/// Build the point-to-point address assignment command
pub fn build_add_tunnel_address_cmd(spec: &TunnelSpec) -> String {
    format!(
        "{} addr add {} dev {}",
        shell::IP_CMD,
        shellquote(&spec.cidr()),
        shellquote(&spec.ifname())
    )
}

/// Full bring-up chain: create, set up, assign address.
///
/// Steps are joined with `&&` so a failure stops the chain.
pub fn build_create_chain(spec: &TunnelSpec) -> String {
    [
        build_add_tunnel_cmd(spec),
        build_set_link_cmd(spec, true),
        build_add_tunnel_address_cmd(spec),
    ]
    .join(" && ")
}

/// Full teardown chain: set down, delete.
pub fn build_destroy_chain(spec: &TunnelSpec) -> String {
    [build_set_link_cmd(spec, false), build_del_tunnel_cmd(spec)].join(" && ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TunnelSpec {
        TunnelSpec::new(
            1,
            "10.5.0.18".parse().unwrap(),
            "10.5.0.40".parse().unwrap(),
            "192.168.0.1".parse().unwrap(),
        )
    }

    #[test]
    fn test_build_add_tunnel_cmd() {
        let cmd = build_add_tunnel_cmd(&spec());
        assert_eq!(
            cmd,
            "/sbin/ip tunnel add \"gre1\" mode gre remote \"10.5.0.40\" local \"10.5.0.18\" ttl 255"
        );
    }

    #[test]
    fn test_build_del_tunnel_cmd() {
        let cmd = build_del_tunnel_cmd(&spec());
        assert!(cmd.contains("ip tunnel del \"gre1\""));
    }

    #[test]
    fn test_build_set_link_cmd() {
        assert!(build_set_link_cmd(&spec(), true).ends_with("link set \"gre1\" up"));
        assert!(build_set_link_cmd(&spec(), false).ends_with("link set \"gre1\" down"));
    }

    #[test]
    fn test_build_add_tunnel_address_cmd() {
        let cmd = build_add_tunnel_address_cmd(&spec());
        assert!(cmd.contains("ip addr add \"192.168.0.1/30\" dev \"gre1\""));
    }

    #[test]
    fn test_create_chain_order() {
        let chain = build_create_chain(&spec());
        let parts: Vec<&str> = chain.split(" && ").collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].contains("tunnel add"));
        assert!(parts[1].contains("link set"));
        assert!(parts[2].contains("addr add"));
    }

    #[test]
    fn test_destroy_chain_order() {
        let chain = build_destroy_chain(&spec());
        let parts: Vec<&str> = chain.split(" && ").collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("down"));
        assert!(parts[1].contains("tunnel del"));
    }
}
