//! Tunnel interface provisioning.
//!
//! The registration logic never touches the host directly; it goes through
//! [`NetworkInterfaceProvisioner`], which either brings an interface up or
//! tears it down and reports success or failure. Nothing is retained between
//! calls, so a failed `create` can simply be attempted again.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::commands::{build_create_chain, build_destroy_chain};
use crate::error::{GretunError, GretunResult};
use crate::shell;
use crate::types::TunnelSpec;

/// Capability to create and destroy GRE interfaces on the local host.
///
/// Both calls may block for as long as the underlying mechanism needs.
/// Callers must not assume idempotence: destroying an interface that does
/// not exist is reported as a failure, not a panic.
#[async_trait]
pub trait NetworkInterfaceProvisioner: Send + Sync {
    /// Bring up the interface described by `spec`.
    async fn create(&self, spec: &TunnelSpec) -> GretunResult<()>;

    /// Tear down the interface described by `spec`.
    async fn destroy(&self, spec: &TunnelSpec) -> GretunResult<()>;
}

/// Provisioner backed by iproute2 shell commands.
#[derive(Debug, Clone)]
pub struct ShellProvisioner {
    use_sudo: bool,
}

impl ShellProvisioner {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }

    /// Command line executed for [`NetworkInterfaceProvisioner::create`].
    pub fn create_command(&self, spec: &TunnelSpec) -> String {
        self.wrap(build_create_chain(spec))
    }

    /// Command line executed for [`NetworkInterfaceProvisioner::destroy`].
    pub fn destroy_command(&self, spec: &TunnelSpec) -> String {
        self.wrap(build_destroy_chain(spec))
    }

    fn wrap(&self, chain: String) -> String {
        if self.use_sudo {
            shell::elevate(&chain)
        } else {
            chain
        }
    }

    async fn run(&self, spec: &TunnelSpec, cmd: &str) -> GretunResult<()> {
        shell::exec_or_throw(cmd)
            .await
            .map(|_| ())
            .map_err(|e| GretunError::provisioning(spec.ifname(), e.to_string()))
    }
}

impl Default for ShellProvisioner {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl NetworkInterfaceProvisioner for ShellProvisioner {
    async fn create(&self, spec: &TunnelSpec) -> GretunResult<()> {
        info!(tunnel = %spec, "Creating tunnel");
        let cmd = self.create_command(spec);
        if let Err(e) = self.run(spec, &cmd).await {
            warn!(interface = %spec.ifname(), error = %e, "Tunnel creation failed");
            return Err(e);
        }
        Ok(())
    }

    async fn destroy(&self, spec: &TunnelSpec) -> GretunResult<()> {
        info!(interface = %spec.ifname(), "Destroying tunnel");
        let cmd = self.destroy_command(spec);
        if let Err(e) = self.run(spec, &cmd).await {
            warn!(interface = %spec.ifname(), error = %e, "Tunnel teardown failed");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TunnelSpec {
        TunnelSpec::new(
            3,
            "10.5.0.18".parse().unwrap(),
            "10.5.0.41".parse().unwrap(),
            "192.168.0.9".parse().unwrap(),
        )
    }

    #[test]
    fn test_create_command_without_sudo() {
        let cmd = ShellProvisioner::new(false).create_command(&spec());
        assert!(cmd.starts_with("/sbin/ip tunnel add \"gre3\" mode gre"));
        assert!(cmd.contains("addr add \"192.168.0.9/30\""));
        assert!(!cmd.contains("sudo"));
    }

    #[test]
    fn test_destroy_command_with_sudo() {
        let cmd = ShellProvisioner::new(true).destroy_command(&spec());
        assert!(cmd.starts_with("/usr/bin/sudo /bin/sh -c \""));
        assert!(cmd.contains("tunnel del \\\"gre3\\\""));
    }

    #[test]
    fn test_default_uses_sudo() {
        let cmd = ShellProvisioner::default().create_command(&spec());
        assert!(cmd.starts_with("/usr/bin/sudo"));
    }
}
