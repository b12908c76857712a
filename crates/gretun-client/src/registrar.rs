//! Peer-side registration
//!
//! [`ClientRegistrar`] asks the coordinator for a point-to-point address and
//! brings up the local end of the tunnel with it, or tears it down again.
//! Each action is a single attempt; failures are returned to the caller.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use gretun_common::control::status;
use gretun_common::types::PEER_TUNNEL_INDEX;
use gretun_common::{
    ControlIntent, ControlPlane, GretunError, GretunResult, NetworkInterfaceProvisioner,
    TunnelSpec, DEFAULT_PREFIX_LEN,
};
use tracing::{info, warn};

/// Drives the peer's side of the control plane.
pub struct ClientRegistrar {
    control: Arc<dyn ControlPlane>,
    provisioner: Arc<dyn NetworkInterfaceProvisioner>,
    coordinator: IpAddr,
    local: IpAddr,
    prefix_len: u8,
}

impl ClientRegistrar {
    /// `local` is this host's transport address, `coordinator` the
    /// coordinator's; they become the tunnel's local and remote ends.
    pub fn new(
        control: Arc<dyn ControlPlane>,
        provisioner: Arc<dyn NetworkInterfaceProvisioner>,
        coordinator: IpAddr,
        local: IpAddr,
    ) -> Self {
        Self {
            control,
            provisioner,
            coordinator,
            local,
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }

    /// Override the prefix length (builder pattern)
    pub fn with_prefix_len(mut self, prefix_len: u8) -> Self {
        self.prefix_len = prefix_len;
        self
    }

    fn spec(&self, address: Ipv4Addr) -> TunnelSpec {
        TunnelSpec::new(PEER_TUNNEL_INDEX, self.local, self.coordinator, address)
            .with_prefix_len(self.prefix_len)
    }

    /// Register with the coordinator and create the local interface.
    ///
    /// Returns the address assigned to this end of the tunnel.
    pub async fn register(&self) -> GretunResult<Ipv4Addr> {
        let response = self.control.send(ControlIntent::Register).await?;
        if response.status != status::CREATED {
            warn!(status = response.status, body = %response.body, "Registration refused");
            return Err(GretunError::refused(
                ControlIntent::Register.to_string(),
                response.status,
                response.body.trim(),
            ));
        }

        let address: Ipv4Addr = response.body.trim().parse().map_err(|_| {
            GretunError::validation(
                "assigned address",
                format!("'{}' is not an IPv4 address", response.body.trim()),
            )
        })?;
        info!(address = %address, coordinator = %self.coordinator, "Registered");

        let spec = self.spec(address);
        self.provisioner.create(&spec).await?;
        info!(interface = %spec.ifname(), "Tunnel is up");
        Ok(address)
    }

    /// Unregister with the coordinator; the local interface is only torn
    /// down once the coordinator confirms.
    pub async fn unregister(&self) -> GretunResult<()> {
        let response = self.control.send(ControlIntent::Unregister).await?;
        if response.status != status::OK {
            warn!(status = response.status, body = %response.body, "Unregistration refused");
            return Err(GretunError::refused(
                ControlIntent::Unregister.to_string(),
                response.status,
                response.body.trim(),
            ));
        }

        info!(coordinator = %self.coordinator, "Unregistered");
        self.destroy().await
    }

    /// Tear down the local interface without contacting the coordinator.
    pub async fn destroy(&self) -> GretunResult<()> {
        let spec = self.spec(Ipv4Addr::UNSPECIFIED);
        self.provisioner.destroy(&spec).await?;
        info!(interface = %spec.ifname(), "Tunnel destroyed");
        Ok(())
    }
}
