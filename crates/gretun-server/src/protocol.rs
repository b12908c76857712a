//! Registration protocol - turns peer intents into pool transitions and
//! provisioning calls
//!
//! The pool lock is only taken for the bookkeeping steps. A register
//! reserves its slot, drops the lock for the `create` call and re-acquires it
//! to commit or roll back; unregister does the same around `destroy`. The
//! reservation is what keeps two concurrent requests from winning the same
//! slot while the lock is not held.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use gretun_common::NetworkInterfaceProvisioner;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::pool::{PoolError, PoolStatus, SharedPool};

/// Why a register or unregister intent was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("There is already a GRE tunnel allocated for {identity}. Unregister first.")]
    Conflict { identity: IpAddr, index: u32 },

    #[error("No IP addresses left, sorry!")]
    Exhausted,

    #[error("No GRE Tunnel allocated for {identity}.")]
    NotFound { identity: IpAddr },

    #[error("Cannot {operation} tunnel!")]
    Provisioning {
        operation: &'static str,
        message: String,
    },

    #[error("A tunnel operation for {identity} is already in progress.")]
    Busy { identity: IpAddr },

    #[error("Server is shutting down.")]
    ShuttingDown,
}

impl From<PoolError> for RegistrationError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Conflict(slot) => RegistrationError::Conflict {
                identity: slot.owner,
                index: slot.index,
            },
            PoolError::Exhausted => RegistrationError::Exhausted,
            PoolError::NotFound(identity) => RegistrationError::NotFound { identity },
            PoolError::Busy(slot) => RegistrationError::Busy {
                identity: slot.owner,
            },
            PoolError::Closed => RegistrationError::ShuttingDown,
        }
    }
}

/// Request handling core shared by every control-plane handler.
pub struct RegistrationProtocol {
    pool: SharedPool,
    provisioner: Arc<dyn NetworkInterfaceProvisioner>,
}

impl RegistrationProtocol {
    pub fn new(pool: SharedPool, provisioner: Arc<dyn NetworkInterfaceProvisioner>) -> Self {
        Self { pool, provisioner }
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.lock().status()
    }

    /// Allocate a slot for `identity` and bring its tunnel up.
    ///
    /// Returns the client-side address of the slot.
    pub async fn register(&self, identity: IpAddr) -> Result<Ipv4Addr, RegistrationError> {
        let reserved = self.pool.lock().allocate(identity);
        let slot = match reserved {
            Ok(slot) => slot,
            Err(e) => {
                warn!(identity = %identity, reason = %e, "Registration refused");
                return Err(e.into());
            }
        };

        let spec = slot.spec();
        if let Err(e) = self.provisioner.create(&spec).await {
            error!(identity = %identity, index = slot.index, error = %e, "Cannot create tunnel");
            self.pool.lock().release(&slot);
            return Err(RegistrationError::Provisioning {
                operation: "create",
                message: e.to_string(),
            });
        }

        let committed = {
            let mut pool = self.pool.lock();
            !pool.is_closed() && pool.commit(&slot)
        };
        if !committed {
            // Shutdown started while the interface was coming up and did not
            // see this slot, so tear it down here.
            warn!(identity = %identity, index = slot.index, "Shutdown raced registration, rolling back");
            if let Err(e) = self.provisioner.destroy(&spec).await {
                error!(index = slot.index, error = %e, "Rollback teardown failed");
            }
            self.pool.lock().release(&slot);
            return Err(RegistrationError::ShuttingDown);
        }

        info!(
            identity = %identity,
            index = slot.index,
            address = %slot.client_address,
            "Client registered"
        );
        Ok(slot.client_address)
    }

    /// Tear down `identity`'s tunnel and free its slot.
    ///
    /// If the teardown fails the slot stays owned so the peer can retry,
    /// unless shutdown has begun, in which case the slot is freed after one
    /// more teardown attempt.
    pub async fn unregister(&self, identity: IpAddr) -> Result<(), RegistrationError> {
        let held = self.pool.lock().begin_teardown(identity);
        let slot = match held {
            Ok(slot) => slot,
            Err(e) => {
                warn!(identity = %identity, reason = %e, "Unregistration refused");
                return Err(e.into());
            }
        };

        let spec = slot.spec();
        if let Err(e) = self.provisioner.destroy(&spec).await {
            error!(identity = %identity, index = slot.index, error = %e, "Cannot destroy tunnel");
            let restored = {
                let mut pool = self.pool.lock();
                !pool.is_closed() && pool.restore(&slot)
            };
            if !restored {
                // Shutdown skipped this slot while it was pending, so the
                // last teardown attempt is made here.
                warn!(identity = %identity, index = slot.index, "Shutdown raced unregistration, retrying teardown");
                match self.provisioner.destroy(&spec).await {
                    Ok(()) => info!(index = slot.index, "Tunnel destroyed on retry"),
                    Err(e) => error!(index = slot.index, error = %e, "Retry teardown failed"),
                }
                self.pool.lock().release(&slot);
            }
            return Err(RegistrationError::Provisioning {
                operation: "destroy",
                message: e.to_string(),
            });
        }

        self.pool.lock().release(&slot);
        info!(identity = %identity, index = slot.index, "Client unregistered");
        Ok(())
    }
}
