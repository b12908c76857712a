//! Shutdown handling - tear down every remaining tunnel before exit

use std::sync::Arc;

use gretun_common::NetworkInterfaceProvisioner;
use tokio::signal;
use tracing::{error, info};

use crate::pool::SharedPool;

/// Outcome of [`LifecycleCoordinator::shutdown`], by interface index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub destroyed: Vec<u32>,
    pub failed: Vec<u32>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the once-only cleanup when the coordinator is asked to stop.
pub struct LifecycleCoordinator {
    pool: SharedPool,
    provisioner: Arc<dyn NetworkInterfaceProvisioner>,
}

impl LifecycleCoordinator {
    pub fn new(pool: SharedPool, provisioner: Arc<dyn NetworkInterfaceProvisioner>) -> Self {
        Self { pool, provisioner }
    }

    /// Close the pool and destroy every owned slot.
    ///
    /// Closing happens first and under the pool lock, so any request that
    /// arrives afterwards is refused. Teardown failures are logged and do
    /// not stop the remaining slots from being processed. Calls after the
    /// first one find nothing to do.
    pub async fn shutdown(&self) -> ShutdownReport {
        let slots = self.pool.lock().close();
        let mut report = ShutdownReport::default();
        if slots.is_empty() {
            return report;
        }

        info!(count = slots.len(), "Destroying all remaining tunnels");
        for slot in slots {
            match self.provisioner.destroy(&slot.spec()).await {
                Ok(()) => report.destroyed.push(slot.index),
                Err(e) => {
                    error!(index = slot.index, identity = %slot.owner, error = %e, "Failed to destroy tunnel during shutdown");
                    report.failed.push(slot.index);
                }
            }
            self.pool.lock().release(&slot);
        }
        report
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Caught signal: SIGINT"),
        _ = terminate => info!("Caught signal: SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{AddressPair, SlotState, TunnelPool};
    use crate::protocol::RegistrationProtocol;
    use gretun_test::{default_pairs, peer, RecordingProvisioner, COORDINATOR_IP};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn setup() -> (SharedPool, Arc<RecordingProvisioner>) {
        let pairs = default_pairs()
            .into_iter()
            .map(|(s, c)| AddressPair::new(s, c));
        let pool = TunnelPool::new(COORDINATOR_IP.into(), pairs, 30).into_shared();
        (pool, Arc::new(RecordingProvisioner::new()))
    }

    #[tokio::test]
    async fn test_shutdown_destroys_each_owned_slot_once() {
        let (pool, provisioner) = setup();
        let proto = RegistrationProtocol::new(pool.clone(), provisioner.clone());
        proto.register(peer(1)).await.unwrap();
        proto.register(peer(2)).await.unwrap();

        let coordinator = LifecycleCoordinator::new(pool.clone(), provisioner.clone());
        let report = coordinator.shutdown().await;

        assert_eq!(report.destroyed, vec![1, 2]);
        assert!(report.is_clean());
        assert_eq!(provisioner.destroyed_indices(), vec![1, 2]);
        assert_eq!(pool.lock().state(3), Some(SlotState::Free));
        assert_eq!(pool.lock().occupancy(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_is_best_effort() {
        let (pool, provisioner) = setup();
        let proto = RegistrationProtocol::new(pool.clone(), provisioner.clone());
        proto.register(peer(1)).await.unwrap();
        proto.register(peer(2)).await.unwrap();

        provisioner.fail_destroys(true);
        let report = LifecycleCoordinator::new(pool, provisioner.clone())
            .shutdown()
            .await;

        assert_eq!(report.failed, vec![1, 2]);
        assert_eq!(provisioner.destroy_count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_runs_once() {
        let (pool, provisioner) = setup();
        let proto = RegistrationProtocol::new(pool.clone(), provisioner.clone());
        proto.register(peer(1)).await.unwrap();

        let coordinator = LifecycleCoordinator::new(pool, provisioner.clone());
        coordinator.shutdown().await;
        let second = coordinator.shutdown().await;

        assert_eq!(second, ShutdownReport::default());
        assert_eq!(provisioner.destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_failing_unregister_frees_slot() {
        let pairs = default_pairs()
            .into_iter()
            .map(|(s, c)| AddressPair::new(s, c));
        let pool = TunnelPool::new(COORDINATOR_IP.into(), pairs, 30).into_shared();
        let provisioner =
            Arc::new(RecordingProvisioner::new().with_delay(Duration::from_millis(100)));
        let proto = Arc::new(RegistrationProtocol::new(pool.clone(), provisioner.clone()));
        proto.register(peer(1)).await.unwrap();

        provisioner.fail_destroys(true);
        let task = {
            let proto = proto.clone();
            tokio::spawn(async move { proto.unregister(peer(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = LifecycleCoordinator::new(pool.clone(), provisioner.clone())
            .shutdown()
            .await;
        assert_eq!(report, ShutdownReport::default());

        assert!(task.await.unwrap().is_err());
        assert_eq!(provisioner.destroyed_indices(), vec![1, 1]);
        assert_eq!(pool.lock().state(1), Some(SlotState::Free));
        assert_eq!(pool.lock().occupancy(), 0);
    }

    #[tokio::test]
    async fn test_empty_pool_shutdown() {
        let (pool, provisioner) = setup();
        let report = LifecycleCoordinator::new(pool.clone(), provisioner.clone())
            .shutdown()
            .await;
        assert_eq!(report, ShutdownReport::default());
        assert!(pool.lock().is_closed());
        assert!(provisioner.calls().is_empty());
    }
}
