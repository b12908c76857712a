//! Provisioner double that records calls instead of running commands

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gretun_common::{GretunError, GretunResult, NetworkInterfaceProvisioner, TunnelSpec};
use parking_lot::Mutex;

/// One call received by [`RecordingProvisioner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionCall {
    Create(TunnelSpec),
    Destroy(TunnelSpec),
}

impl ProvisionCall {
    pub fn spec(&self) -> &TunnelSpec {
        match self {
            ProvisionCall::Create(spec) | ProvisionCall::Destroy(spec) => spec,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, ProvisionCall::Create(_))
    }
}

/// Records every create/destroy in call order.
///
/// Failures are switched on per operation and apply to every later call
/// until switched off again. Failed calls are recorded too.
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    calls: Mutex<Vec<ProvisionCall>>,
    fail_create: AtomicBool,
    fail_destroy: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_destroys(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ProvisionCall> {
        self.calls.lock().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_create()).count()
    }

    pub fn destroy_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| !c.is_create()).count()
    }

    /// Interface indices passed to `destroy`, in call order.
    pub fn destroyed_indices(&self) -> Vec<u32> {
        self.calls
            .lock()
            .iter()
            .filter(|c| !c.is_create())
            .map(|c| c.spec().index)
            .collect()
    }

    async fn record(&self, call: ProvisionCall, fail: &AtomicBool) -> GretunResult<()> {
        let ifname = call.spec().ifname();
        self.calls.lock().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if fail.load(Ordering::SeqCst) {
            tracing::debug!(interface = %ifname, "Injected provisioning failure");
            return Err(GretunError::provisioning(ifname, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkInterfaceProvisioner for RecordingProvisioner {
    async fn create(&self, spec: &TunnelSpec) -> GretunResult<()> {
        self.record(ProvisionCall::Create(spec.clone()), &self.fail_create)
            .await
    }

    async fn destroy(&self, spec: &TunnelSpec) -> GretunResult<()> {
        self.record(ProvisionCall::Destroy(spec.clone()), &self.fail_destroy)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(index: u32) -> TunnelSpec {
        TunnelSpec::new(
            index,
            "10.5.0.18".parse().unwrap(),
            "10.5.0.40".parse().unwrap(),
            "192.168.0.1".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let provisioner = RecordingProvisioner::new();
        provisioner.create(&spec(1)).await.unwrap();
        provisioner.destroy(&spec(1)).await.unwrap();

        assert_eq!(
            provisioner.calls(),
            vec![
                ProvisionCall::Create(spec(1)),
                ProvisionCall::Destroy(spec(1))
            ]
        );
        assert_eq!(provisioner.destroyed_indices(), vec![1]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let provisioner = RecordingProvisioner::new();
        provisioner.fail_creates(true);
        assert!(provisioner.create(&spec(2)).await.is_err());
        assert!(provisioner.destroy(&spec(2)).await.is_ok());

        provisioner.fail_creates(false);
        provisioner.fail_destroys(true);
        assert!(provisioner.create(&spec(2)).await.is_ok());
        assert!(provisioner.destroy(&spec(2)).await.is_err());
        assert_eq!(provisioner.create_count(), 2);
        assert_eq!(provisioner.destroy_count(), 2);
    }
}
