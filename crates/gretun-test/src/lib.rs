//! Test infrastructure for the gretun crates
//!
//! Provides:
//! - A recording provisioner that never touches the host and can be told
//!   to fail
//! - A scripted control plane for driving the peer without a coordinator
//! - Address pool and identity fixtures

pub mod control;
pub mod fixtures;
pub mod provisioner;

pub use control::ScriptedControlPlane;
pub use fixtures::*;
pub use provisioner::{ProvisionCall, RecordingProvisioner};
