//! Common infrastructure shared by the gretun coordinator and peer.
//!
//! Both sides of a GRE tunnel end up doing the same thing on their host:
//! bring a `gre<N>` interface up with a point-to-point address, and later
//! tear it down again. This crate holds that shared machinery:
//!
//! - [`shell`]: Safe shell command execution with proper quoting
//! - [`commands`]: `ip` command builders for GRE interfaces
//! - [`control`]: The peer/coordinator request contract
//! - [`provisioner`]: The [`NetworkInterfaceProvisioner`] capability and its
//!   shell-backed implementation
//! - [`types`]: [`TunnelSpec`] and tunnel constants
//! - [`error`]: Error types shared across the workspace
//!
//! # Example
//!
//! ```ignore
//! use gretun_common::{NetworkInterfaceProvisioner, ShellProvisioner, TunnelSpec};
//!
//! async fn bring_up(spec: &TunnelSpec) -> gretun_common::GretunResult<()> {
//!     let provisioner = ShellProvisioner::new(true);
//!     provisioner.create(spec).await
//! }
//! ```

pub mod commands;
pub mod control;
pub mod error;
pub mod provisioner;
pub mod shell;
pub mod types;

// Re-export commonly used items at crate root
pub use control::{ControlIntent, ControlPlane, ControlResponse};
pub use error::{GretunError, GretunResult};
pub use provisioner::{NetworkInterfaceProvisioner, ShellProvisioner};
pub use types::{TunnelSpec, DEFAULT_PREFIX_LEN};
