//! GRE tunnel peer
//!
//! Registers this host with a gretun coordinator and brings up the local end
//! of the assigned tunnel:
//!
//! - [`discovery`]: picks the host address the tunnel is anchored to
//! - [`transport`]: HTTP delivery of control intents
//! - [`registrar`]: [`ClientRegistrar`], the reg / unreg / destroy actions

pub mod discovery;
pub mod registrar;
pub mod transport;

pub use discovery::{discover_local_address, select_local_address};
pub use registrar::ClientRegistrar;
pub use transport::{HttpControlPlane, DEFAULT_TIMEOUT};
