//! GRE tunnel coordinator
//!
//! gretund hands out point-to-point address pairs from a fixed pool to
//! remote peers and keeps the pool consistent with the GRE interfaces that
//! actually exist on the host:
//! - Slot allocation and release ([`TunnelPool`])
//! - Register/unregister request handling ([`RegistrationProtocol`])
//! - HTTP control plane ([`ControlServer`])
//! - Teardown of every remaining tunnel on exit ([`LifecycleCoordinator`])

pub mod config;
pub mod control_server;
pub mod lifecycle;
pub mod pool;
pub mod protocol;

pub use config::ServerConfig;
pub use control_server::ControlServer;
pub use lifecycle::{LifecycleCoordinator, ShutdownReport};
pub use pool::{AddressPair, PoolError, SharedPool, SlotRef, SlotState, TunnelPool};
pub use protocol::{RegistrationError, RegistrationProtocol};
