//! Control-plane contract between the peer and the coordinator.
//!
//! A peer sends one of two intents over plain HTTP; the coordinator derives
//! the peer's identity from the connection's source address, so requests
//! carry no body. Responses are a status code plus a short text body.

use std::fmt;

use async_trait::async_trait;

use crate::error::GretunResult;

/// Path of the register intent.
pub const REGISTER_PATH: &str = "/reg";

/// Path of the unregister intent.
pub const UNREGISTER_PATH: &str = "/unreg";

/// Path of the read-only pool snapshot.
pub const STATUS_PATH: &str = "/status";

/// Default TCP port of the coordinator.
pub const DEFAULT_CONTROL_PORT: u16 = 8080;

/// Success codes a peer waits for; anything else is a refusal.
pub mod status {
    /// Answer to a successful register
    pub const CREATED: u16 = 201;
    /// Answer to a successful unregister
    pub const OK: u16 = 200;
}

/// What a peer asks the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlIntent {
    Register,
    Unregister,
}

impl ControlIntent {
    /// Request path for this intent.
    pub fn path(&self) -> &'static str {
        match self {
            ControlIntent::Register => REGISTER_PATH,
            ControlIntent::Unregister => UNREGISTER_PATH,
        }
    }
}

impl fmt::Display for ControlIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlIntent::Register => write!(f, "register"),
            ControlIntent::Unregister => write!(f, "unregister"),
        }
    }
}

/// Raw coordinator answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    pub status: u16,
    pub body: String,
}

impl ControlResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport that delivers an intent to the coordinator.
///
/// Implementations return `Err` only when no answer was obtained at all;
/// any status code the coordinator sends back is an `Ok` response.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn send(&self, intent: ControlIntent) -> GretunResult<ControlResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_paths() {
        assert_eq!(ControlIntent::Register.path(), "/reg");
        assert_eq!(ControlIntent::Unregister.path(), "/unreg");
    }

    #[test]
    fn test_success_codes() {
        assert_eq!(status::CREATED, 201);
        assert_eq!(status::OK, 200);
    }

    #[test]
    fn test_intent_display() {
        assert_eq!(ControlIntent::Register.to_string(), "register");
        assert_eq!(ControlIntent::Unregister.to_string(), "unregister");
    }
}
