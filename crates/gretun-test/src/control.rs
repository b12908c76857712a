//! Control plane double with canned coordinator answers

use std::collections::VecDeque;

use async_trait::async_trait;
use gretun_common::{ControlIntent, ControlPlane, ControlResponse, GretunError, GretunResult};
use parking_lot::Mutex;

/// Answers intents from a queue of scripted responses.
///
/// An empty queue behaves like an unreachable coordinator.
#[derive(Debug, Default)]
pub struct ScriptedControlPlane {
    responses: Mutex<VecDeque<GretunResult<ControlResponse>>>,
    sent: Mutex<Vec<ControlIntent>>,
}

impl ScriptedControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a coordinator answer (builder pattern)
    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .push_back(Ok(ControlResponse::new(status, body)));
        self
    }

    /// Queue a transport failure (builder pattern)
    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .push_back(Err(GretunError::transport("scripted", message)));
        self
    }

    /// Intents received so far.
    pub fn sent(&self) -> Vec<ControlIntent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ControlPlane for ScriptedControlPlane {
    async fn send(&self, intent: ControlIntent) -> GretunResult<ControlResponse> {
        self.sent.lock().push(intent);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GretunError::transport("scripted", "no response scripted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let control = ScriptedControlPlane::new()
            .respond(201, "192.168.0.2")
            .fail("connection refused");

        let first = control.send(ControlIntent::Register).await.unwrap();
        assert_eq!(first, ControlResponse::new(201, "192.168.0.2"));
        assert!(control.send(ControlIntent::Unregister).await.is_err());
        assert!(control.send(ControlIntent::Register).await.is_err());
        assert_eq!(
            control.sent(),
            vec![
                ControlIntent::Register,
                ControlIntent::Unregister,
                ControlIntent::Register
            ]
        );
    }
}
