//! HTTP transport to the coordinator

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use gretun_common::{ControlIntent, ControlPlane, ControlResponse, GretunError, GretunResult};
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers intents as bodiless `GET` requests.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    base_url: String,
    client: reqwest::Client,
}

impl HttpControlPlane {
    pub fn new(coordinator: SocketAddr, timeout: Duration) -> GretunResult<Self> {
        let base_url = format!("http://{}", coordinator);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GretunError::transport(base_url.clone(), e.to_string()))?;
        Ok(Self { base_url, client })
    }

    /// Full URL an intent is sent to.
    pub fn url_for(&self, intent: ControlIntent) -> String {
        format!("{}{}", self.base_url, intent.path())
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn send(&self, intent: ControlIntent) -> GretunResult<ControlResponse> {
        let url = self.url_for(intent);
        debug!(url = %url, %intent, "Sending control request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GretunError::transport(url.clone(), e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GretunError::transport(url.clone(), e.to_string()))?;

        debug!(url = %url, status, body = %body, "Control response");
        Ok(ControlResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let control =
            HttpControlPlane::new("10.5.0.18:8080".parse().unwrap(), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            control.url_for(ControlIntent::Register),
            "http://10.5.0.18:8080/reg"
        );
        assert_eq!(
            control.url_for(ControlIntent::Unregister),
            "http://10.5.0.18:8080/unreg"
        );
    }

    #[test]
    fn test_ipv6_coordinator_url() {
        let control =
            HttpControlPlane::new("[2001:db8::1]:8080".parse().unwrap(), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            control.url_for(ControlIntent::Register),
            "http://[2001:db8::1]:8080/reg"
        );
    }

    #[tokio::test]
    async fn test_unreachable_coordinator_is_transport_error() {
        // Port 1 on loopback is not expected to be listening.
        let control = HttpControlPlane::new(
            "127.0.0.1:1".parse().unwrap(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = control.send(ControlIntent::Register).await.unwrap_err();
        assert!(matches!(err, GretunError::Transport { .. }));
    }
}
