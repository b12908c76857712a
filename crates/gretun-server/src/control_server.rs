//! HTTP control plane
//!
//! Peers register with `GET /reg` and unregister with `GET /unreg`. The
//! peer's identity is the source address of its connection, so both
//! requests are bodiless. Every other path answers `501 Not Implemented`,
//! except `GET /status`, which returns a JSON snapshot of the pool.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gretun_common::control::{REGISTER_PATH, STATUS_PATH, UNREGISTER_PATH};
use gretun_common::{GretunError, GretunResult};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::protocol::{RegistrationError, RegistrationProtocol};

/// HTTP status for each refusal.
pub fn status_for(err: &RegistrationError) -> StatusCode {
    match err {
        RegistrationError::Conflict { .. } | RegistrationError::Busy { .. } => StatusCode::CONFLICT,
        RegistrationError::Exhausted | RegistrationError::ShuttingDown => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RegistrationError::NotFound { .. } => StatusCode::BAD_REQUEST,
        RegistrationError::Provisioning { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        (status_for(&self), self.to_string()).into_response()
    }
}

/// Build the control-plane router around a shared protocol instance.
pub fn router(protocol: Arc<RegistrationProtocol>) -> Router {
    Router::new()
        .route(REGISTER_PATH, get(register))
        .route(UNREGISTER_PATH, get(unregister))
        .route(STATUS_PATH, get(status))
        .fallback(not_implemented)
        .with_state(protocol)
}

/// Peer identity as seen on the wire. IPv4 peers reaching a dual-stack
/// listener show up as IPv4-mapped IPv6 and are folded back to IPv4.
fn identity(addr: SocketAddr) -> IpAddr {
    addr.ip().to_canonical()
}

async fn register(
    State(protocol): State<Arc<RegistrationProtocol>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let peer = identity(addr);
    info!(identity = %peer, "Client wants to register");

    // Provisioning runs to completion even if the peer hangs up.
    let outcome = tokio::spawn(async move { protocol.register(peer).await }).await;
    match outcome {
        Ok(Ok(address)) => (StatusCode::CREATED, address.to_string()).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(identity = %peer, error = %e, "Registration task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn unregister(
    State(protocol): State<Arc<RegistrationProtocol>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let peer = identity(addr);
    info!(identity = %peer, "Client wants to unregister");

    let outcome = tokio::spawn(async move { protocol.unregister(peer).await }).await;
    match outcome {
        Ok(Ok(())) => (StatusCode::OK, "Unregistered.").into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(identity = %peer, error = %e, "Unregistration task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn status(State(protocol): State<Arc<RegistrationProtocol>>) -> Response {
    Json(protocol.status()).into_response()
}

async fn not_implemented(uri: Uri, ConnectInfo(addr): ConnectInfo<SocketAddr>) -> StatusCode {
    warn!(identity = %identity(addr), path = %uri.path(), "Cannot handle request");
    StatusCode::NOT_IMPLEMENTED
}

/// Control-plane HTTP server bound to its listen address
pub struct ControlServer {
    listener: TcpListener,
    protocol: Arc<RegistrationProtocol>,
}

impl ControlServer {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub async fn bind(
        listen_addr: SocketAddr,
        protocol: Arc<RegistrationProtocol>,
    ) -> GretunResult<Self> {
        let listener = TcpListener::bind(listen_addr).await.map_err(|e| {
            GretunError::config(format!("Failed to bind to {}: {}", listen_addr, e))
        })?;
        Ok(Self { listener, protocol })
    }

    pub fn local_addr(&self) -> GretunResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| GretunError::config(format!("Listener has no address: {}", e)))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> GretunResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(listen_addr = %addr, "Waiting for HTTP requests");

        let app = router(self.protocol);
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GretunError::transport(addr.to_string(), e.to_string()))
    }
}
