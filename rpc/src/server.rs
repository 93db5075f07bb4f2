//! Axum-based RPC server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::RpcError;
use crate::handlers;
use crate::NetmapControl;

/// Shared state handed to every handler.
pub struct RpcState {
    pub control: Arc<dyn NetmapControl>,
    /// Registry rendered by `/metrics`; `None` disables the route.
    pub metrics: Option<prometheus::Registry>,
}

/// Build the router with all routes.
pub fn router(state: Arc<RpcState>) -> Router {
    Router::new()
        .route("/v1/netmap/local_node_info", get(handlers::local_node_info))
        .route("/v1/control/netmap_status", post(handlers::set_netmap_status))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<RpcState>,
}

impl RpcServer {
    pub fn with_state(port: u16, state: Arc<RpcState>) -> Self {
        Self { port, state }
    }

    /// Bind and serve until the future is dropped.
    pub async fn start(&self) -> Result<(), RpcError> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        info!("RPC server listening on {}", addr);
        axum::serve(listener, router(self.state.clone()))
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
