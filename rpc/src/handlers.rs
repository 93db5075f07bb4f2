//! RPC request handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use netmapd_types::{NetmapStatus, NodeAttribute};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};

use crate::{RpcError, RpcState};

// ── Netmap ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct LocalNodeInfoResponse {
    pub address: String,
    pub public_key: String,
    pub attributes: Vec<NodeAttribute>,
    pub state: String,
    pub epoch: u64,
}

pub async fn local_node_info(State(state): State<Arc<RpcState>>) -> Json<LocalNodeInfoResponse> {
    let info = state.control.local_node_info();
    Json(LocalNodeInfoResponse {
        address: info.address,
        public_key: info.public_key.to_hex(),
        attributes: info.attributes,
        state: info.state.to_string(),
        epoch: state.control.current_epoch(),
    })
}

// ── Control ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct SetNetmapStatusRequest {
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct SetNetmapStatusResponse {
    pub status: String,
}

pub async fn set_netmap_status(
    State(state): State<Arc<RpcState>>,
    Json(req): Json<SetNetmapStatusRequest>,
) -> Result<Json<SetNetmapStatusResponse>, RpcError> {
    let status: NetmapStatus = req
        .status
        .parse()
        .map_err(|e: netmapd_types::TypesError| RpcError::InvalidRequest(e.to_string()))?;

    tracing::info!(%status, "netmap status change requested");

    let control = state.control.clone();
    tokio::task::spawn_blocking(move || control.set_netmap_status(status))
        .await
        .map_err(|e| RpcError::Server(e.to_string()))??;

    Ok(Json(SetNetmapStatusResponse {
        status: status.to_string(),
    }))
}

// ── Metrics ──────────────────────────────────────────────────────────────

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Result<impl IntoResponse, RpcError> {
    let registry = state.metrics.as_ref().ok_or(RpcError::MetricsDisabled)?;
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buf))
}
