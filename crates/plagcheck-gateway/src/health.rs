//! Local health surface and admin metadata (§4.5 "Contract", §4.5.2).
//! Unlike the proxied routes, these never touch a backend.

use crate::state::{GatewayState, VERSION};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "plagcheck-gateway" }))
}

pub async fn readiness() -> impl IntoResponse {
    Json(json!({ "status": "ready" }))
}

pub async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// §4.5.2: static/derived metadata only, no DB access.
pub async fn admin_info(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "service": "plagcheck-gateway",
        "version": VERSION,
        "backends": [
            { "name": state.files.name, "url": state.files.base_url() },
            { "name": state.works.name, "url": state.works.base_url() },
            { "name": state.analysis.name, "url": state.analysis.base_url() },
        ],
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
