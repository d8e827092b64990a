//! Diagnostic routes: ping, version, health.

use super::server::GatewayState;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;

pub(crate) fn diagnostic_routes() -> Router<GatewayState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/version", get(version))
}

async fn ping() -> &'static str {
    "pong!"
}

async fn version(State(state): State<GatewayState>) -> String {
    state.version.to_string()
}

/// GET / returns a simple health JSON (for probes).
pub(crate) async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "service": "gateway",
        "port": state.port,
        "version": state.version.as_ref(),
    }))
}
