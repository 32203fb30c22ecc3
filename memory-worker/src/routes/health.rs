//! `GET /health` — liveness, the way `tombelieber-claude-view`'s
//! `routes/health.rs` reports uptime and a couple of live gauges.

use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connected_clients: usize,
    active_plugins: Vec<String>,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        connected_clients: state.hub.connected_clients(),
        active_plugins: state.plugins.active_names().await,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes_with_expected_fields() {
        let body = HealthResponse { status: "ok", uptime_secs: 3, connected_clients: 0, active_plugins: vec![] };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":3"));
    }
}
