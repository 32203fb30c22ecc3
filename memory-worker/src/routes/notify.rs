//! `POST /notify` (§4.7): an authenticated internal trigger other local
//! processes (the plugin host, a companion tool) use to push an SSE event
//! without going through the ingest pipeline.

use crate::auth::require_worker_token;
use crate::error::ApiResult;
use crate::sse::HubEvent;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

async fn notify(State(state): State<Arc<AppState>>, Json(event): Json<HubEvent>) -> ApiResult<StatusCode> {
    state.hub.publish(event);
    Ok(StatusCode::ACCEPTED)
}

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().route("/notify", post(notify)).layer(middleware::from_fn_with_state(state, require_worker_token))
}
