//! `GET /api/timeline?anchor&depth_before&depth_after` (§4.3).

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use memory_core::model::Observation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_DEPTH: i64 = 10;

#[derive(Deserialize)]
pub struct TimelineParams {
    anchor: i64,
    depth_before: Option<i64>,
    depth_after: Option<i64>,
}

#[derive(Serialize)]
struct TimelineResponse {
    entries: Vec<Observation>,
}

async fn timeline(State(state): State<Arc<AppState>>, Query(params): Query<TimelineParams>) -> ApiResult<Json<TimelineResponse>> {
    let entries = state
        .store
        .timeline(params.anchor, params.depth_before.unwrap_or(DEFAULT_DEPTH), params.depth_after.unwrap_or(DEFAULT_DEPTH))
        .await?;
    Ok(Json(TimelineResponse { entries }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/timeline", get(timeline))
}
