//! `GET /api/checkpoint?project` and `GET /api/sessions/:id/checkpoint`
//! (§4.5).

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use memory_core::error::Error;
use memory_core::model::Checkpoint;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct LatestCheckpointParams {
    project: String,
}

async fn latest_checkpoint(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestCheckpointParams>,
) -> ApiResult<Json<Checkpoint>> {
    let checkpoint = state
        .store
        .latest_checkpoint(&params.project)
        .await?
        .ok_or_else(|| ApiError(Error::NotFound(format!("no checkpoint for project {}", params.project))))?;
    Ok(Json(checkpoint))
}

async fn session_checkpoint(State(state): State<Arc<AppState>>, Path(session_id): Path<i64>) -> ApiResult<Json<Checkpoint>> {
    let session = state
        .store
        .get_session_by_id(session_id)
        .await?
        .ok_or_else(|| ApiError(Error::NotFound(format!("session {session_id}"))))?;
    let checkpoint = state
        .store
        .latest_checkpoint(&session.project)
        .await?
        .ok_or_else(|| ApiError(Error::NotFound(format!("no checkpoint for session {session_id}"))))?;
    Ok(Json(checkpoint))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/checkpoint", get(latest_checkpoint)).route("/sessions/:id/checkpoint", get(session_checkpoint))
}
