//! `POST /api/observations/batch` (§4.1): order-preserving bulk fetch.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use memory_core::model::Observation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
struct BatchRequest {
    ids: Vec<i64>,
}

#[derive(Serialize)]
struct BatchResponse {
    observations: Vec<Observation>,
}

async fn batch(State(state): State<Arc<AppState>>, Json(request): Json<BatchRequest>) -> ApiResult<Json<BatchResponse>> {
    let observations = state.store.get_observations_by_ids(&request.ids).await?;
    Ok(Json(BatchResponse { observations }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/observations/batch", post(batch))
}
