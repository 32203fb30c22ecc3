//! `POST /api/import/jsonl` (text/plain body) and
//! `GET /api/export/jsonl?project&type` (§4.9).

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use memory_storage::store::ImportStats;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ExportParams {
    project: Option<String>,
    #[serde(rename = "type")]
    type_filter: Option<String>,
}

async fn export(State(state): State<Arc<AppState>>, Query(params): Query<ExportParams>) -> ApiResult<Response> {
    let mut buffer: Vec<u8> = Vec::new();
    state
        .store
        .export_jsonl(params.project.as_deref(), params.type_filter.as_deref(), chrono::Utc::now().timestamp(), &mut buffer)
        .await?;
    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], buffer).into_response())
}

/// Import an NDJSON body, skipping records whose content hash already
/// exists rather than failing the whole batch (§4.9).
async fn import(State(state): State<Arc<AppState>>, body: String) -> ApiResult<Json<ImportStats>> {
    Ok(Json(state.store.import_jsonl(&body).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/export/jsonl", get(export)).route("/import/jsonl", post(import))
}
