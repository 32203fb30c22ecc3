//! `POST /api/memory/save` (§4.1): store a manual observation, default type
//! `research`.

use crate::error::ApiResult;
use crate::ingest::{self, IngestResult};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use memory_core::model::ObservationDraft;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_type() -> String {
    "research".to_string()
}

#[derive(Deserialize)]
struct SaveRequest {
    memory_session_id: i64,
    project: String,
    #[serde(default = "default_type")]
    r#type: String,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    concepts: Option<String>,
    #[serde(default)]
    files_read: Vec<String>,
    #[serde(default)]
    files_modified: Vec<String>,
}

#[derive(Serialize)]
struct SaveResponse {
    observation: Option<memory_core::model::Observation>,
    duplicate: bool,
}

async fn save(State(state): State<Arc<AppState>>, Json(request): Json<SaveRequest>) -> ApiResult<(StatusCode, Json<SaveResponse>)> {
    let draft = ObservationDraft {
        memory_session_id: request.memory_session_id,
        project: request.project,
        r#type: request.r#type,
        title: request.title,
        subtitle: request.subtitle,
        text: request.text,
        narrative: request.narrative,
        facts: None,
        concepts: request.concepts,
        files_read: request.files_read,
        files_modified: request.files_modified,
        prompt_number: None,
    };

    let now_epoch = chrono::Utc::now().timestamp();
    match ingest::ingest(&state, draft, now_epoch).await? {
        IngestResult::Stored(observation) => {
            Ok((StatusCode::CREATED, Json(SaveResponse { observation: Some(observation), duplicate: false })))
        }
        IngestResult::Duplicate => Ok((StatusCode::OK, Json(SaveResponse { observation: None, duplicate: true }))),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/memory/save", post(save))
}
