//! `POST /api/knowledge` (§3, §4.1): store a knowledge observation. The
//! `knowledge_type` field picks the stored `type`; optional structured
//! metadata rides along in `facts` as JSON.

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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeTypeParam {
    Constraint,
    Decision,
    Heuristic,
    Rejected,
}

impl KnowledgeTypeParam {
    fn as_type_str(&self) -> &'static str {
        match self {
            Self::Constraint => "constraint",
            Self::Decision => "decision",
            Self::Heuristic => "heuristic",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Deserialize)]
struct KnowledgeRequest {
    memory_session_id: i64,
    project: String,
    knowledge_type: KnowledgeTypeParam,
    title: String,
    text: String,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    concepts: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct KnowledgeResponse {
    observation: Option<memory_core::model::Observation>,
    duplicate: bool,
}

async fn store_knowledge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KnowledgeRequest>,
) -> ApiResult<(StatusCode, Json<KnowledgeResponse>)> {
    let facts = request.metadata.map(|value| value.to_string());
    let draft = ObservationDraft {
        memory_session_id: request.memory_session_id,
        project: request.project,
        r#type: request.knowledge_type.as_type_str().to_string(),
        title: request.title,
        subtitle: None,
        text: request.text,
        narrative: request.narrative,
        facts,
        concepts: request.concepts,
        files_read: vec![],
        files_modified: vec![],
        prompt_number: None,
    };

    let now_epoch = chrono::Utc::now().timestamp();
    match ingest::ingest(&state, draft, now_epoch).await? {
        IngestResult::Stored(observation) => {
            Ok((StatusCode::CREATED, Json(KnowledgeResponse { observation: Some(observation), duplicate: false })))
        }
        IngestResult::Duplicate => Ok((StatusCode::OK, Json(KnowledgeResponse { observation: None, duplicate: true }))),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/knowledge", post(store_knowledge))
}
