//! `GET /api/context/:project` (§4.4): recent summaries, observations, and
//! prompts for a project, the same assembly `smart_context` builds for a
//! query-less retrieval call.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use memory_core::model::{Observation, Summary};
use memory_storage::store::SmartContextQuery;
use serde::Serialize;
use std::sync::Arc;

const RECENT_SUMMARIES: i64 = 5;

#[derive(Serialize)]
struct ContextResponse {
    observations: Vec<Observation>,
    summaries: Vec<Summary>,
    tokens_used: i64,
}

async fn context(State(state): State<Arc<AppState>>, Path(project): Path<String>) -> ApiResult<Json<ContextResponse>> {
    let budget = state.config.context_token_budget;
    let result = state
        .store
        .smart_context(SmartContextQuery { project: project.clone(), now_epoch: chrono::Utc::now().timestamp(), token_budget: budget })
        .await?;
    let summaries = state.store.recent_summaries(&project, RECENT_SUMMARIES).await?;

    Ok(Json(ContextResponse {
        observations: result.hits.into_iter().map(|hit| hit.observation).collect(),
        summaries,
        tokens_used: result.total_tokens.min(budget),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/context/:project", get(context))
}
