//! `GET /api/search` and `GET /api/hybrid-search` (§4.3, §4.4).

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use memory_storage::store::HybridSearchQuery;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    project: Option<String>,
    #[serde(rename = "type")]
    type_filter: Option<String>,
    limit: Option<i64>,
    cursor: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    observations: Vec<memory_core::model::Observation>,
    summaries: Vec<memory_core::model::Summary>,
    next_cursor: Option<String>,
}

async fn search(State(state): State<Arc<AppState>>, Query(params): Query<SearchParams>) -> ApiResult<Json<SearchResponse>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    let query = params.q.unwrap_or_default();

    let observations = if query.is_empty() {
        state.store.keyword_search(params.project.as_deref(), params.type_filter.as_deref(), "", limit, params.cursor.as_deref()).await?
    } else {
        state.store.keyword_search(params.project.as_deref(), params.type_filter.as_deref(), &query, limit, params.cursor.as_deref()).await?
    };

    let next_cursor = observations
        .last()
        .filter(|_| observations.len() as i64 == limit)
        .map(|last| memory_core::pagination::encode_cursor(last.id, last.created_at_epoch));

    let summaries = if let Some(project) = params.project.as_deref() {
        state.store.recent_summaries(project, 5).await?
    } else {
        Vec::new()
    };

    Ok(Json(SearchResponse { observations, summaries, next_cursor }))
}

#[derive(Debug, Deserialize)]
pub struct HybridSearchParams {
    q: Option<String>,
    project: Option<String>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct HybridHit {
    id: i64,
    title: String,
    content: String,
    #[serde(rename = "type")]
    type_: String,
    project: String,
    score: f64,
    source: &'static str,
}

#[derive(Serialize)]
struct HybridSearchResponse {
    results: Vec<HybridHit>,
}

async fn hybrid_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HybridSearchParams>,
) -> ApiResult<Json<HybridSearchResponse>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    let has_text = params.q.as_deref().is_some_and(|q| !q.is_empty());
    let query_embedding = if has_text {
        Some(state.embedding_provider.embed_text(params.q.as_deref().unwrap_or_default()).await?.embedding)
    } else {
        None
    };
    let source = if has_text && query_embedding.is_some() { "both" } else if has_text { "fts" } else { "vector" };

    let hits = state
        .store
        .hybrid_search(HybridSearchQuery {
            project: params.project,
            type_filter: None,
            text_query: params.q,
            query_embedding,
            now_epoch: chrono::Utc::now().timestamp(),
            limit,
            cursor: None,
        })
        .await?;

    let results = hits
        .into_iter()
        .map(|hit| HybridHit {
            id: hit.observation.id,
            title: hit.observation.title,
            content: hit.observation.text,
            type_: hit.observation.r#type,
            project: hit.observation.project,
            score: hit.score,
            source,
        })
        .collect();

    Ok(Json(HybridSearchResponse { results }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search)).route("/hybrid-search", get(hybrid_search))
}
