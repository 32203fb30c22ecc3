//! `GET /api/embeddings/stats` and `POST /api/embeddings/backfill` (§4.2).

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use memory_storage::store::EmbeddingStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

const DEFAULT_BACKFILL_BATCH: i64 = 100;

#[derive(Deserialize)]
pub struct StatsParams {
    project: Option<String>,
}

async fn stats(State(state): State<Arc<AppState>>, Query(params): Query<StatsParams>) -> ApiResult<Json<EmbeddingStats>> {
    let project = params.project.as_deref().unwrap_or_default();
    Ok(Json(state.store.embedding_stats(project).await?))
}

#[derive(Deserialize, Default)]
struct BackfillRequest {
    project: Option<String>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct BackfillResponse {
    embedded: u64,
    failed: u64,
}

/// Embed every observation missing a vector, up to `limit`, synchronously —
/// unlike ingest's fire-and-forget embedding, backfill is the caller
/// explicitly asking to catch up, so it waits for the result (§4.2, §5).
async fn backfill(
    State(state): State<Arc<AppState>>,
    body: Option<Json<BackfillRequest>>,
) -> ApiResult<Json<BackfillResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let project = request.project.as_deref().unwrap_or_default();
    let limit = request.limit.unwrap_or(DEFAULT_BACKFILL_BATCH);

    let ids = state.store.observations_missing_embeddings(project, limit).await?;
    let mut embedded = 0u64;
    let mut failed = 0u64;

    for id in ids {
        let Some(observation) = state.store.get_observation_by_id(id).await? else { continue };
        let text = format!("{}\n{}", observation.title, observation.text);
        match state.embedding_provider.embed_text(&text).await {
            Ok(outcome) => {
                match state
                    .store
                    .upsert_embedding(id, &outcome.model_name, outcome.dimension, &outcome.embedding, observation.created_at_epoch)
                    .await
                {
                    Ok(()) => embedded += 1,
                    Err(e) => {
                        warn!(observation_id = id, error = %e, "backfill: failed to persist embedding");
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!(observation_id = id, error = %e, "backfill: embedding call failed");
                failed += 1;
            }
        }
    }

    Ok(Json(BackfillResponse { embedded, failed }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/embeddings/stats", get(stats)).route("/embeddings/backfill", post(backfill))
}
