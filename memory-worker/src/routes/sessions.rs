//! `POST /api/sessions` and `POST /api/sessions/complete` (§4.5): the only
//! HTTP entry points into the session machine — starting a session via
//! `get_or_create_session`, and ending one via `complete_session` followed
//! by summary synthesis and checkpoint creation.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use memory_core::model::{Checkpoint, Session, Summary};
use memory_core::summary::SummaryInput;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Deserialize)]
struct StartSessionRequest {
    content_session_id: String,
    project: String,
    #[serde(default)]
    user_prompt: String,
}

async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let now_epoch = chrono::Utc::now().timestamp();
    let session =
        state.store.get_or_create_session(&request.content_session_id, &request.project, &request.user_prompt, now_epoch).await?;
    state.plugins.dispatch_session_start(&session).await;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Deserialize)]
struct CompleteSessionRequest {
    content_session_id: String,
}

#[derive(Serialize)]
struct CompleteSessionResponse {
    session: Session,
    summary: Summary,
    checkpoint: Checkpoint,
}

async fn complete_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompleteSessionRequest>,
) -> ApiResult<Json<CompleteSessionResponse>> {
    let now_epoch = chrono::Utc::now().timestamp();
    let session = state.store.complete_session(&request.content_session_id, now_epoch).await?;
    let observations = state.store.observations_for_session(session.id).await?;

    let generated = state.summary_provider.generate(&SummaryInput { session: &session, observations: &observations }).await?;
    let summary = state
        .store
        .insert_summary(&Summary {
            id: 0,
            session_id: session.id,
            project: session.project.clone(),
            request: generated.request,
            investigated: generated.investigated,
            learned: generated.learned,
            completed: generated.completed,
            next_steps: generated.next_steps,
            notes: generated.notes,
            created_at_epoch: now_epoch,
            created_at_iso: memory_core::model::epoch_to_iso8601(now_epoch),
        })
        .await?;

    let mut relevant_files: BTreeSet<String> = BTreeSet::new();
    for observation in &observations {
        relevant_files.extend(observation.files_read.iter().cloned());
        relevant_files.extend(observation.files_modified.iter().cloned());
    }

    let checkpoint = state
        .store
        .create_checkpoint(
            session.id,
            &session.project,
            &session.user_prompt,
            &summary.notes,
            &summary.next_steps,
            &[],
            &relevant_files.into_iter().collect::<Vec<_>>(),
            now_epoch,
        )
        .await?;

    state.hub.publish(crate::sse::HubEvent::SummaryCreated(summary.clone()));
    state.hub.publish(crate::sse::HubEvent::SessionCompleted { session_id: session.id, project: session.project.clone() });
    state.plugins.dispatch_summary(&summary).await;
    state.plugins.dispatch_session_end(&session).await;

    Ok(Json(CompleteSessionResponse { session, summary, checkpoint }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sessions", post(start_session)).route("/sessions/complete", post(complete_session))
}
