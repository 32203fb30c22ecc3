//! The observation ingest pipeline (§4.1, §5): validate, redact, categorize,
//! dedup-check-then-insert, then fan out embedding/SSE/plugin work without
//! blocking the caller on any of it failing.

use crate::state::AppState;
use memory_core::categorizer::categorize;
use memory_core::error::{Error, Result};
use memory_core::model::{Observation, ObservationDraft};
use memory_core::plugin::PluginEvent;
use memory_core::secret_filter::redact;
use memory_storage::store::{IngestOutcome, NewObservation};
use std::sync::Arc;
use tracing::warn;

const MAX_TYPE_LEN: usize = 100;
const MAX_TITLE_LEN: usize = 500;
const MAX_TEXT_LEN: usize = 100_000;

/// Outcome handed back to the route handler: either a freshly stored
/// observation, or a dedup hit against an existing one.
pub enum IngestResult {
    Stored(Observation),
    Duplicate,
}

fn validate(draft: &ObservationDraft) -> Result<()> {
    if draft.r#type.is_empty() || draft.r#type.len() > MAX_TYPE_LEN {
        return Err(Error::Validation(format!("type must be 1..={MAX_TYPE_LEN} chars")));
    }
    if draft.title.is_empty() || draft.title.len() > MAX_TITLE_LEN {
        return Err(Error::Validation(format!("title must be 1..={MAX_TITLE_LEN} chars")));
    }
    if draft.text.len() > MAX_TEXT_LEN {
        return Err(Error::Validation(format!("text exceeds {MAX_TEXT_LEN} bytes")));
    }
    if draft.project.is_empty() {
        return Err(Error::Validation("project must not be empty".to_string()));
    }
    Ok(())
}

/// Run a draft through the full ingest pipeline against `state`, returning
/// once the write and every best-effort side effect has been attempted.
///
/// Embedding, SSE broadcast, and plugin dispatch are all best-effort: none
/// of them can turn a successful write into a failed ingest call (§5 — the
/// caller only ever waits on the durable write and the bounded plugin hooks).
pub async fn ingest(state: &Arc<AppState>, mut draft: ObservationDraft, now_epoch: i64) -> Result<IngestResult> {
    validate(&draft)?;

    draft.title = redact(&draft.title);
    draft.text = redact(&draft.text);
    draft.narrative = redact(&draft.narrative);

    let auto_category = categorize(&draft).as_str().to_string();
    let content_hash = Observation::compute_content_hash(&draft.project, &draft.r#type, &draft.title, &draft.narrative);

    let new = NewObservation {
        memory_session_id: draft.memory_session_id,
        project: draft.project,
        r#type: draft.r#type,
        title: draft.title,
        subtitle: draft.subtitle,
        text: draft.text,
        narrative: draft.narrative,
        facts: draft.facts,
        concepts: draft.concepts,
        files_read: draft.files_read,
        files_modified: draft.files_modified,
        prompt_number: draft.prompt_number,
        created_at_epoch: now_epoch,
        content_hash,
        auto_category,
    };

    let outcome = state.store.ingest_observation(new).await?;

    let stored = match outcome {
        IngestOutcome::Duplicate => return Ok(IngestResult::Duplicate),
        IngestOutcome::Inserted(obs) => obs,
    };

    spawn_embedding(state.clone(), stored.clone());

    state.hub.publish(crate::sse::HubEvent::ObservationCreated(stored.clone()));
    state.plugins.dispatch(PluginEvent::Observation(stored.clone())).await;

    Ok(IngestResult::Stored(stored))
}

/// Embed the freshly stored observation on a detached task. Failure is
/// logged and otherwise swallowed; `backfillEmbeddings` recovers any
/// observation left without a vector (§4.2, §5).
fn spawn_embedding(state: Arc<AppState>, observation: Observation) {
    tokio::spawn(async move {
        let text = format!("{}\n{}", observation.title, observation.text);
        let outcome = match state.embedding_provider.embed_text(&text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(observation_id = observation.id, error = %e, "embedding failed, left for backfill");
                return;
            }
        };
        if let Err(e) = state
            .store
            .upsert_embedding(observation.id, &outcome.model_name, outcome.dimension, &outcome.embedding, observation.created_at_epoch)
            .await
        {
            warn!(observation_id = observation.id, error = %e, "failed to persist embedding");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> ObservationDraft {
        ObservationDraft {
            memory_session_id: 1,
            project: "demo".to_string(),
            r#type: "research".to_string(),
            title: "Looked at the router".to_string(),
            subtitle: None,
            text: "found the handler".to_string(),
            narrative: "investigated routing".to_string(),
            facts: None,
            concepts: None,
            files_read: vec![],
            files_modified: vec![],
            prompt_number: None,
        }
    }

    #[test]
    fn rejects_an_empty_title() {
        let mut draft = sample_draft();
        draft.title.clear();
        assert!(validate(&draft).is_err());
    }

    #[test]
    fn rejects_oversized_text() {
        let mut draft = sample_draft();
        draft.text = "a".repeat(MAX_TEXT_LEN + 1);
        assert!(validate(&draft).is_err());
    }

    #[test]
    fn accepts_a_well_formed_draft() {
        assert!(validate(&sample_draft()).is_ok());
    }
}
