//! The pure, rule-based summary generator (§4.5): always available, never
//! fails, used both standalone and as the `Llm` provider's fallback.

use crate::error::Result;
use crate::summary::{
    GeneratedSummary, SummaryInput, SummaryProvider, MAX_COMPLETED, MAX_INVESTIGATED, MAX_LEARNED, MAX_NEXT_STEPS,
};
use async_trait::async_trait;

const MARKER_KEYWORDS: &[&str] = &["TODO", "FIXME", "HACK", "XXX"];

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummaryProvider;

#[async_trait]
impl SummaryProvider for TemplateSummaryProvider {
    async fn generate(&self, input: &SummaryInput<'_>) -> Result<GeneratedSummary> {
        Ok(generate_template_summary(input))
    }
}

/// Pure function form, usable directly as the `Llm` provider's fallback
/// without going through the trait object.
#[must_use]
pub fn generate_template_summary(input: &SummaryInput<'_>) -> GeneratedSummary {
    let mut investigated = Vec::new();
    let mut learned = Vec::new();
    let mut completed = Vec::new();
    let mut next_steps = Vec::new();

    for obs in input.observations {
        match obs.r#type.as_str() {
            "file-read" | "research" => {
                if investigated.len() < MAX_INVESTIGATED {
                    investigated.push(obs.title.clone());
                }
            }
            _ => {}
        }

        if obs.r#type == "research" || obs.is_knowledge() {
            if learned.len() < MAX_LEARNED {
                let line = if obs.narrative.is_empty() { obs.title.clone() } else { obs.narrative.clone() };
                learned.push(line);
            }
        }

        let is_debugging_category = obs.auto_category == "debugging";
        if matches!(obs.r#type.as_str(), "file-write" | "command") || is_debugging_category {
            if completed.len() < MAX_COMPLETED {
                completed.push(obs.title.clone());
            }
        }

        for marker in mine_markers(&obs.text) {
            if next_steps.len() < MAX_NEXT_STEPS {
                next_steps.push(marker);
            }
        }
    }

    let notes = build_notes(input);

    GeneratedSummary {
        request: input.session.user_prompt.clone(),
        investigated,
        learned,
        completed,
        next_steps,
        notes,
    }
}

/// Pull out lines mentioning TODO/FIXME/HACK/XXX, trimmed of leading
/// comment punctuation.
fn mine_markers(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| MARKER_KEYWORDS.iter().any(|kw| line.contains(kw)))
        .map(|line| line.trim().trim_start_matches(['/', '*', '#', '-', ' ']).to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn build_notes(input: &SummaryInput<'_>) -> String {
    let count = input.observations.len();
    let duration_note = match input.session.completed_at_epoch {
        Some(completed) => {
            let duration_secs = (completed - input.session.started_at_epoch).max(0);
            let minutes = duration_secs / 60;
            format!("{minutes} minute session")
        }
        None => "session still active".to_string(),
    };
    format!("{duration_note}, {count} observation(s) recorded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Observation, Session, SessionStatus};

    fn session() -> Session {
        Session {
            id: 1,
            content_session_id: "cs-1".into(),
            project: "demo".into(),
            user_prompt: "Investigate the flaky test".into(),
            status: SessionStatus::Completed,
            started_at_epoch: 0,
            started_at_iso: crate::model::epoch_to_iso8601(0),
            completed_at_epoch: Some(600),
            completed_at_iso: Some(crate::model::epoch_to_iso8601(600)),
        }
    }

    fn obs(r#type: &str, title: &str, text: &str, narrative: &str, auto_category: &str) -> Observation {
        Observation {
            id: 1,
            memory_session_id: 1,
            project: "demo".into(),
            r#type: r#type.to_string(),
            title: title.to_string(),
            subtitle: None,
            text: text.to_string(),
            narrative: narrative.to_string(),
            facts: None,
            concepts: None,
            files_read: vec![],
            files_modified: vec![],
            prompt_number: None,
            created_at_epoch: 0,
            created_at_iso: crate::model::epoch_to_iso8601(0),
            content_hash: String::new(),
            discovery_tokens: 0,
            last_accessed_epoch: None,
            last_accessed_iso: None,
            is_stale: false,
            auto_category: auto_category.to_string(),
        }
    }

    #[tokio::test]
    async fn research_observation_feeds_investigated_and_learned() {
        let session = session();
        let observations =
            vec![obs("research", "Checked JWT expiry", "", "JWT tokens expire in 1h", "research")];
        let input = SummaryInput { session: &session, observations: &observations };
        let summary = generate_template_summary(&input);
        assert_eq!(summary.investigated, vec!["Checked JWT expiry"]);
        assert_eq!(summary.learned, vec!["JWT tokens expire in 1h"]);
        assert!(summary.notes.contains("1 observation"));
    }

    #[tokio::test]
    async fn file_write_and_debugging_feed_completed() {
        let session = session();
        let observations = vec![
            obs("file-write", "Updated parser.rs", "", "", "file_write"),
            obs("command", "cargo test", "2 tests failed", "", "debugging"),
        ];
        let input = SummaryInput { session: &session, observations: &observations };
        let summary = generate_template_summary(&input);
        assert_eq!(summary.completed, vec!["Updated parser.rs", "cargo test"]);
    }

    #[tokio::test]
    async fn todo_markers_are_mined_into_next_steps() {
        let session = session();
        let observations =
            vec![obs("file-write", "Patch loader", "// TODO: handle empty input\nrest of diff", "", "file_write")];
        let input = SummaryInput { session: &session, observations: &observations };
        let summary = generate_template_summary(&input);
        assert_eq!(summary.next_steps, vec!["TODO: handle empty input"]);
    }

    #[tokio::test]
    async fn caps_are_enforced_per_section() {
        let session = session();
        let observations: Vec<Observation> =
            (0..20).map(|i| obs("file-write", &format!("change {i}"), "", "", "file_write")).collect();
        let input = SummaryInput { session: &session, observations: &observations };
        let summary = generate_template_summary(&input);
        assert_eq!(summary.completed.len(), MAX_COMPLETED);
    }
}
