//! The data model from the system specification: sessions, observations,
//! summaries, checkpoints, prompts, embeddings and project aliases.
//!
//! All tables use monotonic `i64` ids assigned by the store; timestamps are
//! carried as a second epoch (the ordering key), matching every
//! `chrono::Utc::now().timestamp()` call site that produces one, paired with
//! an ISO-8601 string derived from it via [`epoch_to_iso8601`] (§3). The
//! internal-only `embeddings` table is the one exception: it is never read
//! back into a model type or surfaced through the API, so it carries no
//! paired iso column.

mod checkpoint;
mod observation;
mod prompt;
mod session;
mod summary;

pub use checkpoint::Checkpoint;
pub use observation::{KnowledgeType, Observation, ObservationDraft};
pub use prompt::UserPrompt;
pub use session::{Session, SessionStatus};
pub use summary::Summary;

/// Render a second epoch as its paired ISO-8601 string (§3: "all timestamps
/// are stored as both an ISO-8601 string and an epoch; the epoch is the
/// ordering key"). Out-of-range epochs fall back to the Unix epoch rather
/// than panicking, since this only ever feeds a display-only column.
#[must_use]
pub fn epoch_to_iso8601(epoch_secs: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(epoch_secs, 0).unwrap_or_default().to_rfc3339()
}

/// A project alias row: maps an internal `project` key to a display name
/// shown by the UI.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProjectAlias {
    pub project_name: String,
    pub display_name: String,
}

/// A plugin-produced join row connecting an observation to an external
/// artifact (e.g. a GitHub issue/PR). Not required by the core; present
/// only when a plugin emits one.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExternalLink {
    pub id: i64,
    pub observation_id: i64,
    pub repo: String,
    pub artifact_number: Option<i64>,
    pub action: String,
    pub url: String,
    pub created_at_epoch: i64,
    pub created_at_iso: String,
}
