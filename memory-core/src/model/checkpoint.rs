//! [`Checkpoint`] — a resumable pointer created immediately after a session
//! summary (§3, §4.5).

use serde::{Deserialize, Serialize};

/// A compact header of a recent observation, used by the checkpoint's
/// `context_snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationHeader {
    pub id: i64,
    pub r#type: String,
    pub title: String,
    pub created_at_epoch: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: i64,
    pub session_id: i64,
    pub project: String,
    pub task: String,
    pub progress: String,
    pub next_steps: Vec<String>,
    pub open_questions: Vec<String>,
    pub relevant_files: Vec<String>,
    /// Up to 10 recent observation headers, per §3/§4.5.
    pub context_snapshot: Vec<ObservationHeader>,
    pub created_at_epoch: i64,
    pub created_at_iso: String,
}

/// Cap on `context_snapshot` size, per §3.
pub const CONTEXT_SNAPSHOT_CAP: usize = 10;
