//! [`Summary`] — the end-of-session digest (§3, §4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub session_id: i64,
    pub project: String,
    pub request: String,
    pub investigated: Vec<String>,
    pub learned: Vec<String>,
    pub completed: Vec<String>,
    pub next_steps: Vec<String>,
    pub notes: String,
    pub created_at_epoch: i64,
    pub created_at_iso: String,
}
