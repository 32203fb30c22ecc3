//! [`UserPrompt`] — one user prompt within a session (§3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrompt {
    pub id: i64,
    pub content_session_id: String,
    pub project: String,
    pub prompt_number: i64,
    pub prompt_text: String,
    pub created_at_epoch: i64,
    pub created_at_iso: String,
}
