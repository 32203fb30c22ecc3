//! A [`Session`] represents one agent working period (§3).

use serde::{Deserialize, Serialize};

/// Lifecycle state of a session: `active -> completed`, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// One agent working period, created on first prompt and transitioning
/// `active -> completed` exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    /// Externally supplied session id from the agent host, unique.
    pub content_session_id: String,
    pub project: String,
    pub user_prompt: String,
    pub status: SessionStatus,
    pub started_at_epoch: i64,
    pub started_at_iso: String,
    pub completed_at_epoch: Option<i64>,
    pub completed_at_iso: Option<String>,
}

impl Session {
    /// Whether `complete` has already been called on this session.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.status, SessionStatus::Completed)
    }

    /// Validate the session.completed_at_epoch > started_at_epoch invariant
    /// from §3; a no-op (returns `true`) while the session is still active.
    #[must_use]
    pub fn satisfies_completion_ordering(&self) -> bool {
        match (self.status, self.completed_at_epoch) {
            (SessionStatus::Completed, Some(completed)) => completed > self.started_at_epoch,
            (SessionStatus::Completed, None) => false,
            (SessionStatus::Active, _) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: SessionStatus, started: i64, completed: Option<i64>) -> Session {
        Session {
            id: 1,
            content_session_id: "abc".into(),
            project: "demo".into(),
            user_prompt: "do a thing".into(),
            status,
            started_at_epoch: started,
            started_at_iso: crate::model::epoch_to_iso8601(started),
            completed_at_epoch: completed,
            completed_at_iso: completed.map(crate::model::epoch_to_iso8601),
        }
    }

    #[test]
    fn completed_session_must_have_a_later_completion_epoch() {
        let ok = session(SessionStatus::Completed, 100, Some(200));
        assert!(ok.satisfies_completion_ordering());

        let bad = session(SessionStatus::Completed, 100, Some(50));
        assert!(!bad.satisfies_completion_ordering());

        let missing = session(SessionStatus::Completed, 100, None);
        assert!(!missing.satisfies_completion_ordering());
    }

    #[test]
    fn active_session_ordering_is_always_satisfied() {
        let active = session(SessionStatus::Active, 100, None);
        assert!(active.satisfies_completion_ordering());
    }
}
