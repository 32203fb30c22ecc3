//! Pure rule engine assigning one of nine auto-categories to an observation
//! from its fields (§2, §4.5).
//!
//! The nine categories are the five ordinary activity kinds the ingest path
//! sees directly (`file-read`, `file-write`, `command`, `research`,
//! `delegation`), the three non-rejected knowledge types
//! (`constraint`, `decision`, `heuristic`), and a ninth, `debugging`,
//! inferred from content rather than the `type` field — a failed or
//! corrective command/file-write carries more summary weight than an
//! ordinary one (§4.5 mines `debugging`-category observations into a
//! session summary's `completed` section alongside `file-write`/`command`).
//! A `rejected` knowledge observation is filed under `Decision`: a rejected
//! option is still the record of a decision made.

use crate::model::{KnowledgeType, ObservationDraft};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoCategory {
    FileRead,
    FileWrite,
    CommandExecution,
    Research,
    Delegation,
    Debugging,
    Constraint,
    Decision,
    Heuristic,
}

impl AutoCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::CommandExecution => "command_execution",
            Self::Research => "research",
            Self::Delegation => "delegation",
            Self::Debugging => "debugging",
            Self::Constraint => "constraint",
            Self::Decision => "decision",
            Self::Heuristic => "heuristic",
        }
    }
}

/// Keywords in title/text/narrative that flip an otherwise ordinary
/// `file-write`/`command` observation into `debugging`.
const DEBUG_KEYWORDS: &[&str] = &["fix", "bug", "error", "fail", "debug", "crash", "exception"];

/// Assign an auto-category to a not-yet-persisted observation draft.
#[must_use]
pub fn categorize(draft: &ObservationDraft) -> AutoCategory {
    if let Some(knowledge) = KnowledgeType::from_type_str(&draft.r#type) {
        return match knowledge {
            KnowledgeType::Constraint => AutoCategory::Constraint,
            KnowledgeType::Decision | KnowledgeType::Rejected => AutoCategory::Decision,
            KnowledgeType::Heuristic => AutoCategory::Heuristic,
        };
    }

    match draft.r#type.as_str() {
        "file-read" => AutoCategory::FileRead,
        "research" => AutoCategory::Research,
        "delegation" => AutoCategory::Delegation,
        "file-write" if looks_like_debugging(draft) => AutoCategory::Debugging,
        "file-write" => AutoCategory::FileWrite,
        "command" if looks_like_debugging(draft) => AutoCategory::Debugging,
        "command" => AutoCategory::CommandExecution,
        _ => AutoCategory::Research,
    }
}

fn looks_like_debugging(draft: &ObservationDraft) -> bool {
    let haystack = format!("{} {} {}", draft.title, draft.text, draft.narrative).to_lowercase();
    DEBUG_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(r#type: &str, title: &str, text: &str) -> ObservationDraft {
        ObservationDraft {
            memory_session_id: 1,
            project: "demo".into(),
            r#type: r#type.to_string(),
            title: title.to_string(),
            subtitle: None,
            text: text.to_string(),
            narrative: String::new(),
            facts: None,
            concepts: None,
            files_read: vec![],
            files_modified: vec![],
            prompt_number: None,
        }
    }

    #[test]
    fn knowledge_types_map_to_their_own_category() {
        assert_eq!(categorize(&draft("constraint", "t", "")), AutoCategory::Constraint);
        assert_eq!(categorize(&draft("decision", "t", "")), AutoCategory::Decision);
        assert_eq!(categorize(&draft("heuristic", "t", "")), AutoCategory::Heuristic);
        assert_eq!(categorize(&draft("rejected", "t", "")), AutoCategory::Decision);
    }

    #[test]
    fn ordinary_types_map_directly() {
        assert_eq!(categorize(&draft("file-read", "t", "")), AutoCategory::FileRead);
        assert_eq!(categorize(&draft("research", "t", "")), AutoCategory::Research);
        assert_eq!(categorize(&draft("delegation", "t", "")), AutoCategory::Delegation);
    }

    #[test]
    fn file_write_with_bugfix_language_becomes_debugging() {
        let d = draft("file-write", "Fix off-by-one bug in parser", "adjusted loop bound");
        assert_eq!(categorize(&d), AutoCategory::Debugging);
    }

    #[test]
    fn plain_file_write_stays_file_write() {
        let d = draft("file-write", "Add new config option", "added a field");
        assert_eq!(categorize(&d), AutoCategory::FileWrite);
    }

    #[test]
    fn failing_command_becomes_debugging() {
        let d = draft("command", "cargo test", "2 tests failed with panic");
        assert_eq!(categorize(&d), AutoCategory::Debugging);
    }
}
