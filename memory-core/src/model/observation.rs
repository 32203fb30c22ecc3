//! [`Observation`] — the atomic record of a tool use (§3).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Observation types treated as *knowledge*: ranked higher and exempt from
/// retention deletion by default (§3, §4.5, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Constraint,
    Decision,
    Heuristic,
    Rejected,
}

impl KnowledgeType {
    /// Parse a free-form `type` string into a knowledge type, if it is one.
    #[must_use]
    pub fn from_type_str(type_str: &str) -> Option<Self> {
        match type_str {
            "constraint" => Some(Self::Constraint),
            "decision" => Some(Self::Decision),
            "heuristic" => Some(Self::Heuristic),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// The free-form `type` string this knowledge type is stored under.
    #[must_use]
    pub fn as_type_str(self) -> &'static str {
        match self {
            Self::Constraint => "constraint",
            Self::Decision => "decision",
            Self::Heuristic => "heuristic",
            Self::Rejected => "rejected",
        }
    }
}

/// The atomic record of a tool invocation.
///
/// Immutable after write except for `last_accessed_epoch`, `is_stale`, and
/// consolidation-driven title/text rewrites (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub memory_session_id: i64,
    pub project: String,
    pub r#type: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub text: String,
    pub narrative: String,
    /// Opaque string; for knowledge records carries a JSON metadata object
    /// including `importance`.
    pub facts: Option<String>,
    /// Comma-joined tags.
    pub concepts: Option<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub prompt_number: Option<i64>,
    pub created_at_epoch: i64,
    /// ISO-8601 form of `created_at_epoch`, paired per §3 (display only —
    /// `created_at_epoch` remains the ordering key).
    pub created_at_iso: String,
    pub content_hash: String,
    pub discovery_tokens: i64,
    pub last_accessed_epoch: Option<i64>,
    pub last_accessed_iso: Option<String>,
    pub is_stale: bool,
    pub auto_category: String,
}

impl Observation {
    /// Content hash per §3: SHA-256 over `project|type|title|narrative`.
    /// Deliberately excludes the body text (§9: two observations with
    /// identical title/narrative but different bodies collide within the
    /// dedup window — this is intended).
    #[must_use]
    pub fn compute_content_hash(project: &str, r#type: &str, title: &str, narrative: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(project.as_bytes());
        hasher.update(b"|");
        hasher.update(r#type.as_bytes());
        hasher.update(b"|");
        hasher.update(title.as_bytes());
        hasher.update(b"|");
        hasher.update(narrative.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether this observation's `type` is one of the knowledge types.
    #[must_use]
    pub fn knowledge_type(&self) -> Option<KnowledgeType> {
        KnowledgeType::from_type_str(&self.r#type)
    }

    /// Whether this observation is a knowledge observation.
    #[must_use]
    pub fn is_knowledge(&self) -> bool {
        self.knowledge_type().is_some()
    }

    /// `facts.importance` parsed out of the opaque JSON `facts` blob, used by
    /// the knowledge retention exemption rule (§3, §4.8). Missing/invalid
    /// facts are treated as importance 0.
    #[must_use]
    pub fn facts_importance(&self) -> i64 {
        self.facts
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|v| v.get("importance").and_then(serde_json::Value::as_i64))
            .unwrap_or(0)
    }

    /// Files this observation touched, for stale detection (§4.1).
    pub fn touched_files(&self) -> impl Iterator<Item = &str> {
        self.files_read.iter().chain(self.files_modified.iter()).map(String::as_str)
    }

    /// Rough token cost of title + body, per the glossary's
    /// "1 token ≈ 4 characters" rule, used by smart-context budgeting.
    #[must_use]
    pub fn approx_tokens(&self) -> i64 {
        crate::tokens::estimate_tokens(self.title.len() + self.text.len())
    }
}

/// A not-yet-validated candidate observation submitted by the Ingest API,
/// before secret redaction, categorization, and content-hash computation.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationDraft {
    pub memory_session_id: i64,
    pub project: String,
    pub r#type: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub text: String,
    pub narrative: String,
    pub facts: Option<String>,
    pub concepts: Option<String>,
    #[serde(default)]
    pub files_read: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    pub prompt_number: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_excludes_body_text() {
        let h1 = Observation::compute_content_hash("demo", "file-write", "Edit foo.rs", "did a thing");
        let h2 = Observation::compute_content_hash("demo", "file-write", "Edit foo.rs", "did a thing");
        assert_eq!(h1, h2);

        let h3 = Observation::compute_content_hash("demo", "file-write", "Edit bar.rs", "did a thing");
        assert_ne!(h1, h3);
    }

    #[test]
    fn knowledge_type_round_trips_through_the_type_string() {
        for kt in [
            KnowledgeType::Constraint,
            KnowledgeType::Decision,
            KnowledgeType::Heuristic,
            KnowledgeType::Rejected,
        ] {
            assert_eq!(KnowledgeType::from_type_str(kt.as_type_str()), Some(kt));
        }
        assert_eq!(KnowledgeType::from_type_str("file-read"), None);
    }

    #[test]
    fn facts_importance_defaults_to_zero_on_missing_or_malformed_json() {
        let mut obs = sample_observation();
        obs.facts = None;
        assert_eq!(obs.facts_importance(), 0);

        obs.facts = Some("not json".to_string());
        assert_eq!(obs.facts_importance(), 0);

        obs.facts = Some(r#"{"importance": 5}"#.to_string());
        assert_eq!(obs.facts_importance(), 5);
    }

    fn sample_observation() -> Observation {
        Observation {
            id: 1,
            memory_session_id: 1,
            project: "demo".into(),
            r#type: "decision".into(),
            title: "Use esbuild".into(),
            subtitle: None,
            text: String::new(),
            narrative: String::new(),
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
            auto_category: "decision".into(),
        }
    }
}
