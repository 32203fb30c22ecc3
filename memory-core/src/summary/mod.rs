//! The end-of-session summary generator seam (§4.5): an abstract
//! `SummaryProvider` with a pure `Template` implementation that is always
//! available, and an `Llm` implementation that falls back to `Template` on
//! any failure.

mod llm;
mod template;

#[cfg(feature = "http-providers")]
pub use llm::HttpLlmProvider;
pub use llm::{LlmCompletion, LlmSummaryProvider};
pub use template::TemplateSummaryProvider;

use crate::error::Result;
use crate::model::{Observation, Session};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything a generator needs to synthesize a session summary.
#[derive(Debug, Clone)]
pub struct SummaryInput<'a> {
    pub session: &'a Session,
    pub observations: &'a [Observation],
}

/// The generated summary body, matching `Summary`'s free-form fields
/// (§3: request, investigated, learned, completed, next_steps, notes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub request: String,
    pub investigated: Vec<String>,
    pub learned: Vec<String>,
    pub completed: Vec<String>,
    pub next_steps: Vec<String>,
    pub notes: String,
}

pub const MAX_INVESTIGATED: usize = 5;
pub const MAX_LEARNED: usize = 5;
pub const MAX_COMPLETED: usize = 10;
pub const MAX_NEXT_STEPS: usize = 5;

/// Synthesizes a `Summary` from a session's observations.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn generate(&self, input: &SummaryInput<'_>) -> Result<GeneratedSummary>;
}
