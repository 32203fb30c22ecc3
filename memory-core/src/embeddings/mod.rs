//! The embedding provider seam (§4.2, §6): a trait the worker injects a
//! concrete implementation into, plus a mock usable when no provider is
//! configured.
//!
//! Real HTTP-backed providers (OpenAI/Anthropic/Ollama-compatible) live in
//! `memory-worker` behind the `http-providers` feature on this crate; this
//! module only defines the contract and the absence-tolerant fallback.

mod mock;
mod provider;
mod similarity;

pub use mock::MockEmbeddingProvider;
pub use provider::{EmbeddingOutcome, EmbeddingProvider};
pub use similarity::cosine_similarity;
