//! The `EmbeddingProvider` trait: the seam `memory-storage`'s vector index
//! and `memory-worker`'s ingest path embed text through.

use crate::error::{Error, Result};
use async_trait::async_trait;

/// The outcome of a single embedding call, carrying enough metadata for the
/// store to record provenance alongside the vector (§4.2 embeddings table).
#[derive(Debug, Clone)]
pub struct EmbeddingOutcome {
    pub embedding: Vec<f32>,
    pub model_name: String,
    pub dimension: usize,
}

/// A source of text embeddings. Implementors must be dimension-stable: the
/// `embedding_dimension()` an implementation reports must match every vector
/// it returns from `embed_text`/`embed_batch`, for the lifetime of the
/// process. The store treats a dimension mismatch against a previously
/// stored vector as a hard error rather than silently re-indexing (Open
/// Question, resolved in DESIGN.md: drift is a configuration fault).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text.
    async fn embed_text(&self, text: &str) -> Result<EmbeddingOutcome>;

    /// Embed a batch of texts. The default implementation calls
    /// `embed_text` once per item; providers with a real batch API should
    /// override this for throughput.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingOutcome>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_text(text).await?);
        }
        Ok(out)
    }

    /// The fixed dimension this provider always returns.
    fn embedding_dimension(&self) -> usize;

    /// A stable identifier for the model in use, stored alongside vectors
    /// so an operator can tell which provider produced them.
    fn model_name(&self) -> &str;
}

/// Validate that a freshly produced embedding matches the provider's
/// declared dimension, returning `Error::Embedding` on drift.
pub fn validate_dimension(provider: &dyn EmbeddingProvider, embedding: &[f32]) -> Result<()> {
    let expected = provider.embedding_dimension();
    if embedding.len() != expected {
        return Err(Error::Embedding(format!(
            "provider {} produced a {}-dimensional vector, expected {}",
            provider.model_name(),
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;

    #[tokio::test]
    async fn dimension_validation_passes_for_a_well_behaved_provider() {
        let provider = MockEmbeddingProvider::new(16);
        let outcome = provider.embed_text("hello world").await.expect("mock never fails");
        assert!(validate_dimension(&provider, &outcome.embedding).is_ok());
    }

    #[tokio::test]
    async fn dimension_validation_fails_on_a_mismatched_vector() {
        let provider = MockEmbeddingProvider::new(16);
        let wrong = vec![0.0_f32; 8];
        assert!(validate_dimension(&provider, &wrong).is_err());
    }
}
