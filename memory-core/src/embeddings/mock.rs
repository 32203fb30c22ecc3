//! A deterministic, hash-based embedding provider used when no real
//! provider is configured (§6: embeddings are entirely optional — the
//! system must degrade gracefully to full-text-only ranking in their
//! absence). The vectors are not semantically meaningful; they exist so the
//! rest of the pipeline (storage, scoring, batch backfill) has a provider to
//! exercise without a network dependency.

use crate::embeddings::provider::{EmbeddingOutcome, EmbeddingProvider};
use crate::embeddings::similarity::normalize;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<EmbeddingOutcome> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            embedding.push(((seed >> 16) as f32) / 32_768.0 - 1.0);
        }
        normalize(&mut embedding);

        Ok(EmbeddingOutcome { embedding, model_name: self.model_name().to_string(), dimension: self.dimension })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-hash-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic_for_the_same_text() {
        let provider = MockEmbeddingProvider::new(32);
        let a = provider.embed_text("hello").await.unwrap();
        let b = provider.embed_text("hello").await.unwrap();
        assert_eq!(a.embedding, b.embedding);
    }

    #[tokio::test]
    async fn distinct_texts_usually_produce_distinct_vectors() {
        let provider = MockEmbeddingProvider::new(32);
        let a = provider.embed_text("hello").await.unwrap();
        let b = provider.embed_text("goodbye").await.unwrap();
        assert_ne!(a.embedding, b.embedding);
    }

    #[tokio::test]
    async fn embeddings_always_match_the_declared_dimension() {
        let provider = MockEmbeddingProvider::new(16);
        let outcome = provider.embed_text("anything").await.unwrap();
        assert_eq!(outcome.embedding.len(), 16);
        assert_eq!(outcome.dimension, 16);
    }
}
