//! Embedding storage (§4.2, §4.6): one packed vector per observation,
//! encoded with `postcard`, plus backfill bookkeeping.

use crate::retry::with_busy_retry;
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EmbeddingStats {
    pub total_observations: i64,
    pub embedded_observations: i64,
    pub missing_observations: i64,
}

impl Store {
    pub async fn upsert_embedding(
        &self,
        observation_id: i64,
        model_name: &str,
        dimension: usize,
        vector: &[f32],
        created_at_epoch: i64,
    ) -> Result<()> {
        let packed = postcard::to_allocvec(&vector.to_vec()).map_err(|e| Error::Embedding(e.to_string()))?;
        let conn = self.connect().await?;
        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO embeddings (observation_id, model_name, dimension, vector, created_at_epoch) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(observation_id) DO UPDATE SET \
                 model_name = excluded.model_name, dimension = excluded.dimension, \
                 vector = excluded.vector, created_at_epoch = excluded.created_at_epoch",
                params![observation_id, model_name, dimension as i64, packed.clone(), created_at_epoch],
            )
        })
        .await?;
        Ok(())
    }

    pub async fn get_embedding(&self, observation_id: i64) -> Result<Option<Vec<f32>>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT vector FROM embeddings WHERE observation_id = ?1", params![observation_id])
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            Some(row) => {
                let raw: Vec<u8> = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
                let vector: Vec<f32> = postcard::from_bytes(&raw).map_err(|e| Error::Embedding(e.to_string()))?;
                Ok(Some(vector))
            }
            None => Ok(None),
        }
    }

    /// Observation ids within `project` that have no embedding row yet, in
    /// ascending id order, used to drive backfill (§4.6).
    pub async fn observations_missing_embeddings(&self, project: &str, limit: i64) -> Result<Vec<i64>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT o.id FROM observations o LEFT JOIN embeddings e ON e.observation_id = o.id \
                 WHERE o.project = ?1 AND e.observation_id IS NULL ORDER BY o.id ASC LIMIT ?2",
                params![project, limit],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            ids.push(row.get(0).map_err(|e| Error::Storage(e.to_string()))?);
        }
        Ok(ids)
    }

    pub async fn embedding_stats(&self, project: &str) -> Result<EmbeddingStats> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM observations WHERE project = ?1", params![project])
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let total: i64 = rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM embeddings e JOIN observations o ON o.id = e.observation_id WHERE o.project = ?1",
                params![project],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let embedded: i64 = rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);

        Ok(EmbeddingStats { total_observations: total, embedded_observations: embedded, missing_observations: total - embedded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::observations::NewObservation;
    use memory_core::model::Observation;

    async fn seed_observation(store: &Store) -> i64 {
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;
        match store
            .ingest_observation(NewObservation {
                memory_session_id: session_id,
                project: "demo".to_string(),
                r#type: "research".to_string(),
                title: "Obs".to_string(),
                subtitle: None,
                text: "body".to_string(),
                narrative: "narrative".to_string(),
                facts: None,
                concepts: None,
                files_read: vec![],
                files_modified: vec![],
                prompt_number: None,
                created_at_epoch: 1_000,
                content_hash: Observation::compute_content_hash("demo", "research", "Obs", "narrative"),
                auto_category: "research".to_string(),
            })
            .await
            .unwrap()
        {
            crate::store::observations::IngestOutcome::Inserted(obs) => obs.id,
            crate::store::observations::IngestOutcome::Duplicate => panic!("expected a fresh insert"),
        }
    }

    #[tokio::test]
    async fn upsert_then_fetch_round_trips_the_vector() {
        let store = Store::open_in_memory().await.unwrap();
        let id = seed_observation(&store).await;
        store.upsert_embedding(id, "mock-384", 4, &[0.1, 0.2, 0.3, 0.4], 2_000).await.unwrap();

        let fetched = store.get_embedding(id).await.unwrap().unwrap();
        assert_eq!(fetched, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[tokio::test]
    async fn stats_reflect_embedded_vs_missing() {
        let store = Store::open_in_memory().await.unwrap();
        let id = seed_observation(&store).await;

        let before = store.embedding_stats("demo").await.unwrap();
        assert_eq!(before.embedded_observations, 0);
        assert_eq!(before.missing_observations, 1);

        store.upsert_embedding(id, "mock-384", 4, &[0.1, 0.2, 0.3, 0.4], 2_000).await.unwrap();
        let after = store.embedding_stats("demo").await.unwrap();
        assert_eq!(after.embedded_observations, 1);
        assert_eq!(after.missing_observations, 0);
    }

    #[tokio::test]
    async fn missing_embeddings_lists_unembedded_ids() {
        let store = Store::open_in_memory().await.unwrap();
        let id = seed_observation(&store).await;
        let missing = store.observations_missing_embeddings("demo", 10).await.unwrap();
        assert_eq!(missing, vec![id]);
    }
}
