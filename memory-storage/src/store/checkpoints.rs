//! Checkpoints (§4.5): a resumable pointer snapshotting a project's most
//! recent observations.

use crate::retry::with_busy_retry;
use crate::store::{decode_string_list, encode_string_list, Store};
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{epoch_to_iso8601, Checkpoint, ObservationHeader, CONTEXT_SNAPSHOT_CAP};

impl Store {
    /// Create a checkpoint for `project`, snapshotting up to
    /// [`CONTEXT_SNAPSHOT_CAP`] of its most recent observations.
    pub async fn create_checkpoint(
        &self,
        session_id: i64,
        project: &str,
        task: &str,
        progress: &str,
        next_steps: &[String],
        open_questions: &[String],
        relevant_files: &[String],
        created_at_epoch: i64,
    ) -> Result<Checkpoint> {
        let conn = self.connect().await?;

        let mut rows = conn
            .query(
                "SELECT id, type, title, created_at_epoch FROM observations \
                 WHERE project = ?1 ORDER BY created_at_epoch DESC, id DESC LIMIT ?2",
                params![project, CONTEXT_SNAPSHOT_CAP as i64],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut snapshot = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            snapshot.push(ObservationHeader {
                id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
                r#type: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
                title: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
                created_at_epoch: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
            });
        }

        let snapshot_json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "[]".to_string());

        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO checkpoints \
                 (session_id, project, task, progress, next_steps, open_questions, relevant_files, \
                  context_snapshot, created_at_epoch, created_at_iso) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session_id,
                    project,
                    task,
                    progress,
                    encode_string_list(next_steps),
                    encode_string_list(open_questions),
                    encode_string_list(relevant_files),
                    snapshot_json,
                    created_at_epoch,
                    epoch_to_iso8601(created_at_epoch),
                ],
            )
        })
        .await?;

        let id = conn.last_insert_rowid();
        self.get_checkpoint_by_id(id).await?.ok_or_else(|| Error::Internal("checkpoint vanished after insert".to_string()))
    }

    pub async fn get_checkpoint_by_id(&self, id: i64) -> Result<Option<Checkpoint>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, session_id, project, task, progress, next_steps, open_questions, relevant_files, \
                 context_snapshot, created_at_epoch FROM checkpoints WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_checkpoint(&row)?)),
            None => Ok(None),
        }
    }

    /// The most recent checkpoint for a project, if any (used to resume a
    /// session, §4.5).
    pub async fn latest_checkpoint(&self, project: &str) -> Result<Option<Checkpoint>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, session_id, project, task, progress, next_steps, open_questions, relevant_files, \
                 context_snapshot, created_at_epoch FROM checkpoints \
                 WHERE project = ?1 ORDER BY created_at_epoch DESC, id DESC LIMIT 1",
                params![project],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_checkpoint(&row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_checkpoint(row: &libsql::Row) -> Result<Checkpoint> {
    let next_steps: String = row.get(5).map_err(|e| Error::Storage(e.to_string()))?;
    let open_questions: String = row.get(6).map_err(|e| Error::Storage(e.to_string()))?;
    let relevant_files: String = row.get(7).map_err(|e| Error::Storage(e.to_string()))?;
    let snapshot_json: String = row.get(8).map_err(|e| Error::Storage(e.to_string()))?;
    let context_snapshot: Vec<ObservationHeader> = serde_json::from_str(&snapshot_json).unwrap_or_default();
    let created_at_epoch: i64 = row.get(9).map_err(|e| Error::Storage(e.to_string()))?;

    Ok(Checkpoint {
        id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
        session_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
        project: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
        task: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
        progress: row.get(4).map_err(|e| Error::Storage(e.to_string()))?,
        next_steps: decode_string_list(&next_steps),
        open_questions: decode_string_list(&open_questions),
        relevant_files: decode_string_list(&relevant_files),
        context_snapshot,
        created_at_epoch,
        created_at_iso: epoch_to_iso8601(created_at_epoch),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::observations::NewObservation;
    use memory_core::model::Observation;

    #[tokio::test]
    async fn checkpoint_snapshots_up_to_the_cap_of_recent_observations() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;

        for i in 0..15 {
            store
                .ingest_observation(NewObservation {
                    memory_session_id: session_id,
                    project: "demo".to_string(),
                    r#type: "file-write".to_string(),
                    title: format!("Obs {i}"),
                    subtitle: None,
                    text: "body".to_string(),
                    narrative: "narrative".to_string(),
                    facts: None,
                    concepts: None,
                    files_read: vec![],
                    files_modified: vec![format!("f{i}.rs")],
                    prompt_number: None,
                    created_at_epoch: i * 100_000,
                    content_hash: Observation::compute_content_hash("demo", "file-write", &format!("Obs {i}"), "narrative"),
                    auto_category: "file_write".to_string(),
                })
                .await
                .unwrap();
        }

        let checkpoint = store
            .create_checkpoint(session_id, "demo", "fix the bug", "halfway done", &[], &[], &[], 2_000_000)
            .await
            .unwrap();
        assert_eq!(checkpoint.context_snapshot.len(), CONTEXT_SNAPSHOT_CAP);
        assert_eq!(checkpoint.context_snapshot[0].title, "Obs 14");
    }

    #[tokio::test]
    async fn latest_checkpoint_returns_none_when_there_are_no_checkpoints() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.latest_checkpoint("demo").await.unwrap().is_none());
    }
}
