//! Session summaries (§4.4): one row per completed session, with the
//! five most recent per project available for checkpoint/context assembly.

use crate::retry::with_busy_retry;
use crate::store::{decode_string_list, encode_string_list, Store};
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{epoch_to_iso8601, Summary};

impl Store {
    pub async fn insert_summary(&self, summary: &Summary) -> Result<Summary> {
        let conn = self.connect().await?;
        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO summaries \
                 (session_id, project, request, investigated, learned, completed, next_steps, notes, created_at_epoch, created_at_iso) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    summary.session_id,
                    summary.project.clone(),
                    summary.request.clone(),
                    encode_string_list(&summary.investigated),
                    encode_string_list(&summary.learned),
                    encode_string_list(&summary.completed),
                    encode_string_list(&summary.next_steps),
                    summary.notes.clone(),
                    summary.created_at_epoch,
                    epoch_to_iso8601(summary.created_at_epoch),
                ],
            )
        })
        .await?;

        let id = conn.last_insert_rowid();
        self.get_summary_by_id(id).await?.ok_or_else(|| Error::Internal("summary vanished after insert".to_string()))
    }

    pub async fn get_summary_by_id(&self, id: i64) -> Result<Option<Summary>> {
        let conn = self.connect().await?;
        let mut rows = conn.query(&format!("{SELECT_SUMMARY} WHERE id = ?1"), params![id]).await.map_err(|e| Error::Storage(e.to_string()))?;
        match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_summary(&row)?)),
            None => Ok(None),
        }
    }

    /// The most recent summaries for a project, newest first, capped at
    /// `limit` (§4.4 default 5).
    pub async fn recent_summaries(&self, project: &str, limit: i64) -> Result<Vec<Summary>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                &format!("{SELECT_SUMMARY} WHERE project = ?1 ORDER BY created_at_epoch DESC, id DESC LIMIT ?2"),
                params![project, limit],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            out.push(row_to_summary(&row)?);
        }
        Ok(out)
    }
}

const SELECT_SUMMARY: &str = "SELECT id, session_id, project, request, investigated, learned, completed, \
     next_steps, notes, created_at_epoch FROM summaries";

fn row_to_summary(row: &libsql::Row) -> Result<Summary> {
    let investigated: String = row.get(4).map_err(|e| Error::Storage(e.to_string()))?;
    let learned: String = row.get(5).map_err(|e| Error::Storage(e.to_string()))?;
    let completed: String = row.get(6).map_err(|e| Error::Storage(e.to_string()))?;
    let next_steps: String = row.get(7).map_err(|e| Error::Storage(e.to_string()))?;
    let created_at_epoch: i64 = row.get(9).map_err(|e| Error::Storage(e.to_string()))?;
    Ok(Summary {
        id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
        session_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
        project: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
        request: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
        investigated: decode_string_list(&investigated),
        learned: decode_string_list(&learned),
        completed: decode_string_list(&completed),
        next_steps: decode_string_list(&next_steps),
        notes: row.get(8).map_err(|e| Error::Storage(e.to_string()))?,
        created_at_epoch,
        created_at_iso: epoch_to_iso8601(created_at_epoch),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(session_id: i64, project: &str, created_at_epoch: i64) -> Summary {
        Summary {
            id: 0,
            session_id,
            project: project.to_string(),
            request: "fix the bug".to_string(),
            investigated: vec!["looked at foo.rs".to_string()],
            learned: vec!["the bug was a race".to_string()],
            completed: vec!["fixed it".to_string()],
            next_steps: vec![],
            notes: "15 min, 4 observations".to_string(),
            created_at_epoch,
            created_at_iso: epoch_to_iso8601(created_at_epoch),
        }
    }

    #[tokio::test]
    async fn recent_summaries_are_ordered_newest_first() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;
        store.insert_summary(&sample(session_id, "demo", 1_000)).await.unwrap();
        store.insert_summary(&sample(session_id, "demo", 2_000)).await.unwrap();

        let recent = store.recent_summaries("demo", 5).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].created_at_epoch, 2_000);
    }

    #[tokio::test]
    async fn recent_summaries_respects_the_limit() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;
        for i in 0..8 {
            store.insert_summary(&sample(session_id, "demo", i * 1_000)).await.unwrap();
        }

        let recent = store.recent_summaries("demo", 5).await.unwrap();
        assert_eq!(recent.len(), 5);
    }
}
