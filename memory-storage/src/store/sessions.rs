//! Session lifecycle (§4.5): `getOrCreate` idempotent on
//! `content_session_id`, `complete` a no-op once already completed.

use crate::retry::with_busy_retry;
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{epoch_to_iso8601, Session, SessionStatus};

impl Store {
    /// Idempotently fetch or create the session for `content_session_id`.
    /// A second call with the same id returns the existing row unchanged,
    /// even if `project`/`user_prompt` differ from the first call.
    pub async fn get_or_create_session(
        &self,
        content_session_id: &str,
        project: &str,
        user_prompt: &str,
        now_epoch: i64,
    ) -> Result<Session> {
        let conn = self.connect().await?;

        if let Some(session) = fetch_by_content_id(&conn, content_session_id).await? {
            return Ok(session);
        }

        let inserted = with_busy_retry(|| {
            conn.execute(
                "INSERT INTO sessions (content_session_id, project, user_prompt, status, started_at_epoch, started_at_iso) \
                 VALUES (?1, ?2, ?3, 'active', ?4, ?5) \
                 ON CONFLICT(content_session_id) DO NOTHING",
                params![content_session_id, project, user_prompt, now_epoch, epoch_to_iso8601(now_epoch)],
            )
        })
        .await?;

        if inserted == 0 {
            // Lost a race with a concurrent ingest creating the same session.
            return fetch_by_content_id(&conn, content_session_id)
                .await?
                .ok_or_else(|| Error::Internal("session vanished after insert race".to_string()));
        }

        fetch_by_content_id(&conn, content_session_id)
            .await?
            .ok_or_else(|| Error::Internal("session not found immediately after insert".to_string()))
    }

    /// Mark a session completed. Calling this on an already-completed
    /// session is a no-op (§4.5: "repeated calls are no-ops").
    pub async fn complete_session(&self, content_session_id: &str, now_epoch: i64) -> Result<Session> {
        let conn = self.connect().await?;
        let session = fetch_by_content_id(&conn, content_session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {content_session_id}")))?;

        if session.is_completed() {
            return Ok(session);
        }

        with_busy_retry(|| {
            conn.execute(
                "UPDATE sessions SET status = 'completed', completed_at_epoch = ?1, completed_at_iso = ?2 WHERE id = ?3",
                params![now_epoch, epoch_to_iso8601(now_epoch), session.id],
            )
        })
        .await?;

        fetch_by_content_id(&conn, content_session_id)
            .await?
            .ok_or_else(|| Error::Internal("session vanished after completion".to_string()))
    }

    pub async fn get_session_by_id(&self, id: i64) -> Result<Option<Session>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, content_session_id, project, user_prompt, status, started_at_epoch, completed_at_epoch \
                 FROM sessions WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_session(&row)?)),
            None => Ok(None),
        }
    }
}

async fn fetch_by_content_id(conn: &libsql::Connection, content_session_id: &str) -> Result<Option<Session>> {
    let mut rows = conn
        .query(
            "SELECT id, content_session_id, project, user_prompt, status, started_at_epoch, completed_at_epoch \
             FROM sessions WHERE content_session_id = ?1",
            params![content_session_id],
        )
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
    match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
        Some(row) => Ok(Some(row_to_session(&row)?)),
        None => Ok(None),
    }
}

fn row_to_session(row: &libsql::Row) -> Result<Session> {
    let status_str: String = row.get(4).map_err(|e| Error::Storage(e.to_string()))?;
    let status = match status_str.as_str() {
        "active" => SessionStatus::Active,
        "completed" => SessionStatus::Completed,
        other => return Err(Error::Internal(format!("unknown session status {other}"))),
    };
    let started_at_epoch: i64 = row.get(5).map_err(|e| Error::Storage(e.to_string()))?;
    let completed_at_epoch: Option<i64> = row.get(6).map_err(|e| Error::Storage(e.to_string()))?;
    Ok(Session {
        id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
        content_session_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
        project: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
        user_prompt: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
        status,
        started_at_epoch,
        started_at_iso: epoch_to_iso8601(started_at_epoch),
        completed_at_epoch,
        completed_at_iso: completed_at_epoch.map(epoch_to_iso8601),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent_on_content_session_id() {
        let store = Store::open_in_memory().await.unwrap();
        let first = store.get_or_create_session("cs-1", "demo", "do a thing", 1000).await.unwrap();
        let second = store.get_or_create_session("cs-1", "other-project", "different prompt", 2000).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.project, "demo");
        assert_eq!(second.started_at_epoch, 1000);
    }

    #[tokio::test]
    async fn complete_is_a_no_op_on_repeated_calls() {
        let store = Store::open_in_memory().await.unwrap();
        store.get_or_create_session("cs-1", "demo", "do a thing", 1000).await.unwrap();
        let first = store.complete_session("cs-1", 5000).await.unwrap();
        let second = store.complete_session("cs-1", 9000).await.unwrap();
        assert_eq!(first.completed_at_epoch, Some(5000));
        assert_eq!(second.completed_at_epoch, Some(5000));
    }
}
