//! User prompts (§3, §4.1): one row per user turn within a session,
//! numbered sequentially.

use crate::retry::with_busy_retry;
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{epoch_to_iso8601, UserPrompt};

impl Store {
    /// Record a prompt, auto-assigning the next `prompt_number` for
    /// `content_session_id` (1-based).
    pub async fn record_prompt(
        &self,
        content_session_id: &str,
        project: &str,
        prompt_text: &str,
        created_at_epoch: i64,
    ) -> Result<UserPrompt> {
        let conn = self.connect().await?;

        let mut rows = conn
            .query(
                "SELECT COALESCE(MAX(prompt_number), 0) FROM prompts WHERE content_session_id = ?1",
                params![content_session_id],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let last: i64 = rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);
        let prompt_number = last + 1;

        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO prompts (content_session_id, project, prompt_number, prompt_text, created_at_epoch, created_at_iso) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![content_session_id, project, prompt_number, prompt_text, created_at_epoch, epoch_to_iso8601(created_at_epoch)],
            )
        })
        .await?;

        let id = conn.last_insert_rowid();
        Ok(UserPrompt {
            id,
            content_session_id: content_session_id.to_string(),
            project: project.to_string(),
            prompt_number,
            prompt_text: prompt_text.to_string(),
            created_at_epoch,
            created_at_iso: epoch_to_iso8601(created_at_epoch),
        })
    }

    pub async fn prompts_for_session(&self, content_session_id: &str) -> Result<Vec<UserPrompt>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, content_session_id, project, prompt_number, prompt_text, created_at_epoch \
                 FROM prompts WHERE content_session_id = ?1 ORDER BY prompt_number ASC",
                params![content_session_id],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let created_at_epoch: i64 = row.get(5).map_err(|e| Error::Storage(e.to_string()))?;
            out.push(UserPrompt {
                id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
                content_session_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
                project: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
                prompt_number: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
                prompt_text: row.get(4).map_err(|e| Error::Storage(e.to_string()))?,
                created_at_epoch,
                created_at_iso: epoch_to_iso8601(created_at_epoch),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prompt_numbers_increment_per_session() {
        let store = Store::open_in_memory().await.unwrap();
        let first = store.record_prompt("cs-1", "demo", "first prompt", 1_000).await.unwrap();
        let second = store.record_prompt("cs-1", "demo", "second prompt", 2_000).await.unwrap();
        assert_eq!(first.prompt_number, 1);
        assert_eq!(second.prompt_number, 2);
    }

    #[tokio::test]
    async fn prompts_for_session_are_ordered_by_prompt_number() {
        let store = Store::open_in_memory().await.unwrap();
        store.record_prompt("cs-1", "demo", "a", 1_000).await.unwrap();
        store.record_prompt("cs-1", "demo", "b", 2_000).await.unwrap();

        let prompts = store.prompts_for_session("cs-1").await.unwrap();
        assert_eq!(prompts.iter().map(|p| p.prompt_text.clone()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
