//! Project aliases and plugin-produced external links (§3): auxiliary
//! tables the core never reads from, kept for the UI and for plugins that
//! choose to record an artifact against an observation.

use crate::retry::with_busy_retry;
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{epoch_to_iso8601, ExternalLink, ProjectAlias};

impl Store {
    /// Set (or overwrite) the display name shown for `project_name`.
    pub async fn set_project_alias(&self, project_name: &str, display_name: &str) -> Result<ProjectAlias> {
        let conn = self.connect().await?;
        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO project_alias (project_name, display_name) VALUES (?1, ?2) \
                 ON CONFLICT(project_name) DO UPDATE SET display_name = excluded.display_name",
                params![project_name, display_name],
            )
        })
        .await?;
        Ok(ProjectAlias { project_name: project_name.to_string(), display_name: display_name.to_string() })
    }

    /// Every known project alias, ordered by project name.
    pub async fn list_project_aliases(&self) -> Result<Vec<ProjectAlias>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT project_name, display_name FROM project_alias ORDER BY project_name", ())
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            out.push(ProjectAlias {
                project_name: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
                display_name: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
            });
        }
        Ok(out)
    }

    /// Record a plugin-produced join row connecting `observation_id` to an
    /// external artifact. Not called by the core; a plugin with store
    /// access uses this to publish what it created.
    pub async fn insert_external_link(
        &self,
        observation_id: i64,
        repo: &str,
        artifact_number: Option<i64>,
        action: &str,
        url: &str,
        created_at_epoch: i64,
    ) -> Result<ExternalLink> {
        let conn = self.connect().await?;
        with_busy_retry(|| {
            conn.execute(
                "INSERT INTO external_link (observation_id, repo, artifact_number, action, url, created_at_epoch, created_at_iso) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![observation_id, repo, artifact_number, action, url, created_at_epoch, epoch_to_iso8601(created_at_epoch)],
            )
        })
        .await?;
        let id = conn.last_insert_rowid();
        Ok(ExternalLink {
            id,
            observation_id,
            repo: repo.to_string(),
            artifact_number,
            action: action.to_string(),
            url: url.to_string(),
            created_at_epoch,
            created_at_iso: epoch_to_iso8601(created_at_epoch),
        })
    }

    /// Every external link recorded against `observation_id`, oldest first.
    pub async fn external_links_for_observation(&self, observation_id: i64) -> Result<Vec<ExternalLink>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, observation_id, repo, artifact_number, action, url, created_at_epoch \
                 FROM external_link WHERE observation_id = ?1 ORDER BY created_at_epoch ASC, id ASC",
                params![observation_id],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let created_at_epoch: i64 = row.get(6).map_err(|e| Error::Storage(e.to_string()))?;
            out.push(ExternalLink {
                id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
                observation_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
                repo: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
                artifact_number: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
                action: row.get(4).map_err(|e| Error::Storage(e.to_string()))?,
                url: row.get(5).map_err(|e| Error::Storage(e.to_string()))?,
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
    use crate::store::observations::NewObservation;
    use memory_core::model::Observation;

    #[tokio::test]
    async fn setting_an_alias_twice_overwrites_rather_than_duplicating() {
        let store = Store::open_in_memory().await.unwrap();
        store.set_project_alias("demo", "Demo Project").await.unwrap();
        store.set_project_alias("demo", "Renamed Demo").await.unwrap();

        let aliases = store.list_project_aliases().await.unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].display_name, "Renamed Demo");
    }

    #[tokio::test]
    async fn external_links_are_scoped_to_their_observation() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;
        store
            .ingest_observation(NewObservation {
                memory_session_id: session_id,
                project: "demo".to_string(),
                r#type: "research".to_string(),
                title: "t".to_string(),
                subtitle: None,
                text: "body".to_string(),
                narrative: "narrative".to_string(),
                facts: None,
                concepts: None,
                files_read: vec![],
                files_modified: vec![],
                prompt_number: None,
                created_at_epoch: 1_000,
                content_hash: Observation::compute_content_hash("demo", "research", "t", "narrative"),
                auto_category: "research".to_string(),
            })
            .await
            .unwrap();

        store.insert_external_link(1, "acme/widgets", Some(42), "opened", "https://example.com/acme/widgets/42", 1_500).await.unwrap();

        let links = store.external_links_for_observation(1).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].artifact_number, Some(42));

        let other = store.external_links_for_observation(999).await.unwrap();
        assert!(other.is_empty());
    }
}
