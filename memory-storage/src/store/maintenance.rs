//! Retention sweeps and backup/restore (§4.8): scheduled jobs run these
//! through the store so the scheduler itself stays free of SQL.

use crate::retry::with_busy_retry;
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// `created_at_epoch` is seconds, matching every `.timestamp()` call site
/// that produces it (ingest, scoring, pagination).
const SECS_PER_DAY: i64 = 86_400;

/// `maxAgeDays` per record class; `0` disables deletion for that class
/// (§4.8 defaults: observations 90, summaries 365, prompts 30, knowledge 0).
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub observations_max_age_days: i64,
    pub summaries_max_age_days: i64,
    pub prompts_max_age_days: i64,
    pub knowledge_max_age_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { observations_max_age_days: 90, summaries_max_age_days: 365, prompts_max_age_days: 30, knowledge_max_age_days: 0 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionCounts {
    pub observations_deleted: u64,
    pub summaries_deleted: u64,
    pub prompts_deleted: u64,
    pub knowledge_deleted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub filename: String,
    pub created_at_iso: String,
    pub created_at_epoch: i64,
    pub schema_version: i64,
    pub observation_count: i64,
    pub session_count: i64,
}

fn backup_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^backup-\d{4}-\d{2}-\d{2}-\d{6}(-\d{3})?\.db$").expect("valid regex"))
}

impl Store {
    /// Delete expired rows for each non-exempt record class in one
    /// transaction per class, per §4.8. A `max_age_days` of 0 disables
    /// deletion for that class. Knowledge observations (constraint,
    /// decision, heuristic, rejected) are only deleted when
    /// `knowledge_max_age_days` is non-zero AND `facts.importance < 4`.
    pub async fn run_retention(&self, policy: RetentionPolicy, now_epoch: i64) -> Result<RetentionCounts> {
        let conn = self.connect().await?;
        let mut counts = RetentionCounts::default();

        if policy.observations_max_age_days > 0 {
            let cutoff = now_epoch - policy.observations_max_age_days * SECS_PER_DAY;
            counts.observations_deleted = with_busy_retry(|| {
                conn.execute(
                    "DELETE FROM observations WHERE created_at_epoch < ?1 \
                     AND type NOT IN ('constraint', 'decision', 'heuristic', 'rejected')",
                    params![cutoff],
                )
            })
            .await?;
        }

        if policy.knowledge_max_age_days > 0 {
            let cutoff = now_epoch - policy.knowledge_max_age_days * SECS_PER_DAY;
            counts.knowledge_deleted = with_busy_retry(|| {
                conn.execute(
                    "DELETE FROM observations WHERE created_at_epoch < ?1 \
                     AND type IN ('constraint', 'decision', 'heuristic', 'rejected') \
                     AND COALESCE(CAST(json_extract(facts, '$.importance') AS INTEGER), 0) < 4",
                    params![cutoff],
                )
            })
            .await?;
        }

        if policy.summaries_max_age_days > 0 {
            let cutoff = now_epoch - policy.summaries_max_age_days * SECS_PER_DAY;
            counts.summaries_deleted =
                with_busy_retry(|| conn.execute("DELETE FROM summaries WHERE created_at_epoch < ?1", params![cutoff])).await?;
        }

        if policy.prompts_max_age_days > 0 {
            let cutoff = now_epoch - policy.prompts_max_age_days * SECS_PER_DAY;
            counts.prompts_deleted =
                with_busy_retry(|| conn.execute("DELETE FROM prompts WHERE created_at_epoch < ?1", params![cutoff])).await?;
        }

        info!(
            observations = counts.observations_deleted,
            knowledge = counts.knowledge_deleted,
            summaries = counts.summaries_deleted,
            prompts = counts.prompts_deleted,
            "retention sweep complete"
        );

        Ok(counts)
    }

    /// Snapshot the database to `backups_dir/backup-<timestamp>.db` using
    /// `VACUUM INTO`, SQLite's own consistent-copy mechanism — never a raw
    /// filesystem copy of a live database file — plus a sidecar manifest.
    pub async fn create_backup(&self, backups_dir: impl AsRef<Path>, now_epoch: i64, created_at_iso: &str) -> Result<BackupManifest> {
        let backups_dir = backups_dir.as_ref();
        tokio::fs::create_dir_all(backups_dir).await.map_err(Error::Io)?;

        let filename = format!("backup-{}.db", created_at_iso.replace([':', 'T', 'Z'], "-").trim_end_matches('-'));
        if !backup_filename_pattern().is_match(&filename) {
            return Err(Error::Internal(format!("generated backup filename fails its own pattern: {filename}")));
        }
        let db_path = backups_dir.join(&filename);

        let conn = self.connect().await?;
        let vacuum_sql = format!("VACUUM INTO '{}'", db_path.display());
        conn.execute(&vacuum_sql, ()).await.map_err(|e| Error::Storage(e.to_string()))?;

        let mut obs_rows = conn.query("SELECT COUNT(*) FROM observations", ()).await.map_err(|e| Error::Storage(e.to_string()))?;
        let observation_count: i64 = obs_rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);

        let mut session_rows = conn.query("SELECT COUNT(*) FROM sessions", ()).await.map_err(|e| Error::Storage(e.to_string()))?;
        let session_count: i64 = session_rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);

        let manifest = BackupManifest {
            filename: filename.clone(),
            created_at_iso: created_at_iso.to_string(),
            created_at_epoch: now_epoch,
            schema_version: crate::schema::CURRENT_SCHEMA_VERSION,
            observation_count,
            session_count,
        };

        let manifest_path = backups_dir.join(format!("{filename}.meta.json"));
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(Error::Serialization)?;
        tokio::fs::write(&manifest_path, manifest_json).await.map_err(Error::Io)?;

        info!(filename, "backup created");
        Ok(manifest)
    }

    /// List backups newest-first, reading manifests from `backups_dir`,
    /// skipping any filename that doesn't match the expected pattern.
    pub async fn list_backups(&self, backups_dir: impl AsRef<Path>) -> Result<Vec<BackupManifest>> {
        let backups_dir = backups_dir.as_ref();
        let mut manifests = Vec::new();
        let mut entries = match tokio::fs::read_dir(backups_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(Error::Io)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".meta.json") {
                continue;
            }
            let db_name = name.trim_end_matches(".meta.json");
            if !backup_filename_pattern().is_match(db_name) {
                continue;
            }
            let raw = tokio::fs::read(entry.path()).await.map_err(Error::Io)?;
            if let Ok(manifest) = serde_json::from_slice::<BackupManifest>(&raw) {
                manifests.push(manifest);
            }
        }

        manifests.sort_by(|a, b| b.created_at_epoch.cmp(&a.created_at_epoch));
        Ok(manifests)
    }

    /// Delete all but the `max_keep` most recent backup `.db`/`.meta.json`
    /// pairs (§4.8 rotation).
    pub async fn rotate_backups(&self, backups_dir: impl AsRef<Path>, max_keep: usize) -> Result<u64> {
        let backups_dir = backups_dir.as_ref();
        let manifests = self.list_backups(backups_dir).await?;
        let mut removed = 0u64;

        for manifest in manifests.into_iter().skip(max_keep) {
            let db_path = backups_dir.join(&manifest.filename);
            let meta_path = backups_dir.join(format!("{}.meta.json", manifest.filename));
            let _ = tokio::fs::remove_file(&db_path).await;
            let _ = tokio::fs::remove_file(&meta_path).await;
            removed += 1;
        }

        Ok(removed)
    }

    /// Validate `backup_filename` against the expected pattern and return
    /// its full path under `backups_dir`, refusing traversal attempts.
    pub fn resolve_backup_path(&self, backups_dir: impl AsRef<Path>, backup_filename: &str) -> Result<PathBuf> {
        if !backup_filename_pattern().is_match(backup_filename) {
            return Err(Error::Validation(format!("invalid backup filename: {backup_filename}")));
        }
        Ok(backups_dir.as_ref().join(backup_filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::observations::NewObservation;
    use memory_core::model::Observation;

    #[tokio::test]
    async fn retention_deletes_expired_ordinary_observations_but_not_fresh_ones() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;

        let old_day_ms = 86_400_000i64;
        store
            .ingest_observation(NewObservation {
                memory_session_id: session_id,
                project: "demo".to_string(),
                r#type: "file-write".to_string(),
                title: "Old".to_string(),
                subtitle: None,
                text: "body".to_string(),
                narrative: "narrative".to_string(),
                facts: None,
                concepts: None,
                files_read: vec![],
                files_modified: vec![],
                prompt_number: None,
                created_at_epoch: 0,
                content_hash: Observation::compute_content_hash("demo", "file-write", "Old", "narrative"),
                auto_category: "file_write".to_string(),
            })
            .await
            .unwrap();

        let counts = store.run_retention(RetentionPolicy::default(), old_day_ms * 100).await.unwrap();
        assert_eq!(counts.observations_deleted, 1);
    }

    #[tokio::test]
    async fn retention_exempts_important_knowledge_by_default() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;

        store
            .ingest_observation(NewObservation {
                memory_session_id: session_id,
                project: "demo".to_string(),
                r#type: "decision".to_string(),
                title: "Use esbuild".to_string(),
                subtitle: None,
                text: "body".to_string(),
                narrative: "narrative".to_string(),
                facts: Some(r#"{"importance": 5}"#.to_string()),
                concepts: None,
                files_read: vec![],
                files_modified: vec![],
                prompt_number: None,
                created_at_epoch: 0,
                content_hash: Observation::compute_content_hash("demo", "decision", "Use esbuild", "narrative"),
                auto_category: "decision".to_string(),
            })
            .await
            .unwrap();

        let far_future = 86_400_000i64 * 1000;
        let mut policy = RetentionPolicy::default();
        policy.knowledge_max_age_days = 90;
        let counts = store.run_retention(policy, far_future).await.unwrap();
        assert_eq!(counts.knowledge_deleted, 0);
    }

    #[test]
    fn backup_filename_pattern_accepts_and_rejects_expected_shapes() {
        assert!(backup_filename_pattern().is_match("backup-2026-01-02-030405.db"));
        assert!(backup_filename_pattern().is_match("backup-2026-01-02-030405-123.db"));
        assert!(!backup_filename_pattern().is_match("../../etc/passwd"));
        assert!(!backup_filename_pattern().is_match("backup-2026-01-02.db"));
    }
}
