//! Observation ingest and retrieval (§4.1): dedup-check-then-insert,
//! batch fetch, stale marking, consolidation.

use crate::retry::with_busy_retry;
use crate::store::{decode_string_list, encode_string_list, Store};
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{epoch_to_iso8601, Observation};
use std::collections::HashMap;

/// A fully-prepared observation row, post redaction/categorization/hash
/// computation — everything but the row id, which the store assigns.
#[derive(Debug, Clone)]
pub struct NewObservation {
    pub memory_session_id: i64,
    pub project: String,
    pub r#type: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub text: String,
    pub narrative: String,
    pub facts: Option<String>,
    pub concepts: Option<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub prompt_number: Option<i64>,
    pub created_at_epoch: i64,
    pub content_hash: String,
    pub auto_category: String,
}

/// Per-type dedup window, in seconds (§4.1), matching the second-epoch
/// `created_at_epoch` values produced via `chrono::Utc::now().timestamp()`.
fn dedup_window_secs(r#type: &str) -> i64 {
    match r#type {
        "file-read" => 60,
        "file-write" => 10,
        "command" => 30,
        "research" => 120,
        "delegation" => 60,
        _ => 30,
    }
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Inserted(Observation),
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    Unique,
    Duplicate,
}

impl Store {
    /// Dedup-check-then-insert, atomically: look up a same-hash row created
    /// within the type's dedup window; if found, return `Duplicate` without
    /// writing. Otherwise insert and return the new row.
    pub async fn ingest_observation(&self, new: NewObservation) -> Result<IngestOutcome> {
        let conn = self.connect().await?;
        let window = dedup_window_secs(&new.r#type);
        let window_start = new.created_at_epoch - window;

        with_busy_retry(|| conn.execute("BEGIN IMMEDIATE", ())).await?;

        let dedup = check_dedup(&conn, &new.project, &new.content_hash, window_start).await;
        let dedup = match dedup {
            Ok(d) => d,
            Err(err) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                return Err(err);
            }
        };

        if dedup == DedupOutcome::Duplicate {
            conn.execute("ROLLBACK", ()).await.map_err(|e| Error::Storage(e.to_string()))?;
            return Ok(IngestOutcome::Duplicate);
        }

        let discovery_tokens = memory_core::tokens::estimate_tokens(new.title.len() + new.text.len());
        let insert_result = conn
            .execute(
                "INSERT INTO observations \
                 (memory_session_id, project, type, title, subtitle, text, narrative, facts, concepts, \
                  files_read, files_modified, prompt_number, created_at_epoch, created_at_iso, content_hash, \
                  discovery_tokens, is_stale, auto_category) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, 0, ?17)",
                params![
                    new.memory_session_id,
                    new.project.clone(),
                    new.r#type.clone(),
                    new.title.clone(),
                    new.subtitle.clone(),
                    new.text.clone(),
                    new.narrative.clone(),
                    new.facts.clone(),
                    new.concepts.clone(),
                    encode_string_list(&new.files_read),
                    encode_string_list(&new.files_modified),
                    new.prompt_number,
                    new.created_at_epoch,
                    epoch_to_iso8601(new.created_at_epoch),
                    new.content_hash.clone(),
                    discovery_tokens,
                    new.auto_category.clone(),
                ],
            )
            .await;

        if let Err(err) = insert_result {
            let _ = conn.execute("ROLLBACK", ()).await;
            return Err(Error::Storage(err.to_string()));
        }

        let id = conn.last_insert_rowid();
        conn.execute("COMMIT", ()).await.map_err(|e| Error::Storage(e.to_string()))?;

        self.get_observation_by_id(id).await?.map(IngestOutcome::Inserted).ok_or_else(|| {
            Error::Internal("observation vanished immediately after insert".to_string())
        })
    }

    pub async fn get_observation_by_id(&self, id: i64) -> Result<Option<Observation>> {
        let conn = self.connect().await?;
        let mut rows = conn.query(&format!("{SELECT_OBSERVATION} WHERE id = ?1"), params![id])
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            Some(row) => Ok(Some(row_to_observation(&row)?)),
            None => Ok(None),
        }
    }

    /// Batch fetch by id, preserving the order of `ids` in the output
    /// (§4.3). Ids with no matching row are simply absent.
    pub async fn get_observations_by_ids(&self, ids: &[i64]) -> Result<Vec<Observation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect().await?;
        let placeholders = (1..=ids.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(",");
        let sql = format!("{SELECT_OBSERVATION} WHERE id IN ({placeholders})");
        let args: Vec<libsql::Value> = ids.iter().map(|id| libsql::Value::Integer(*id)).collect();
        let mut rows = conn.query(&sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;

        let mut by_id = HashMap::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let obs = row_to_observation(&row)?;
            by_id.insert(obs.id, obs);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Every observation recorded under `memory_session_id`, oldest first
    /// (§4.5: the summary generator walks a session's observations in
    /// recording order).
    pub async fn observations_for_session(&self, memory_session_id: i64) -> Result<Vec<Observation>> {
        let conn = self.connect().await?;
        let sql = format!("{SELECT_OBSERVATION} WHERE memory_session_id = ?1 ORDER BY created_at_epoch ASC, id ASC");
        let mut rows = conn.query(&sql, params![memory_session_id]).await.map_err(|e| Error::Storage(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            out.push(row_to_observation(&row)?);
        }
        Ok(out)
    }

    /// Mark observations stale whose touched files have a newer mtime than
    /// `created_at_epoch` (§4.1). `file_mtimes` maps file path to epoch ms;
    /// files absent from the map are treated as unchanged.
    pub async fn mark_stale_bulk(&self, project: &str, file_mtimes: &HashMap<String, i64>) -> Result<u64> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, files_read, files_modified, created_at_epoch, is_stale FROM observations WHERE project = ?1",
                params![project],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut to_mark = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let id: i64 = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
            let files_read: String = row.get(1).map_err(|e| Error::Storage(e.to_string()))?;
            let files_modified: String = row.get(2).map_err(|e| Error::Storage(e.to_string()))?;
            let created_at_epoch: i64 = row.get(3).map_err(|e| Error::Storage(e.to_string()))?;
            let is_stale: i64 = row.get(4).map_err(|e| Error::Storage(e.to_string()))?;

            if is_stale != 0 {
                continue;
            }

            let touched = decode_string_list(&files_read).into_iter().chain(decode_string_list(&files_modified));
            let became_stale = touched.filter_map(|f| file_mtimes.get(&f)).any(|&mtime| mtime > created_at_epoch);
            if became_stale {
                to_mark.push(id);
            }
        }

        for id in &to_mark {
            with_busy_retry(|| conn.execute("UPDATE observations SET is_stale = 1 WHERE id = ?1", params![*id]))
                .await?;
        }

        Ok(to_mark.len() as u64)
    }

    /// Merge near-duplicate observations within a project, grouped by
    /// `(type, files_modified)` with group size >= `min_group_size`
    /// (default 3, §4.1). `dry_run` reports counts without mutating.
    pub async fn consolidate(&self, project: &str, min_group_size: usize, dry_run: bool) -> Result<(u64, u64)> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, type, title, text, files_modified, created_at_epoch FROM observations \
                 WHERE project = ?1 ORDER BY created_at_epoch DESC, id DESC",
                params![project],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut groups: HashMap<(String, String), Vec<(i64, String, String, i64)>> = HashMap::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let id: i64 = row.get(0).map_err(|e| Error::Storage(e.to_string()))?;
            let r#type: String = row.get(1).map_err(|e| Error::Storage(e.to_string()))?;
            let title: String = row.get(2).map_err(|e| Error::Storage(e.to_string()))?;
            let text: String = row.get(3).map_err(|e| Error::Storage(e.to_string()))?;
            let files_modified: String = row.get(4).map_err(|e| Error::Storage(e.to_string()))?;
            let created_at: i64 = row.get(5).map_err(|e| Error::Storage(e.to_string()))?;
            groups.entry((r#type, files_modified)).or_default().push((id, title, text, created_at));
        }

        let mut merged = 0u64;
        let mut removed = 0u64;

        for members in groups.into_values() {
            if members.len() < min_group_size {
                continue;
            }
            // members[0] is the most recent (query ordered DESC).
            let (keep_id, keep_title, _, _) = &members[0];
            let rest = &members[1..];

            let mut merged_text = members[0].2.clone();
            for (_, _, text, _) in rest {
                merged_text.push_str("\n---\n");
                merged_text.push_str(text);
            }
            merged_text.truncate(merged_text.char_indices().nth(100_000).map_or(merged_text.len(), |(i, _)| i));

            let new_title = format!("[consolidated x{}] {}", members.len(), keep_title);

            merged += 1;
            removed += rest.len() as u64;

            if dry_run {
                continue;
            }

            with_busy_retry(|| {
                conn.execute(
                    "UPDATE observations SET title = ?1, text = ?2 WHERE id = ?3",
                    params![new_title.clone(), merged_text.clone(), *keep_id],
                )
            })
            .await?;

            for (id, _, _, _) in rest {
                with_busy_retry(|| conn.execute("DELETE FROM embeddings WHERE observation_id = ?1", params![*id]))
                    .await?;
                with_busy_retry(|| conn.execute("DELETE FROM observations WHERE id = ?1", params![*id])).await?;
            }
        }

        Ok((merged, removed))
    }
}

async fn check_dedup(
    conn: &libsql::Connection,
    project: &str,
    content_hash: &str,
    window_start: i64,
) -> Result<DedupOutcome> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM observations WHERE project = ?1 AND content_hash = ?2 AND created_at_epoch > ?3 LIMIT 1",
            params![project, content_hash, window_start],
        )
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
    match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
        Some(_) => Ok(DedupOutcome::Duplicate),
        None => Ok(DedupOutcome::Unique),
    }
}

pub(crate) const SELECT_OBSERVATION: &str =
    "SELECT id, memory_session_id, project, type, title, subtitle, text, narrative, \
     facts, concepts, files_read, files_modified, prompt_number, created_at_epoch, content_hash, \
     discovery_tokens, last_accessed_epoch, is_stale, auto_category FROM observations";

pub(crate) fn row_to_observation(row: &libsql::Row) -> Result<Observation> {
    let files_read: String = row.get(10).map_err(|e| Error::Storage(e.to_string()))?;
    let files_modified: String = row.get(11).map_err(|e| Error::Storage(e.to_string()))?;
    let is_stale: i64 = row.get(17).map_err(|e| Error::Storage(e.to_string()))?;

    let created_at_epoch: i64 = row.get(13).map_err(|e| Error::Storage(e.to_string()))?;
    let last_accessed_epoch: Option<i64> = row.get(16).map_err(|e| Error::Storage(e.to_string()))?;

    Ok(Observation {
        id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
        memory_session_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
        project: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
        r#type: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
        title: row.get(4).map_err(|e| Error::Storage(e.to_string()))?,
        subtitle: row.get(5).map_err(|e| Error::Storage(e.to_string()))?,
        text: row.get(6).map_err(|e| Error::Storage(e.to_string()))?,
        narrative: row.get(7).map_err(|e| Error::Storage(e.to_string()))?,
        facts: row.get(8).map_err(|e| Error::Storage(e.to_string()))?,
        concepts: row.get(9).map_err(|e| Error::Storage(e.to_string()))?,
        files_read: decode_string_list(&files_read),
        files_modified: decode_string_list(&files_modified),
        prompt_number: row.get(12).map_err(|e| Error::Storage(e.to_string()))?,
        created_at_epoch,
        created_at_iso: epoch_to_iso8601(created_at_epoch),
        content_hash: row.get(14).map_err(|e| Error::Storage(e.to_string()))?,
        discovery_tokens: row.get(15).map_err(|e| Error::Storage(e.to_string()))?,
        last_accessed_epoch,
        last_accessed_iso: last_accessed_epoch.map(epoch_to_iso8601),
        is_stale: is_stale != 0,
        auto_category: row.get(18).map_err(|e| Error::Storage(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(project: &str, session_id: i64, title: &str, created_at_epoch: i64) -> NewObservation {
        NewObservation {
            memory_session_id: session_id,
            project: project.to_string(),
            r#type: "file-write".to_string(),
            title: title.to_string(),
            subtitle: None,
            text: "diff contents".to_string(),
            narrative: "updated the parser".to_string(),
            facts: None,
            concepts: None,
            files_read: vec![],
            files_modified: vec!["parser.rs".to_string()],
            prompt_number: None,
            created_at_epoch,
            content_hash: Observation::compute_content_hash(project, "file-write", title, "updated the parser"),
            auto_category: "file_write".to_string(),
        }
    }

    async fn seed_session(store: &Store) -> i64 {
        store.get_or_create_session("cs-1", "demo", "do a thing", 0).await.unwrap().id
    }

    #[tokio::test]
    async fn second_ingest_within_the_window_is_a_duplicate() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = seed_session(&store).await;

        let first = store.ingest_observation(sample("demo", session_id, "Edit foo.rs", 1_000)).await.unwrap();
        assert!(matches!(first, IngestOutcome::Inserted(_)));

        // file-write's dedup window is 10 seconds; 5 seconds later is inside it.
        let second = store.ingest_observation(sample("demo", session_id, "Edit foo.rs", 1_005)).await.unwrap();
        assert!(matches!(second, IngestOutcome::Duplicate));
    }

    #[tokio::test]
    async fn ingest_outside_the_window_is_not_a_duplicate() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = seed_session(&store).await;

        store.ingest_observation(sample("demo", session_id, "Edit foo.rs", 1_000)).await.unwrap();
        // file-write's dedup window is 10 seconds; 50 seconds later is well outside it.
        let second = store.ingest_observation(sample("demo", session_id, "Edit foo.rs", 1_050)).await.unwrap();
        assert!(matches!(second, IngestOutcome::Inserted(_)));
    }

    #[tokio::test]
    async fn batch_fetch_preserves_requested_order() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = seed_session(&store).await;

        let a = store.ingest_observation(sample("demo", session_id, "A", 1_000)).await.unwrap();
        let b = store.ingest_observation(sample("demo", session_id, "B", 100_000)).await.unwrap();
        let (IngestOutcome::Inserted(a), IngestOutcome::Inserted(b)) = (a, b) else { panic!("expected inserts") };

        let fetched = store.get_observations_by_ids(&[b.id, a.id]).await.unwrap();
        assert_eq!(fetched.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn observations_for_session_are_scoped_and_ordered_oldest_first() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = seed_session(&store).await;
        let other_session = store.get_or_create_session("cs-2", "demo", "do another thing", 0).await.unwrap().id;

        store.ingest_observation(sample("demo", session_id, "Second", 50_000)).await.unwrap();
        store.ingest_observation(sample("demo", session_id, "First", 1_000)).await.unwrap();
        store.ingest_observation(sample("demo", other_session, "Other session", 1_000)).await.unwrap();

        let observations = store.observations_for_session(session_id).await.unwrap();
        assert_eq!(observations.iter().map(|o| o.title.clone()).collect::<Vec<_>>(), vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn consolidation_merges_groups_at_or_above_the_minimum_size() {
        let store = Store::open_in_memory().await.unwrap();
        let session_id = seed_session(&store).await;

        for (i, t) in [(0, 1_000), (1, 200_000), (2, 400_000)] {
            store.ingest_observation(sample("demo", session_id, &format!("Edit {i}"), t)).await.unwrap();
        }

        let (merged, removed) = store.consolidate("demo", 3, false).await.unwrap();
        assert_eq!(merged, 1);
        assert_eq!(removed, 2);

        let remaining = store.get_observations_by_ids(&(1..=10).collect::<Vec<_>>()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].title.starts_with("[consolidated x3]"));
    }
}
