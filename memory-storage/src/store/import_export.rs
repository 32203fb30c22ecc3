//! Newline-delimited-JSON streaming export and hash-deduplicating import
//! (§4.7 Import/Export).

use crate::store::observations::{row_to_observation, SELECT_OBSERVATION};
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::{Observation, Summary, UserPrompt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const EXPORT_BATCH_SIZE: i64 = 500;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExportCounts {
    pub observations: u64,
    pub summaries: u64,
    pub prompts: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: u64,
    pub skipped: u64,
}

#[derive(Serialize)]
struct ExportMeta {
    version: i64,
    exported_at: i64,
    counts: ExportCounts,
    project: Option<String>,
    type_filter: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
enum ExportRecord<'a> {
    Observation(&'a Observation),
    Summary(&'a Summary),
    Prompt(&'a UserPrompt),
}

#[derive(Deserialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
enum ImportRecord {
    Observation(Observation),
    Summary(Summary),
    Prompt(UserPrompt),
}

impl Store {
    /// Stream every observation/summary/prompt matching the optional
    /// project/type filters to `writer` as NDJSON, a `_meta` header first.
    /// Fetches in batches so a large export never holds the whole result
    /// set in memory.
    pub async fn export_jsonl<W: AsyncWrite + Unpin>(
        &self,
        project: Option<&str>,
        type_filter: Option<&str>,
        now_epoch: i64,
        writer: &mut W,
    ) -> Result<ExportCounts> {
        let counts = self.counts_for_export(project, type_filter).await?;
        let meta = ExportMeta {
            version: crate::schema::CURRENT_SCHEMA_VERSION,
            exported_at: now_epoch,
            counts,
            project: project.map(str::to_string),
            type_filter: type_filter.map(str::to_string),
        };
        write_meta_line(writer, &meta).await?;

        self.export_observations(project, type_filter, writer).await?;
        self.export_summaries(project, writer).await?;
        self.export_prompts(project, writer).await?;

        Ok(counts)
    }

    async fn counts_for_export(&self, project: Option<&str>, type_filter: Option<&str>) -> Result<ExportCounts> {
        let conn = self.connect().await?;

        let mut sql = "SELECT COUNT(*) FROM observations WHERE 1 = 1".to_string();
        let mut args: Vec<libsql::Value> = Vec::new();
        if let Some(project) = project {
            args.push(libsql::Value::Text(project.to_string()));
            sql.push_str(&format!(" AND project = ?{}", args.len()));
        }
        if let Some(type_filter) = type_filter {
            args.push(libsql::Value::Text(type_filter.to_string()));
            sql.push_str(&format!(" AND type = ?{}", args.len()));
        }
        let mut rows = conn.query(&sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;
        let observations: i64 = rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);

        let summaries = self.export_summaries_scope(project).await?.len() as i64;

        let mut prompt_sql = "SELECT COUNT(*) FROM prompts WHERE 1 = 1".to_string();
        let mut prompt_args: Vec<libsql::Value> = Vec::new();
        if let Some(project) = project {
            prompt_args.push(libsql::Value::Text(project.to_string()));
            prompt_sql.push_str(" AND project = ?1");
        }
        let mut prompt_rows = conn.query(&prompt_sql, prompt_args).await.map_err(|e| Error::Storage(e.to_string()))?;
        let prompts: i64 = prompt_rows
            .next()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .map(|row| row.get(0))
            .transpose()
            .map_err(|e| Error::Storage(e.to_string()))?
            .unwrap_or(0);

        Ok(ExportCounts { observations: observations as u64, summaries: summaries as u64, prompts: prompts as u64 })
    }

    async fn export_summaries_scope(&self, project: Option<&str>) -> Result<Vec<Summary>> {
        match project {
            Some(project) => self.recent_summaries(project, i64::MAX).await,
            None => self.all_summaries().await,
        }
    }

    async fn export_observations<W: AsyncWrite + Unpin>(
        &self,
        project: Option<&str>,
        type_filter: Option<&str>,
        writer: &mut W,
    ) -> Result<u64> {
        let conn = self.connect().await?;
        let mut last_id = 0i64;
        let mut total = 0u64;

        loop {
            let mut sql = format!("{SELECT_OBSERVATION} WHERE id > ?1");
            let mut args: Vec<libsql::Value> = vec![libsql::Value::Integer(last_id)];
            if let Some(project) = project {
                args.push(libsql::Value::Text(project.to_string()));
                sql.push_str(&format!(" AND project = ?{}", args.len()));
            }
            if let Some(type_filter) = type_filter {
                args.push(libsql::Value::Text(type_filter.to_string()));
                sql.push_str(&format!(" AND type = ?{}", args.len()));
            }
            sql.push_str(" ORDER BY id ASC LIMIT ?");
            args.push(libsql::Value::Integer(EXPORT_BATCH_SIZE));

            let mut rows = conn.query(&sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;
            let mut batch = Vec::new();
            while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
                batch.push(row_to_observation(&row)?);
            }
            if batch.is_empty() {
                break;
            }
            last_id = batch.last().map(|o| o.id).unwrap_or(last_id);
            total += batch.len() as u64;

            for observation in &batch {
                write_line(writer, &ExportRecord::Observation(observation)).await?;
            }
        }

        Ok(total)
    }

    async fn export_summaries<W: AsyncWrite + Unpin>(&self, project: Option<&str>, writer: &mut W) -> Result<u64> {
        let summaries = self.export_summaries_scope(project).await?;
        for summary in &summaries {
            write_line(writer, &ExportRecord::Summary(summary)).await?;
        }
        Ok(summaries.len() as u64)
    }

    async fn export_prompts<W: AsyncWrite + Unpin>(&self, project: Option<&str>, writer: &mut W) -> Result<u64> {
        let conn = self.connect().await?;
        let mut sql = "SELECT id, content_session_id, project, prompt_number, prompt_text, created_at_epoch FROM prompts".to_string();
        let mut args: Vec<libsql::Value> = Vec::new();
        if let Some(project) = project {
            args.push(libsql::Value::Text(project.to_string()));
            sql.push_str(" WHERE project = ?1");
        }
        sql.push_str(" ORDER BY id ASC");

        let mut rows = conn.query(&sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;
        let mut total = 0u64;
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let created_at_epoch: i64 = row.get(5).map_err(|e| Error::Storage(e.to_string()))?;
            let prompt = UserPrompt {
                id: row.get(0).map_err(|e| Error::Storage(e.to_string()))?,
                content_session_id: row.get(1).map_err(|e| Error::Storage(e.to_string()))?,
                project: row.get(2).map_err(|e| Error::Storage(e.to_string()))?,
                prompt_number: row.get(3).map_err(|e| Error::Storage(e.to_string()))?,
                prompt_text: row.get(4).map_err(|e| Error::Storage(e.to_string()))?,
                created_at_epoch,
                created_at_iso: memory_core::model::epoch_to_iso8601(created_at_epoch),
            };
            write_line(writer, &ExportRecord::Prompt(&prompt)).await?;
            total += 1;
        }
        Ok(total)
    }

    async fn all_summaries(&self) -> Result<Vec<Summary>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT DISTINCT project FROM summaries", ())
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            projects.push(row.get::<String>(0).map_err(|e| Error::Storage(e.to_string()))?);
        }
        let mut all = Vec::new();
        for project in projects {
            all.extend(self.recent_summaries(&project, i64::MAX).await?);
        }
        Ok(all)
    }

    /// Replay an NDJSON export into this store. Observations are
    /// deduplicated against an existing row sharing the same `content_hash`
    /// within the same project (no time window, unlike live ingest — a
    /// replay of the same export is always a duplicate regardless of when
    /// it runs); summaries and prompts are deduplicated by their natural
    /// keys. Skips (rather than errors on) the leading `_meta` line and any
    /// line that fails to parse as a known record shape.
    pub async fn import_jsonl(&self, ndjson: &str) -> Result<ImportStats> {
        let mut stats = ImportStats::default();

        for line in ndjson.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if value.get("_meta").is_some() {
                continue;
            }

            let record: ImportRecord = match serde_json::from_value(value) {
                Ok(r) => r,
                Err(_) => continue,
            };

            match record {
                ImportRecord::Observation(obs) => {
                    if self.observation_exists_by_hash(&obs.project, &obs.content_hash).await? {
                        stats.skipped += 1;
                    } else {
                        self.import_observation_row(&obs).await?;
                        stats.imported += 1;
                    }
                }
                ImportRecord::Summary(summary) => {
                    if self.summary_exists(&summary).await? {
                        stats.skipped += 1;
                    } else {
                        self.insert_summary(&summary).await?;
                        stats.imported += 1;
                    }
                }
                ImportRecord::Prompt(prompt) => {
                    if self.prompt_exists(&prompt).await? {
                        stats.skipped += 1;
                    } else {
                        self.import_prompt_row(&prompt).await?;
                        stats.imported += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    async fn observation_exists_by_hash(&self, project: &str, content_hash: &str) -> Result<bool> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM observations WHERE project = ?1 AND content_hash = ?2 LIMIT 1",
                params![project, content_hash],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(rows.next().await.map_err(|e| Error::Storage(e.to_string()))?.is_some())
    }

    async fn import_observation_row(&self, obs: &Observation) -> Result<()> {
        use crate::store::{encode_string_list};
        use memory_core::model::epoch_to_iso8601;
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO observations \
             (memory_session_id, project, type, title, subtitle, text, narrative, facts, concepts, \
              files_read, files_modified, prompt_number, created_at_epoch, created_at_iso, content_hash, \
              discovery_tokens, last_accessed_epoch, last_accessed_iso, is_stale, auto_category) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                obs.memory_session_id,
                obs.project.clone(),
                obs.r#type.clone(),
                obs.title.clone(),
                obs.subtitle.clone(),
                obs.text.clone(),
                obs.narrative.clone(),
                obs.facts.clone(),
                obs.concepts.clone(),
                encode_string_list(&obs.files_read),
                encode_string_list(&obs.files_modified),
                obs.prompt_number,
                obs.created_at_epoch,
                epoch_to_iso8601(obs.created_at_epoch),
                obs.content_hash.clone(),
                obs.discovery_tokens,
                obs.last_accessed_epoch,
                obs.last_accessed_epoch.map(epoch_to_iso8601),
                obs.is_stale as i64,
                obs.auto_category.clone(),
            ],
        )
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    async fn summary_exists(&self, summary: &Summary) -> Result<bool> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM summaries WHERE session_id = ?1 AND created_at_epoch = ?2 LIMIT 1",
                params![summary.session_id, summary.created_at_epoch],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(rows.next().await.map_err(|e| Error::Storage(e.to_string()))?.is_some())
    }

    async fn prompt_exists(&self, prompt: &UserPrompt) -> Result<bool> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM prompts WHERE content_session_id = ?1 AND prompt_number = ?2 LIMIT 1",
                params![prompt.content_session_id.clone(), prompt.prompt_number],
            )
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(rows.next().await.map_err(|e| Error::Storage(e.to_string()))?.is_some())
    }

    async fn import_prompt_row(&self, prompt: &UserPrompt) -> Result<()> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO prompts (content_session_id, project, prompt_number, prompt_text, created_at_epoch, created_at_iso) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                prompt.content_session_id.clone(),
                prompt.project.clone(),
                prompt.prompt_number,
                prompt.prompt_text.clone(),
                prompt.created_at_epoch,
                memory_core::model::epoch_to_iso8601(prompt.created_at_epoch),
            ],
        )
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, record: &T) -> Result<()> {
    let mut line = serde_json::to_vec(record).map_err(Error::Serialization)?;
    line.push(b'\n');
    writer.write_all(&line).await.map_err(Error::Io)
}

async fn write_meta_line<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, meta: &T) -> Result<()> {
    let mut line = serde_json::to_vec(&serde_json::json!({ "_meta": meta })).map_err(Error::Serialization)?;
    line.push(b'\n');
    writer.write_all(&line).await.map_err(Error::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::observations::NewObservation;

    async fn seed_three(store: &Store) {
        let session_id = store.get_or_create_session("cs-1", "demo", "p", 0).await.unwrap().id;
        for i in 0..3 {
            store
                .ingest_observation(NewObservation {
                    memory_session_id: session_id,
                    project: "demo".to_string(),
                    r#type: "research".to_string(),
                    title: format!("Obs {i}"),
                    subtitle: None,
                    text: "body".to_string(),
                    narrative: format!("narrative {i}"),
                    facts: None,
                    concepts: None,
                    files_read: vec![],
                    files_modified: vec![],
                    prompt_number: None,
                    created_at_epoch: i * 1_000_000,
                    content_hash: Observation::compute_content_hash("demo", "research", &format!("Obs {i}"), &format!("narrative {i}")),
                    auto_category: "research".to_string(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn export_then_import_round_trip_and_reimport_skips_everything() {
        let store = Store::open_in_memory().await.unwrap();
        seed_three(&store).await;

        let mut buf = Vec::new();
        let counts = store.export_jsonl(Some("demo"), None, 5_000_000, &mut buf).await.unwrap();
        assert_eq!(counts.observations, 3);

        let ndjson = String::from_utf8(buf).unwrap();

        let fresh = Store::open_in_memory().await.unwrap();
        let first_import = fresh.import_jsonl(&ndjson).await.unwrap();
        assert_eq!(first_import.imported, 3);
        assert_eq!(first_import.skipped, 0);

        let second_import = fresh.import_jsonl(&ndjson).await.unwrap();
        assert_eq!(second_import.imported, 0);
        assert_eq!(second_import.skipped, 3);
    }
}
