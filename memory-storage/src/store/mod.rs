//! The embedded store, split by concern the way the teacher splits its
//! `storage.rs` into per-table sections.

mod checkpoints;
mod embeddings;
mod import_export;
mod maintenance;
mod observations;
mod projects;
mod prompts;
mod search;
mod sessions;
mod summaries;

pub use embeddings::EmbeddingStats;
pub use import_export::{ExportCounts, ImportStats};
pub use maintenance::{BackupManifest, RetentionCounts, RetentionPolicy};
pub use observations::{DedupOutcome, IngestOutcome, NewObservation};
pub use search::{cursor_for, HybridSearchQuery, SearchHit, SmartContextQuery, SmartContextResult};

use libsql::{Builder, Connection, Database};
use memory_core::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The embedded relational store. Cheap to clone: the inner `Database`
/// handle is reference-counted and each call opens a fresh `Connection`
/// from it, matching libsql's local-file connection model.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (creating if absent) a local database file at `path` and run
    /// any pending schema migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }

        info!(path = %path.display(), "opening store");
        let db = Builder::new_local(path).build().await.map_err(|e| Error::Storage(e.to_string()))?;
        let store = Self { db: Arc::new(db) };

        let conn = store.connect().await?;
        crate::migrate::run(&conn).await?;

        Ok(store)
    }

    /// Open an in-memory database, for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await.map_err(|e| Error::Storage(e.to_string()))?;
        let store = Self { db: Arc::new(db) };
        let conn = store.connect().await?;
        crate::migrate::run(&conn).await?;
        Ok(store)
    }

    pub(crate) async fn connect(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| Error::Storage(e.to_string()))
    }
}

/// Serialize a list of strings to the JSON-array-as-TEXT column
/// representation used throughout this schema.
pub(crate) fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Inverse of [`encode_string_list`]; malformed JSON decodes to an empty
/// list rather than failing the whole row read.
pub(crate) fn decode_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_runs_migrations_without_error() {
        let store = Store::open_in_memory().await.expect("store must open");
        let conn = store.connect().await.expect("must connect");
        let mut rows = conn.query("SELECT version FROM schema_meta WHERE id = 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().expect("schema_meta must have a row");
        let version: i64 = row.get(0).unwrap();
        assert_eq!(version, crate::schema::CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn string_list_round_trips_through_json() {
        let items = vec!["a.rs".to_string(), "b.rs".to_string()];
        let encoded = encode_string_list(&items);
        assert_eq!(decode_string_list(&encoded), items);
    }

    #[test]
    fn malformed_json_decodes_to_an_empty_list() {
        assert!(decode_string_list("not json").is_empty());
    }
}
