//! Forward-only schema migration: apply every statement in
//! [`crate::schema::SCHEMA_V1`] (and any later version block appended here)
//! exactly once, tracked via the single-row `schema_meta` table.

use crate::schema;
use libsql::Connection;
use memory_core::error::{Error, Result};
use tracing::info;

/// Bring `conn`'s schema up to [`schema::CURRENT_SCHEMA_VERSION`], applying
/// whichever version blocks haven't run yet. There is no down-migration:
/// once a version's statements have run, they are never reverted or
/// rewritten, only added to by a later version.
pub async fn run(conn: &Connection) -> Result<()> {
    // schema_meta doesn't exist yet on a fresh database, so this first
    // statement has to run unconditionally before we can read a version.
    conn.execute(schema::CREATE_SCHEMA_META_TABLE, ()).await.map_err(|e| Error::Storage(e.to_string()))?;

    let current_version = read_version(conn).await?;

    if current_version < 1 {
        apply_statements(conn, schema::SCHEMA_V1).await?;
        write_version(conn, 1).await?;
        info!(version = 1, "applied schema migration");
    }

    Ok(())
}

async fn apply_statements(conn: &Connection, statements: &[&str]) -> Result<()> {
    for statement in statements {
        conn.execute_batch(statement).await.map_err(|e| Error::Storage(e.to_string()))?;
    }
    Ok(())
}

async fn read_version(conn: &Connection) -> Result<i64> {
    let mut rows = conn
        .query("SELECT version FROM schema_meta WHERE id = 1", ())
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
    match rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
        Some(row) => row.get::<i64>(0).map_err(|e| Error::Storage(e.to_string())),
        None => Ok(0),
    }
}

async fn write_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (id, version) VALUES (1, ?1) \
         ON CONFLICT(id) DO UPDATE SET version = excluded.version",
        [version],
    )
    .await
    .map_err(|e| Error::Storage(e.to_string()))?;
    Ok(())
}
