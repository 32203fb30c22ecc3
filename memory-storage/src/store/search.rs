//! Retrieval core (§4.3, §4.4): keyword search, FTS search, hybrid
//! merge, smart-context assembly, and timeline traversal.

use crate::store::observations::{row_to_observation, SELECT_OBSERVATION};
use crate::store::Store;
use libsql::params;
use memory_core::error::{Error, Result};
use memory_core::model::Observation;
use memory_core::pagination::{decode_cursor, encode_cursor, Cursor};
use memory_core::scoring::{self, Signals, CONTEXT_WEIGHTS, SEARCH_WEIGHTS};
use std::collections::HashMap;

/// `o.`-prefixed column list mirroring [`SELECT_OBSERVATION`]'s column order
/// exactly, for queries that join `observations` under the alias `o` and
/// append further computed columns (`rank`, `vector`) after it — `row_to_observation`
/// relies on those extra columns starting at a fixed index, which `SELECT o.*`
/// would break the moment the table gained columns beyond what it expects.
const FTS_OBSERVATION_COLUMNS: &str = "o.id, o.memory_session_id, o.project, o.type, o.title, o.subtitle, o.text, \
     o.narrative, o.facts, o.concepts, o.files_read, o.files_modified, o.prompt_number, o.created_at_epoch, \
     o.content_hash, o.discovery_tokens, o.last_accessed_epoch, o.is_stale, o.auto_category";

/// Cap on rows considered by [`Store::smart_context`] before scoring and
/// token-budget partitioning (§4.4: "up to 30 recent observations").
const SMART_CONTEXT_CANDIDATE_LIMIT: i64 = 30;

/// A scored hit from a search or smart-context call.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub observation: Observation,
    pub score: f64,
}

/// A hybrid (FTS + optional vector) search request.
#[derive(Debug, Clone, Default)]
pub struct HybridSearchQuery {
    pub project: Option<String>,
    pub type_filter: Option<String>,
    pub text_query: Option<String>,
    pub query_embedding: Option<Vec<f32>>,
    pub now_epoch: i64,
    pub limit: i64,
    pub cursor: Option<String>,
}

/// A request for the smart-context assembly used when no query is given
/// (§4.4): fill a token budget with the project's knowledge-first, then
/// most-recent, observations.
#[derive(Debug, Clone)]
pub struct SmartContextQuery {
    pub project: String,
    pub now_epoch: i64,
    pub token_budget: i64,
}

#[derive(Debug, Clone)]
pub struct SmartContextResult {
    pub hits: Vec<SearchHit>,
    pub total_tokens: i64,
}

impl Store {
    /// Escaped substring match over title/text/narrative, with optional
    /// project/type filters and keyset pagination.
    pub async fn keyword_search(
        &self,
        project: Option<&str>,
        type_filter: Option<&str>,
        query: &str,
        limit: i64,
        cursor: Option<&str>,
    ) -> Result<Vec<Observation>> {
        let conn = self.connect().await?;
        let escaped = escape_like(query);
        let pattern = format!("%{escaped}%");
        let cursor = cursor.and_then(decode_cursor);

        let mut sql = format!("{SELECT_OBSERVATION} WHERE (title LIKE ?1 ESCAPE '\\' OR text LIKE ?1 ESCAPE '\\' OR narrative LIKE ?1 ESCAPE '\\')");
        let mut args: Vec<libsql::Value> = vec![libsql::Value::Text(pattern)];
        push_filters(&mut sql, &mut args, project, type_filter, cursor.as_ref());
        sql.push_str(" ORDER BY created_at_epoch DESC, id DESC LIMIT ?");
        args.push(libsql::Value::Integer(limit));

        run_observation_query(&conn, &sql, args).await
    }

    /// Full-text search via the `observations_fts` virtual table, ranked by
    /// `bm25()`, with the same project/type filters and pagination.
    pub async fn fts_search(
        &self,
        project: Option<&str>,
        type_filter: Option<&str>,
        query: &str,
        limit: i64,
        cursor: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let conn = self.connect().await?;
        let cursor = cursor.and_then(decode_cursor);

        let mut sql = format!(
            "SELECT {FTS_OBSERVATION_COLUMNS}, bm25(observations_fts) AS rank FROM observations_fts \
             JOIN observations o ON o.id = observations_fts.observation_id \
             WHERE observations_fts MATCH ?1"
        );
        let mut args: Vec<libsql::Value> = vec![libsql::Value::Text(query.to_string())];
        push_filters_prefixed(&mut sql, &mut args, "o", project, type_filter, cursor.as_ref());
        sql.push_str(" ORDER BY o.created_at_epoch DESC, o.id DESC LIMIT ?");
        args.push(libsql::Value::Integer(limit));

        let mut rows = conn.query(&sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let observation = row_to_observation(&row)?;
            let rank: f64 = row.get(19).map_err(|e| Error::Storage(e.to_string()))?;
            let signals = Signals {
                recency: scoring::recency_score(chrono::Utc::now().timestamp(), observation.created_at_epoch),
                project_match: scoring::project_match_score(&observation.project, project),
                fts: scoring::fts_score(rank),
                semantic: 0.0,
            };
            let score = scoring::composite_score(signals, SEARCH_WEIGHTS, observation.knowledge_type());
            hits.push(SearchHit { observation, score });
        }
        Ok(hits)
    }

    /// Merge FTS and (optional) vector similarity results by observation id,
    /// keeping the higher of the two scores per id (§4.4).
    pub async fn hybrid_search(&self, query: HybridSearchQuery) -> Result<Vec<SearchHit>> {
        let mut by_id: HashMap<i64, SearchHit> = HashMap::new();

        if let Some(text) = query.text_query.as_deref().filter(|t| !t.is_empty()) {
            let fts_hits = self
                .fts_search(query.project.as_deref(), query.type_filter.as_deref(), text, query.limit.max(50), None)
                .await?;
            for hit in fts_hits {
                by_id.entry(hit.observation.id).and_modify(|existing| existing.score = existing.score.max(hit.score)).or_insert(hit);
            }
        }

        if let Some(embedding) = query.query_embedding.as_deref() {
            let vector_hits = self.vector_search(query.project.as_deref(), embedding, query.limit.max(50)).await?;
            for hit in vector_hits {
                by_id.entry(hit.observation.id).and_modify(|existing| existing.score = existing.score.max(hit.score)).or_insert(hit);
            }
        }

        let mut hits: Vec<SearchHit> = by_id.into_values().collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(query.limit.max(0) as usize);
        Ok(hits)
    }

    async fn vector_search(&self, project: Option<&str>, query_embedding: &[f32], limit: i64) -> Result<Vec<SearchHit>> {
        let conn = self.connect().await?;
        let mut sql =
            format!("SELECT {FTS_OBSERVATION_COLUMNS}, e.vector FROM embeddings e JOIN observations o ON o.id = e.observation_id");
        let mut args: Vec<libsql::Value> = Vec::new();
        if let Some(project) = project {
            sql.push_str(" WHERE o.project = ?1");
            args.push(libsql::Value::Text(project.to_string()));
        }

        let mut rows = conn.query(&sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            let observation = row_to_observation(&row)?;
            let raw: Vec<u8> = row.get(19).map_err(|e| Error::Storage(e.to_string()))?;
            let vector: Vec<f32> = postcard::from_bytes(&raw).unwrap_or_default();
            let cosine = memory_core::embeddings::cosine_similarity(query_embedding, &vector);
            let signals = Signals {
                recency: scoring::recency_score(chrono::Utc::now().timestamp(), observation.created_at_epoch),
                project_match: scoring::project_match_score(&observation.project, project),
                fts: 0.0,
                semantic: scoring::semantic_score(cosine as f64),
            };
            let score = scoring::composite_score(signals, SEARCH_WEIGHTS, observation.knowledge_type());
            hits.push(SearchHit { observation, score });
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    /// Assemble context for a project with no query: knowledge observations
    /// first (by knowledge-type boost then recency), then ordinary
    /// observations by recency, greedily filling `token_budget` (§4.4).
    pub async fn smart_context(&self, query: SmartContextQuery) -> Result<SmartContextResult> {
        let conn = self.connect().await?;
        let sql = format!("{SELECT_OBSERVATION} WHERE project = ?1 ORDER BY created_at_epoch DESC, id DESC LIMIT ?2");
        let mut rows = conn
            .query(&sql, params![query.project.clone(), SMART_CONTEXT_CANDIDATE_LIMIT])
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut all = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            all.push(row_to_observation(&row)?);
        }

        let mut scored: Vec<SearchHit> = all
            .into_iter()
            .map(|observation| {
                let signals = Signals {
                    recency: scoring::recency_score(query.now_epoch, observation.created_at_epoch),
                    project_match: 1.0,
                    fts: 0.0,
                    semantic: 0.0,
                };
                let score = scoring::composite_score(signals, CONTEXT_WEIGHTS, observation.knowledge_type());
                SearchHit { observation, score }
            })
            .collect();

        // Knowledge observations first (the boost already weighted into
        // `score`, but break ties so ordinary observations never displace
        // knowledge at the same score), then by descending score.
        scored.sort_by(|a, b| {
            b.observation
                .is_knowledge()
                .cmp(&a.observation.is_knowledge())
                .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut hits = Vec::new();
        let mut total_tokens = 0i64;
        for hit in scored {
            let tokens = hit.observation.approx_tokens();
            if total_tokens + tokens > query.token_budget {
                break;
            }
            total_tokens += tokens;
            hits.push(hit);
        }

        Ok(SmartContextResult { hits, total_tokens })
    }

    /// Observations within `depth_before`/`depth_after` positions of
    /// `anchor_id` in the same project's creation order (§4.3).
    pub async fn timeline(&self, anchor_id: i64, depth_before: i64, depth_after: i64) -> Result<Vec<Observation>> {
        let anchor = self
            .get_observation_by_id(anchor_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("observation {anchor_id}")))?;

        let conn = self.connect().await?;

        let before_sql = format!(
            "{SELECT_OBSERVATION} WHERE project = ?1 AND (created_at_epoch, id) < (?2, ?3) \
             ORDER BY created_at_epoch DESC, id DESC LIMIT ?4"
        );
        let mut before_rows = conn
            .query(&before_sql, params![anchor.project.clone(), anchor.created_at_epoch, anchor.id, depth_before])
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut before = Vec::new();
        while let Some(row) = before_rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            before.push(row_to_observation(&row)?);
        }
        before.reverse();

        let after_sql = format!(
            "{SELECT_OBSERVATION} WHERE project = ?1 AND (created_at_epoch, id) > (?2, ?3) \
             ORDER BY created_at_epoch ASC, id ASC LIMIT ?4"
        );
        let mut after_rows = conn
            .query(&after_sql, params![anchor.project.clone(), anchor.created_at_epoch, anchor.id, depth_after])
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut after = Vec::new();
        while let Some(row) = after_rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
            after.push(row_to_observation(&row)?);
        }

        let mut result = before;
        result.push(anchor);
        result.extend(after);
        Ok(result)
    }
}

/// Escape `%`, `_`, and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn push_filters(
    sql: &mut String,
    args: &mut Vec<libsql::Value>,
    project: Option<&str>,
    type_filter: Option<&str>,
    cursor: Option<&Cursor>,
) {
    push_filters_prefixed(sql, args, "", project, type_filter, cursor);
}

fn push_filters_prefixed(
    sql: &mut String,
    args: &mut Vec<libsql::Value>,
    alias: &str,
    project: Option<&str>,
    type_filter: Option<&str>,
    cursor: Option<&Cursor>,
) {
    let col = |name: &str| if alias.is_empty() { name.to_string() } else { format!("{alias}.{name}") };
    if let Some(project) = project {
        sql.push_str(&format!(" AND {} = ?{}", col("project"), args.len() + 1));
        args.push(libsql::Value::Text(project.to_string()));
    }
    if let Some(type_filter) = type_filter {
        sql.push_str(&format!(" AND {} = ?{}", col("type"), args.len() + 1));
        args.push(libsql::Value::Text(type_filter.to_string()));
    }
    if let Some(cursor) = cursor {
        sql.push_str(&format!(
            " AND ({}, {}) < (?{}, ?{})",
            col("created_at_epoch"),
            col("id"),
            args.len() + 1,
            args.len() + 2
        ));
        args.push(libsql::Value::Integer(cursor.epoch));
        args.push(libsql::Value::Integer(cursor.id));
    }
}

async fn run_observation_query(conn: &libsql::Connection, sql: &str, args: Vec<libsql::Value>) -> Result<Vec<Observation>> {
    let mut rows = conn.query(sql, args).await.map_err(|e| Error::Storage(e.to_string()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().await.map_err(|e| Error::Storage(e.to_string()))? {
        out.push(row_to_observation(&row)?);
    }
    Ok(out)
}

/// Build a keyset cursor for the last observation in a page, for callers
/// that want to hand the client a `next_cursor`.
#[must_use]
pub fn cursor_for(observation: &Observation) -> String {
    encode_cursor(observation.id, observation.created_at_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::observations::NewObservation;

    async fn seed(store: &Store, title: &str, text: &str, created_at_epoch: i64) {
        let session_id = store.get_or_create_session("cs-1", "demo", "prompt", 0).await.unwrap().id;
        store
            .ingest_observation(NewObservation {
                memory_session_id: session_id,
                project: "demo".to_string(),
                r#type: "research".to_string(),
                title: title.to_string(),
                subtitle: None,
                text: text.to_string(),
                narrative: "narrative".to_string(),
                facts: None,
                concepts: None,
                files_read: vec![],
                files_modified: vec![],
                prompt_number: None,
                created_at_epoch,
                content_hash: Observation::compute_content_hash("demo", "research", title, "narrative"),
                auto_category: "research".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn keyword_search_matches_substrings_case_sensitively() {
        let store = Store::open_in_memory().await.unwrap();
        seed(&store, "Investigate esbuild config", "body one", 1_000).await;
        seed(&store, "Unrelated", "body two", 2_000).await;

        let hits = store.keyword_search(Some("demo"), None, "esbuild", 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Investigate esbuild config");
    }

    #[tokio::test]
    async fn fts_search_finds_stemmed_matches() {
        let store = Store::open_in_memory().await.unwrap();
        seed(&store, "Investigating parsers", "parsing logic details", 1_000).await;

        let hits = store.fts_search(Some("demo"), None, "parser", 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn smart_context_respects_the_token_budget() {
        let store = Store::open_in_memory().await.unwrap();
        for i in 0..20 {
            seed(&store, &format!("Obs {i}"), &"x".repeat(400), (i as i64) * 1_000).await;
        }

        let result = store
            .smart_context(SmartContextQuery { project: "demo".to_string(), now_epoch: 20_000, token_budget: 500 })
            .await
            .unwrap();
        assert!(result.total_tokens <= 500);
        assert!(!result.hits.is_empty());
    }

    #[tokio::test]
    async fn timeline_returns_anchor_with_surrounding_window() {
        let store = Store::open_in_memory().await.unwrap();
        for i in 0..5 {
            seed(&store, &format!("Obs {i}"), "body", (i as i64) * 1_000).await;
        }

        let all = store.get_observations_by_ids(&(1..=5).collect::<Vec<_>>()).await.unwrap();
        let anchor = all.iter().find(|o| o.title == "Obs 2").unwrap();

        let window = store.timeline(anchor.id, 1, 1).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[1].id, anchor.id);
    }
}
