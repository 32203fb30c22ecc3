//! Thin HTTP relay to the memory worker (§4, §6). The adapter is stateless:
//! every tool call is one request against the worker's JSON API.

use memory_core::model::{Checkpoint, Observation, Session, Summary};
use memory_storage::store::EmbeddingStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to memory worker failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("memory worker returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
}

pub struct WorkerClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub observations: Vec<Observation>,
    pub summaries: Vec<Summary>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineResponse {
    pub entries: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
pub struct BatchResponse {
    pub observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
pub struct ContextResponse {
    pub observations: Vec<Observation>,
    pub summaries: Vec<Summary>,
    pub tokens_used: i64,
}

#[derive(Debug, Deserialize)]
pub struct HybridHit {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub project: String,
    pub score: f64,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct HybridSearchResponse {
    pub results: Vec<HybridHit>,
}

#[derive(Debug, Deserialize)]
pub struct IngestResponse {
    pub observation: Option<Observation>,
    pub duplicate: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct StoreKnowledgeRequest<'a> {
    pub memory_session_id: i64,
    pub project: &'a str,
    pub knowledge_type: &'a str,
    pub title: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concepts: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Default)]
pub struct SaveMemoryRequest<'a> {
    pub memory_session_id: i64,
    pub project: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<&'a str>,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionRequest<'a> {
    pub content_session_id: &'a str,
    pub project: &'a str,
    pub user_prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CompleteSessionRequest<'a> {
    pub content_session_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CompleteSessionResponse {
    pub session: Session,
    pub summary: Summary,
    pub checkpoint: Checkpoint,
}

impl WorkerClient {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self { http: reqwest::Client::new(), base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        Self::into_json(response).await
    }

    async fn post_json<B: Serialize + Sync, T: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::into_json(response).await
    }

    async fn into_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Status { status, body: format!("unexpected response shape: {e}") })
    }

    pub async fn search(&self, q: Option<&str>, project: Option<&str>, type_filter: Option<&str>, limit: i64) -> Result<SearchResponse, ClientError> {
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(q) = q {
            query.push(("q".to_string(), q.to_string()));
        }
        if let Some(project) = project {
            query.push(("project".to_string(), project.to_string()));
        }
        if let Some(t) = type_filter {
            query.push(("type".to_string(), t.to_string()));
        }
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.clone())).collect();
        self.get_json("/api/search", &query).await
    }

    pub async fn timeline(&self, anchor: i64, depth_before: Option<i64>, depth_after: Option<i64>) -> Result<TimelineResponse, ClientError> {
        let mut query = vec![("anchor".to_string(), anchor.to_string())];
        if let Some(d) = depth_before {
            query.push(("depth_before".to_string(), d.to_string()));
        }
        if let Some(d) = depth_after {
            query.push(("depth_after".to_string(), d.to_string()));
        }
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.clone())).collect();
        self.get_json("/api/timeline", &query).await
    }

    pub async fn get_observations(&self, ids: &[i64]) -> Result<BatchResponse, ClientError> {
        self.post_json("/api/observations/batch", &serde_json::json!({ "ids": ids })).await
    }

    pub async fn get_context(&self, project: &str) -> Result<ContextResponse, ClientError> {
        self.get_json(&format!("/api/context/{project}"), &[]).await
    }

    pub async fn semantic_search(&self, q: &str, project: Option<&str>, limit: i64) -> Result<HybridSearchResponse, ClientError> {
        let mut query = vec![("q".to_string(), q.to_string()), ("limit".to_string(), limit.to_string())];
        if let Some(project) = project {
            query.push(("project".to_string(), project.to_string()));
        }
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.clone())).collect();
        self.get_json("/api/hybrid-search", &query).await
    }

    pub async fn embedding_stats(&self, project: Option<&str>) -> Result<EmbeddingStats, ClientError> {
        let query: Vec<(&str, String)> = project.map(|p| vec![("project".to_string(), p.to_string())]).unwrap_or_default();
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.clone())).collect();
        self.get_json("/api/embeddings/stats", &query).await
    }

    pub async fn store_knowledge(&self, request: &StoreKnowledgeRequest<'_>) -> Result<IngestResponse, ClientError> {
        self.post_json("/api/knowledge", request).await
    }

    pub async fn save_memory(&self, request: &SaveMemoryRequest<'_>) -> Result<IngestResponse, ClientError> {
        self.post_json("/api/memory/save", request).await
    }

    pub async fn latest_checkpoint(&self, project: &str) -> Result<Checkpoint, ClientError> {
        self.get_json("/api/checkpoint", &[("project".to_string(), project.to_string())]).await
    }

    pub async fn start_session(&self, request: &StartSessionRequest<'_>) -> Result<Session, ClientError> {
        self.post_json("/api/sessions", request).await
    }

    pub async fn complete_session(&self, request: &CompleteSessionRequest<'_>) -> Result<CompleteSessionResponse, ClientError> {
        self.post_json("/api/sessions/complete", request).await
    }

    /// The worker already renders this as Markdown (§4.6), so the adapter
    /// relays the text body untouched instead of reparsing and re-rendering it.
    pub async fn report_markdown(&self, project: &str, period: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.url("/api/report"))
            .query(&[("project", project), ("period", period), ("format", "markdown")])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        Ok(body)
    }
}
