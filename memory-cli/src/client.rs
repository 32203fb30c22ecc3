//! HTTP relay to the memory worker, the CLI's only way of talking to
//! storage (§6): a thin wrapper, not a second copy of the storage layer.

use memory_core::model::Observation;
use serde::{Deserialize, Serialize};

/// `memory-storage`'s response shapes, mirrored here rather than imported —
/// the CLI talks to the worker over HTTP only, the same boundary
/// `memory-tool-adapter` draws around its own copies of these types.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupManifest {
    pub filename: String,
    pub created_at_iso: String,
    pub created_at_epoch: i64,
    pub schema_version: i64,
    pub observation_count: i64,
    pub session_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ImportStats {
    pub imported: u64,
    pub skipped: u64,
}

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
    worker_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub connected_clients: usize,
    pub active_plugins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchResponse {
    pub observations: Vec<Observation>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BackupListResponse {
    pub backups: Vec<BackupManifest>,
}

impl WorkerClient {
    #[must_use]
    pub fn new(base_url: String, worker_token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url, worker_token }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn into_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Status { status, body: format!("unexpected response shape: {e}") })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::into_json(response).await
    }

    pub async fn search(&self, q: &str, project: Option<&str>, limit: i64) -> Result<SearchResponse, ClientError> {
        let mut query = vec![("q".to_string(), q.to_string()), ("limit".to_string(), limit.to_string())];
        if let Some(project) = project {
            query.push(("project".to_string(), project.to_string()));
        }
        let response = self.http.get(self.url("/api/search")).query(&query).send().await?;
        Self::into_json(response).await
    }

    pub async fn backup_create(&self) -> Result<BackupManifest, ClientError> {
        let response = self.http.post(self.url("/api/backup/create")).send().await?;
        Self::into_json(response).await
    }

    pub async fn backup_list(&self) -> Result<BackupListResponse, ClientError> {
        let response = self.http.get(self.url("/api/backup/list")).send().await?;
        Self::into_json(response).await
    }

    pub async fn backup_restore(&self, filename: &str) -> Result<(), ClientError> {
        let mut request = self.http.post(self.url("/api/backup/restore")).json(&serde_json::json!({ "filename": filename }));
        if let Some(token) = &self.worker_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ClientError::Status { status, body });
        }
        Ok(())
    }

    pub async fn export_jsonl(&self, project: Option<&str>, type_filter: Option<&str>) -> Result<String, ClientError> {
        let mut query = Vec::new();
        if let Some(project) = project {
            query.push(("project".to_string(), project.to_string()));
        }
        if let Some(t) = type_filter {
            query.push(("type".to_string(), t.to_string()));
        }
        let response = self.http.get(self.url("/api/export/jsonl")).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        Ok(body)
    }

    pub async fn import_jsonl(&self, body: String) -> Result<ImportStats, ClientError> {
        let response = self.http.post(self.url("/api/import/jsonl")).body(body).send().await?;
        Self::into_json(response).await
    }
}
