//! Shared fixtures: sample data builders, a temp-data-dir config, and an
//! in-process worker harness, so every crate's integration tests spin up
//! the same kind of worker instead of each hand-rolling one.

use memory_core::config::{LogLevel, MutableSettings, SettingsService, WorkerConfig};
use memory_core::embeddings::MockEmbeddingProvider;
use memory_core::model::Observation;
use memory_core::summary::TemplateSummaryProvider;
use memory_storage::store::NewObservation;
use memory_storage::Store;
use memory_worker::plugin_host::PluginHost;
use memory_worker::sse::Hub;
use memory_worker::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A fully prepared observation ready for `Store::ingest_observation`, with
/// sensible defaults for every field a test doesn't care about.
#[must_use]
pub fn sample_observation(project: &str, r#type: &str, title: &str, narrative: &str, created_at_epoch: i64) -> NewObservation {
    NewObservation {
        memory_session_id: 1,
        project: project.to_string(),
        r#type: r#type.to_string(),
        title: title.to_string(),
        subtitle: None,
        text: format!("{title}: body text"),
        narrative: narrative.to_string(),
        facts: None,
        concepts: None,
        files_read: Vec::new(),
        files_modified: Vec::new(),
        prompt_number: Some(1),
        created_at_epoch,
        content_hash: Observation::compute_content_hash(project, r#type, title, narrative),
        auto_category: r#type.to_string(),
    }
}

/// Build `count` distinct observations for `project`, five seconds apart
/// starting at `started_at_epoch`, so ordering by creation time is
/// unambiguous in assertions.
#[must_use]
pub fn sample_observations(project: &str, count: usize, started_at_epoch: i64) -> Vec<NewObservation> {
    (0..count)
        .map(|i| {
            let narrative = format!("did thing {i}");
            sample_observation(project, "file-write", &format!("Change {i}"), &narrative, started_at_epoch + i as i64 * 5)
        })
        .collect()
}

/// Open an in-memory store and a session row ready to attach observations
/// to, for tests that only need storage, not the HTTP layer.
pub async fn store_with_session(content_session_id: &str, project: &str) -> anyhow::Result<(Store, memory_core::model::Session)> {
    let store = Store::open_in_memory().await?;
    let session = store.get_or_create_session(content_session_id, project, "do a thing", 0).await?;
    Ok((store, session))
}

/// A `WorkerConfig` rooted at a fresh temp directory, with the HTTP port
/// left at 0 so the OS assigns a free one. The `TempDir` must outlive any
/// use of the returned config; it removes the directory on drop.
#[must_use]
pub fn temp_worker_config() -> (TempDir, WorkerConfig) {
    let dir = tempfile::tempdir().expect("tempdir must be creatable");
    let config = WorkerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: dir.path().to_path_buf(),
        log_level: LogLevel::Info,
        default_project: None,
        context_token_budget: memory_core::config::DEFAULT_CONTEXT_TOKENS,
        summary_provider: memory_core::config::SummaryProviderKind::Template,
        llm_provider_settings: memory_core::config::LlmProviderSettings { model: None, api_key: None, base_url: None },
    };
    (dir, config)
}

/// A running `memory-worker` bound to a loopback port, for tests that
/// exercise the HTTP API (`memory-tool-adapter`'s client, `memory-cli`'s
/// client, and the worker's own route tests). Aborts the server task on
/// drop.
pub struct TestWorker {
    pub base_url: String,
    pub worker_token: String,
    pub state: Arc<AppState>,
    server: JoinHandle<()>,
}

impl Drop for TestWorker {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Build the state and start serving, all in-process: no subprocess, no
/// real database file. `config.data_dir` should point at a `TempDir` kept
/// alive by the caller (see [`temp_worker_config`]).
pub async fn spawn_test_worker(config: WorkerConfig) -> anyhow::Result<TestWorker> {
    let store = Store::open_in_memory().await?;
    let worker_token = "test-worker-token".to_string();

    let state = Arc::new(AppState {
        settings: SettingsService::new(MutableSettings { log_level: config.log_level }),
        store,
        embedding_provider: Arc::new(MockEmbeddingProvider::default()),
        summary_provider: Arc::new(TemplateSummaryProvider),
        hub: Hub::new(),
        plugins: PluginHost::new("test", config.default_project.clone()),
        worker_token: worker_token.clone(),
        started_at: std::time::Instant::now(),
        scheduler_lock: tokio::sync::Mutex::new(()),
        config,
    });

    let app = memory_worker::create_app(state.clone(), None);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{addr}");

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    Ok(TestWorker { base_url, worker_token, state, server })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_with_session_creates_an_active_session() {
        let (_store, session) = store_with_session("sess-1", "demo").await.expect("session must be created");
        assert_eq!(session.project, "demo");
        assert!(!session.is_completed());
    }

    #[tokio::test]
    async fn sample_observations_ingest_without_deduping_each_other() {
        let (store, session) = store_with_session("sess-2", "demo").await.expect("session must be created");
        for mut obs in sample_observations("demo", 3, 1_000) {
            obs.memory_session_id = session.id;
            let outcome = store.ingest_observation(obs).await.expect("ingest must succeed");
            assert!(matches!(outcome, memory_storage::store::IngestOutcome::Inserted(_)));
        }
    }

    #[tokio::test]
    async fn test_worker_answers_health_checks() {
        let (_dir, config) = temp_worker_config();
        let worker = spawn_test_worker(config).await.expect("worker must start");

        let response = reqwest::get(format!("{}/health", worker.base_url)).await.expect("request must succeed");
        assert!(response.status().is_success());
    }
}
