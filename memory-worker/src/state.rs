//! Shared application state handed to every route handler via axum's
//! `State` extractor, the way `tombelieber-claude-view`'s server crate
//! threads its own `AppState` through `Router<Arc<AppState>>`.

use crate::plugin_host::PluginHost;
use crate::sse::Hub;
use memory_core::config::{SettingsService, WorkerConfig};
use memory_core::embeddings::EmbeddingProvider;
use memory_core::summary::SummaryProvider;
use memory_storage::Store;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Everything a route handler or background task needs, grouped behind one
/// `Arc` so cloning state for a spawned task is a single refcount bump.
pub struct AppState {
    pub config: WorkerConfig,
    pub store: Store,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub summary_provider: Arc<dyn SummaryProvider>,
    pub settings: SettingsService,
    pub hub: Hub,
    pub plugins: PluginHost,
    /// Bearer token administrative routes require (§7); written to
    /// `worker.token` at startup with file mode `0600`.
    pub worker_token: String,
    pub started_at: Instant,
    /// Serializes the retention and backup jobs against each other and
    /// against any manually-triggered run, so the two never race on the
    /// same database file (§4.8/§4.9).
    pub scheduler_lock: Mutex<()>,
}

impl AppState {
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_core::config::MutableSettings;
    use memory_core::config::LogLevel;
    use memory_core::embeddings::MockEmbeddingProvider;
    use memory_core::summary::TemplateSummaryProvider;

    async fn sample_state() -> AppState {
        let config = WorkerConfig::from_env();
        let store = Store::open_in_memory().await.expect("in-memory store must open");
        AppState {
            config,
            store,
            embedding_provider: Arc::new(MockEmbeddingProvider::default()),
            summary_provider: Arc::new(TemplateSummaryProvider),
            settings: SettingsService::new(MutableSettings { log_level: LogLevel::Info }),
            hub: Hub::new(),
            plugins: PluginHost::new("1.0.0", None),
            worker_token: "test-token".to_string(),
            started_at: Instant::now(),
            scheduler_lock: Mutex::new(()),
        }
    }

    #[tokio::test]
    async fn uptime_starts_near_zero() {
        let state = sample_state().await;
        assert!(state.uptime_secs() < 5);
    }
}
