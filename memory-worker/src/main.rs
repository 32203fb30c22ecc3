//! Composition root: load config, open storage, wire providers, bind the
//! HTTP listener, and run until a shutdown signal arrives (§5, §6).

use memory_core::config::{LogLevel, MutableSettings, SettingsService, SummaryProviderKind, WorkerConfig};
use memory_core::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
use memory_core::summary::{LlmSummaryProvider, SummaryProvider, TemplateSummaryProvider};
use memory_worker::plugin_host::PluginHost;
use memory_worker::sse::Hub;
use memory_worker::state::AppState;
use memory_worker::{create_app, scheduler, shutdown};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EMBEDDING_DIMENSION: usize = 384;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();
    init_tracing(config.log_level);

    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(config.logs_dir())?;
    std::fs::create_dir_all(config.plugins_dir())?;

    let store = memory_storage::Store::open(config.db_path()).await?;

    let summary_provider = build_summary_provider(&config);
    let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(EMBEDDING_DIMENSION));

    let worker_token = generate_worker_token();
    write_runtime_files(&config, &worker_token)?;

    let plugins = PluginHost::new(env!("CARGO_PKG_VERSION"), config.default_project.clone());
    plugins.discover_and_init(&config.plugins_dir()).await;

    let host = config.host.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        settings: SettingsService::new(MutableSettings { log_level: config.log_level }),
        config,
        store,
        embedding_provider,
        summary_provider,
        hub: Hub::new(),
        plugins,
        worker_token,
        started_at: std::time::Instant::now(),
        scheduler_lock: tokio::sync::Mutex::new(()),
    });

    scheduler::spawn(state.clone());

    let app = create_app(state.clone(), None);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "memory-worker listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await?;

    shutdown::finish(state).await;
    Ok(())
}

fn init_tracing(log_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_env_filter_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

fn build_summary_provider(config: &WorkerConfig) -> Arc<dyn SummaryProvider> {
    match config.summary_provider {
        SummaryProviderKind::Template => Arc::new(TemplateSummaryProvider),
        SummaryProviderKind::Openai | SummaryProviderKind::Anthropic | SummaryProviderKind::Ollama => {
            let settings = &config.llm_provider_settings;
            let base_url = settings.base_url.clone().unwrap_or_default();
            let model = settings.model.clone().unwrap_or_default();
            let completion = memory_core::summary::HttpLlmProvider::new(base_url, model, settings.api_key.clone());
            Arc::new(LlmSummaryProvider::new(completion))
        }
    }
}

/// A random, URL-safe worker token (§4.7), regenerated every startup.
fn generate_worker_token() -> String {
    use base64::Engine;
    use rand::Rng;
    let bytes: [u8; 32] = rand::rng().random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(unix)]
fn write_runtime_files(config: &WorkerConfig, worker_token: &str) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(config.pid_file(), std::process::id().to_string())?;
    std::fs::write(config.token_file(), worker_token)?;
    std::fs::set_permissions(config.token_file(), std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn write_runtime_files(config: &WorkerConfig, worker_token: &str) -> anyhow::Result<()> {
    std::fs::write(config.pid_file(), std::process::id().to_string())?;
    std::fs::write(config.token_file(), worker_token)?;
    Ok(())
}
