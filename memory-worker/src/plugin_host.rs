//! The runtime half of the plugin system (§4.6): discovery, timeout-bounded
//! lifecycle, and concurrent hook dispatch on top of `memory_core::plugin`'s
//! pure state machine.
//!
//! Discovery does not `dlopen` arbitrary shared objects — there is nothing
//! in the corpus that does unsafe dynamic loading, and hand-rolling it here
//! would be exactly the kind of invented, ungrounded API this workspace
//! avoids. Instead a plugin is registered under a name via
//! [`PluginHost::register_factory`] (typically from `main`, for plugins
//! compiled into this binary) and *enabled* by listing that name in
//! `plugins_dir/plugins.toml` or by dropping a `<name>-plugin-<id>/` manifest
//! directory under `plugins_dir` — discovery only decides which registered
//! factories to instantiate, never what code runs.

use memory_core::model::{Observation, Session, Summary};
use memory_core::plugin::{validate_metadata, Plugin, PluginContext, PluginEvent, PluginState, PluginTransition};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{info, warn};

const INIT_TIMEOUT: Duration = Duration::from_secs(5);
const DESTROY_TIMEOUT: Duration = Duration::from_secs(5);
const HOOK_TIMEOUT: Duration = Duration::from_secs(10);

type Factory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

struct Registered {
    plugin: Arc<dyn Plugin>,
    state: PluginState,
    origin: String,
}

/// Config-file shape for `plugins_dir/plugins.toml`.
#[derive(Debug, Deserialize, Default)]
struct PluginsManifest {
    #[serde(default)]
    enabled: Vec<String>,
}

/// Owns every registered plugin's lifecycle state and dispatches hooks to
/// whichever are `Active`.
pub struct PluginHost {
    host_version: String,
    default_project: Option<String>,
    factories: RwLock<HashMap<String, Factory>>,
    active: RwLock<HashMap<String, Registered>>,
}

impl PluginHost {
    #[must_use]
    pub fn new(host_version: impl Into<String>, default_project: Option<String>) -> Self {
        Self {
            host_version: host_version.into(),
            default_project,
            factories: RwLock::new(HashMap::new()),
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory under `name`, available for discovery to enable.
    pub async fn register_factory(&self, name: impl Into<String>, factory: Factory) {
        self.factories.write().await.insert(name.into(), factory);
    }

    /// Read `plugins_dir/plugins.toml` (if present) and any
    /// `*-plugin-*`-named subdirectory, then init every enabled, registered
    /// factory not already active. Plugins failing validation or timing out
    /// are logged and skipped rather than aborting discovery for the rest
    /// (§4.6: one bad plugin must not block the others).
    pub async fn discover_and_init(&self, plugins_dir: &Path) {
        let mut wanted: Vec<String> = Vec::new();

        let manifest_path = plugins_dir.join("plugins.toml");
        if let Ok(raw) = tokio::fs::read_to_string(&manifest_path).await {
            match toml::from_str::<PluginsManifest>(&raw) {
                Ok(manifest) => wanted.extend(manifest.enabled),
                Err(e) => warn!(error = %e, "malformed plugins.toml, ignoring"),
            }
        }

        if let Ok(mut entries) = tokio::fs::read_dir(plugins_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.contains("-plugin-") {
                    wanted.push(name);
                }
            }
        }

        for name in wanted {
            if let Err(e) = self.init_one(&name).await {
                warn!(plugin = %name, error = %e, "plugin init failed, skipping");
            }
        }
    }

    async fn init_one(&self, name: &str) -> anyhow::Result<()> {
        if self.active.read().await.contains_key(name) {
            return Ok(());
        }
        let factory = self.factories.read().await.get(name).cloned();
        let Some(factory) = factory else {
            anyhow::bail!("no factory registered for plugin {name}");
        };
        let plugin = factory();
        self.init_plugin(name.to_string(), plugin).await
    }

    async fn init_plugin(&self, origin: String, plugin: Arc<dyn Plugin>) -> anyhow::Result<()> {
        let metadata = plugin.metadata();
        validate_metadata(&metadata, &self.host_version).map_err(|e| anyhow::anyhow!(e))?;

        let mut state = PluginState::Registered;
        state = state.apply(PluginTransition::StartInit).map_err(|e| anyhow::anyhow!(e))?;

        let ctx = PluginContext { host_version: self.host_version.clone(), default_project: self.default_project.clone() };
        let init_result = timeout(INIT_TIMEOUT, plugin.init(&ctx)).await;

        state = match init_result {
            Ok(Ok(())) => state.apply(PluginTransition::InitSucceeded).map_err(|e| anyhow::anyhow!(e))?,
            Ok(Err(e)) => {
                state.apply(PluginTransition::InitFailed).map_err(|e| anyhow::anyhow!(e))?;
                anyhow::bail!("plugin {} init returned an error: {e}", metadata.name);
            }
            Err(_) => {
                state.apply(PluginTransition::InitFailed).map_err(|e| anyhow::anyhow!(e))?;
                anyhow::bail!("plugin {} init timed out after {INIT_TIMEOUT:?}", metadata.name);
            }
        };

        info!(plugin = %metadata.name, version = %metadata.version, "plugin active");
        self.active.write().await.insert(metadata.name.clone(), Registered { plugin, state, origin });
        Ok(())
    }

    /// Destroy and unregister a single plugin by name, then re-init it from
    /// its recorded origin (hot reload, §4.6).
    pub async fn hot_reload(&self, name: &str) -> anyhow::Result<()> {
        let origin = {
            let mut active = self.active.write().await;
            let Some(entry) = active.remove(name) else {
                anyhow::bail!("plugin {name} is not active");
            };
            self.destroy_one(name, &entry).await;
            entry.origin
        };
        self.init_one(&origin).await
    }

    async fn destroy_one(&self, name: &str, entry: &Registered) {
        let state = entry.state;
        if state.apply(PluginTransition::StartDestroy).is_err() {
            return;
        }
        match timeout(DESTROY_TIMEOUT, entry.plugin.destroy()).await {
            Ok(Ok(())) => info!(plugin = name, "plugin destroyed"),
            Ok(Err(e)) => warn!(plugin = name, error = %e, "plugin destroy returned an error"),
            Err(_) => warn!(plugin = name, "plugin destroy timed out"),
        }
    }

    /// Destroy every active plugin, used at shutdown.
    pub async fn destroy_all(&self) {
        let mut active = self.active.write().await;
        for (name, entry) in active.drain() {
            self.destroy_one(&name, &entry).await;
        }
    }

    /// Dispatch a hook to every active plugin concurrently, each bounded by
    /// [`HOOK_TIMEOUT`] and isolated from the others' failures — equivalent
    /// to `Promise.allSettled`: one plugin's panic-worthy error never stops
    /// the rest from running.
    pub async fn dispatch(&self, event: PluginEvent) {
        let active = self.active.read().await;
        let calls = active.iter().map(|(name, entry)| {
            let plugin = entry.plugin.clone();
            let event = event.clone();
            let name = name.clone();
            async move {
                let fut = async {
                    match &event {
                        PluginEvent::Observation(obs) => plugin.on_observation(obs).await,
                        PluginEvent::Summary(summary) => plugin.on_summary(summary).await,
                        PluginEvent::SessionStart(session) => plugin.on_session_start(session).await,
                        PluginEvent::SessionEnd(session) => plugin.on_session_end(session).await,
                    }
                };
                match timeout(HOOK_TIMEOUT, fut).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(plugin = %name, error = %e, "plugin hook failed"),
                    Err(_) => warn!(plugin = %name, "plugin hook timed out"),
                }
            }
        });
        futures::future::join_all(calls).await;
    }

    pub async fn dispatch_observation(&self, observation: &Observation) {
        self.dispatch(PluginEvent::Observation(observation.clone())).await;
    }

    pub async fn dispatch_session_start(&self, session: &Session) {
        self.dispatch(PluginEvent::SessionStart(session.clone())).await;
    }

    pub async fn dispatch_summary(&self, summary: &Summary) {
        self.dispatch(PluginEvent::Summary(summary.clone())).await;
    }

    pub async fn dispatch_session_end(&self, session: &Session) {
        self.dispatch(PluginEvent::SessionEnd(session.clone())).await;
    }

    /// Names of currently active plugins, for the report/health surface.
    pub async fn active_names(&self) -> Vec<String> {
        self.active.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memory_core::plugin::PluginMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPlugin {
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for CountingPlugin {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata { name: "counter-plugin-test".to_string(), version: "1.0.0".to_string(), min_version: None }
        }
        async fn init(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
            Ok(())
        }
        async fn destroy(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn on_observation(&self, _observation: &Observation) -> anyhow::Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_every_active_plugin() {
        let host = PluginHost::new("1.0.0", None);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_for_factory = hits.clone();
        host.register_factory("counter-plugin-test", Arc::new(move || Arc::new(CountingPlugin { hits: hits_for_factory.clone() }) as Arc<dyn Plugin>))
            .await;
        host.init_one("counter-plugin-test").await.unwrap();

        let obs = sample_observation();
        host.dispatch_observation(&obs).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_host_newer_than_the_plugin_requires_rejects_registration() {
        struct TooNew;
        #[async_trait]
        impl Plugin for TooNew {
            fn metadata(&self) -> PluginMetadata {
                PluginMetadata { name: "future-plugin-x".to_string(), version: "1.0.0".to_string(), min_version: Some("99.0.0".to_string()) }
            }
            async fn init(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
                Ok(())
            }
            async fn destroy(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let host = PluginHost::new("1.0.0", None);
        let result = host.init_plugin("future-plugin-x".to_string(), Arc::new(TooNew)).await;
        assert!(result.is_err());
    }

    fn sample_observation() -> Observation {
        Observation {
            id: 1,
            memory_session_id: 1,
            project: "demo".into(),
            r#type: "research".into(),
            title: "t".into(),
            subtitle: None,
            text: String::new(),
            narrative: String::new(),
            facts: None,
            concepts: None,
            files_read: vec![],
            files_modified: vec![],
            prompt_number: None,
            created_at_epoch: 0,
            created_at_iso: memory_core::model::epoch_to_iso8601(0),
            content_hash: String::new(),
            discovery_tokens: 0,
            last_accessed_epoch: None,
            last_accessed_iso: None,
            is_stale: false,
            auto_category: "research".into(),
        }
    }
}
