//! Immutable worker configuration, loaded once at startup from the
//! environment (§6) plus an optional `settings.json` override for log level
//! and data directory.
//!
//! Per the Design Notes (§9: "config is loaded once at startup into an
//! immutable value; mutations go through a typed settings service with a
//! single-writer discipline"), [`WorkerConfig`] is built once in the
//! composition root and handed down by reference/`Arc`; nothing in the
//! request path re-reads the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recognized log levels (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    #[must_use]
    pub fn as_env_filter_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Silent => "off",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            "SILENT" => Some(Self::Silent),
            _ => None,
        }
    }
}

/// Summary provider selection (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryProviderKind {
    Template,
    Openai,
    Anthropic,
    Ollama,
}

impl SummaryProviderKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "template" => Some(Self::Template),
            "openai" => Some(Self::Openai),
            "anthropic" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// HTTP-backed LLM provider connection settings, used when
/// `SummaryProviderKind` is not `Template`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderSettings {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// The worker's immutable startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_level: LogLevel,
    pub default_project: Option<String>,
    pub context_token_budget: i64,
    pub summary_provider: SummaryProviderKind,
    pub llm_provider_settings: LlmProviderSettings,
}

/// Default smart-context token budget (§4.4).
pub const DEFAULT_CONTEXT_TOKENS: i64 = 2000;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;

impl WorkerConfig {
    /// Build configuration from the process environment, matching the table
    /// in §6. Never panics: every variable falls back to a sensible default
    /// on absence or a parse failure (logged by the caller, not here, to
    /// keep this module free of a tracing dependency on the happy path).
    #[must_use]
    pub fn from_env() -> Self {
        let host = std::env::var("KIRO_MEMORY_WORKER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("KIRO_MEMORY_WORKER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_dir = std::env::var("KIRO_MEMORY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let log_level = std::env::var("KIRO_MEMORY_LOG_LEVEL")
            .ok()
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(LogLevel::Info);
        let default_project = std::env::var("KIRO_MEMORY_PROJECT").ok();
        let context_token_budget = std::env::var("KIRO_MEMORY_CONTEXT_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONTEXT_TOKENS);
        let summary_provider = std::env::var("KIRO_MEMORY_SUMMARY_PROVIDER")
            .ok()
            .and_then(|v| SummaryProviderKind::parse(&v))
            .unwrap_or(SummaryProviderKind::Template);
        let llm_provider_settings = LlmProviderSettings {
            model: std::env::var("KIRO_MEMORY_SUMMARY_MODEL").ok(),
            api_key: std::env::var("KIRO_MEMORY_SUMMARY_API_KEY").ok(),
            base_url: std::env::var("KIRO_MEMORY_SUMMARY_BASE_URL").ok(),
        };

        Self {
            host,
            port,
            data_dir,
            log_level,
            default_project,
            context_token_budget,
            summary_provider,
            llm_provider_settings,
        }
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        let legacy = self.data_dir.join("contextkit.db");
        if legacy.exists() {
            return legacy;
        }
        self.data_dir.join("kiro-memory.db")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.data_dir.join("plugins")
    }

    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("worker.pid")
    }

    #[must_use]
    pub fn token_file(&self) -> PathBuf {
        self.data_dir.join("worker.token")
    }
}

/// Resolve the default data directory: `~/.kiro-memory`, falling back to the
/// legacy `~/.contextkit` if that already exists (§6).
fn default_data_dir() -> PathBuf {
    let home = dirs_home();
    let legacy = home.join(".contextkit");
    if legacy.exists() {
        return legacy;
    }
    home.join(".kiro-memory")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

/// The handful of runtime-mutable settings an operator may change without a
/// restart, behind a single-writer lock (§9 design note). Only log level is
/// exposed today; the surface deliberately stays small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutableSettings {
    pub log_level: LogLevel,
}

/// A single-writer-disciplined settings service: the only place mutable
/// settings may be changed, to avoid the "read config.json, mutate it from
/// inside a route handler" anti-pattern called out in the Design Notes.
#[derive(Debug)]
pub struct SettingsService {
    inner: tokio::sync::RwLock<MutableSettings>,
}

impl SettingsService {
    #[must_use]
    pub fn new(initial: MutableSettings) -> Self {
        Self { inner: tokio::sync::RwLock::new(initial) }
    }

    pub async fn current(&self) -> MutableSettings {
        self.inner.read().await.clone()
    }

    pub async fn set_log_level(&self, level: LogLevel) {
        self.inner.write().await.log_level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_known_values_case_insensitively() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("nonsense"), None);
    }

    #[tokio::test]
    async fn settings_service_applies_updates() {
        let svc = SettingsService::new(MutableSettings { log_level: LogLevel::Info });
        svc.set_log_level(LogLevel::Debug).await;
        assert_eq!(svc.current().await.log_level, LogLevel::Debug);
    }
}
