//! The plugin contract and its per-plugin lifecycle state machine (§4.6).
//!
//! This module defines the pure contract: the `Plugin` trait, the hook
//! event payloads, metadata validation, and the state machine's transition
//! rules. Discovery, timeout enforcement, and concurrent hook dispatch are
//! runtime concerns that belong to the worker's `PluginHost`; this module
//! only guarantees that an *invalid* transition can never be constructed.

use crate::model::{Observation, Session, Summary};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity and compatibility metadata a plugin declares at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub min_version: Option<String>,
}

/// The narrow event record each hook receives (§4.6).
#[derive(Debug, Clone)]
pub enum PluginEvent {
    Observation(Observation),
    Summary(Summary),
    SessionStart(Session),
    SessionEnd(Session),
}

/// A plugin: a unique name/version, an init/destroy lifecycle, and a set of
/// optional hooks. Every method but `metadata` has a no-op default so a
/// plugin only needs to implement the hooks it cares about.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    async fn init(&self, ctx: &PluginContext) -> anyhow::Result<()>;

    async fn destroy(&self) -> anyhow::Result<()>;

    async fn on_observation(&self, _observation: &Observation) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_summary(&self, _summary: &Summary) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_session_start(&self, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_session_end(&self, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Context handed to a plugin's `init`. Kept intentionally small: the
/// host's own version string, used for the `minVersion` check, plus the
/// project the host is currently serving (plugins are host-wide, not
/// project-scoped, but often want the default for logging).
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub host_version: String,
    pub default_project: Option<String>,
}

/// Reject plugins missing a name or version, or requiring a host newer than
/// `host_version`.
pub fn validate_metadata(metadata: &PluginMetadata, host_version: &str) -> Result<(), String> {
    if metadata.name.trim().is_empty() {
        return Err("plugin name must not be empty".to_string());
    }
    if metadata.version.trim().is_empty() {
        return Err("plugin version must not be empty".to_string());
    }
    if let Some(min_version) = &metadata.min_version {
        let (host, min) = (parse_version(host_version), parse_version(min_version));
        match (host, min) {
            (Some(host), Some(min)) if host < min => {
                return Err(format!(
                    "plugin {} requires host >= {min_version}, running {host_version}",
                    metadata.name
                ));
            }
            (None, _) | (_, None) => {
                return Err(format!("unparseable version: host={host_version} min={min_version}"));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Parse a `major.minor.patch` string into a comparable tuple. Anything
/// else (missing a segment, non-numeric) fails to parse.
fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let mut parts = raw.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// States a registered plugin moves through (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Registered,
    Initializing,
    Active,
    Destroying,
    Destroyed,
    Error,
}

/// The events that drive a plugin's state transitions. Every transition not
/// covered by [`PluginState::apply`] is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginTransition {
    StartInit,
    InitSucceeded,
    InitFailed,
    StartDestroy,
    DestroySucceeded,
    DestroyFailed,
}

impl PluginState {
    /// Apply a transition, returning the new state or an error describing
    /// why the transition is invalid from the current state. The error
    /// state is reachable only from `Initializing`/`Destroying` on failure,
    /// and a plugin may be retried for destruction (hot reload: destroy →
    /// unregister → re-init) from either `Active` or `Error`.
    pub fn apply(self, transition: PluginTransition) -> Result<Self, String> {
        use PluginState::{Active, Destroyed, Destroying, Error, Initializing, Registered};
        use PluginTransition::{DestroyFailed, DestroySucceeded, InitFailed, InitSucceeded, StartDestroy, StartInit};

        match (self, transition) {
            (Registered, StartInit) => Ok(Initializing),
            (Initializing, InitSucceeded) => Ok(Active),
            (Initializing, InitFailed) => Ok(Error),
            (Active, StartDestroy) | (Error, StartDestroy) => Ok(Destroying),
            (Destroying, DestroySucceeded) => Ok(Destroyed),
            (Destroying, DestroyFailed) => Ok(Error),
            (from, event) => Err(format!("invalid plugin transition {event:?} from {from:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_active_then_destroyed() {
        let state = PluginState::Registered;
        let state = state.apply(PluginTransition::StartInit).unwrap();
        assert_eq!(state, PluginState::Initializing);
        let state = state.apply(PluginTransition::InitSucceeded).unwrap();
        assert_eq!(state, PluginState::Active);
        let state = state.apply(PluginTransition::StartDestroy).unwrap();
        assert_eq!(state, PluginState::Destroying);
        let state = state.apply(PluginTransition::DestroySucceeded).unwrap();
        assert_eq!(state, PluginState::Destroyed);
    }

    #[test]
    fn init_failure_lands_in_error() {
        let state = PluginState::Registered.apply(PluginTransition::StartInit).unwrap();
        let state = state.apply(PluginTransition::InitFailed).unwrap();
        assert_eq!(state, PluginState::Error);
    }

    #[test]
    fn errored_plugin_can_be_destroyed_for_hot_reload() {
        let state = PluginState::Error;
        let state = state.apply(PluginTransition::StartDestroy).unwrap();
        assert_eq!(state, PluginState::Destroying);
    }

    #[test]
    fn destroyed_plugin_rejects_further_transitions() {
        let state = PluginState::Destroyed;
        assert!(state.apply(PluginTransition::StartInit).is_err());
    }

    #[test]
    fn metadata_requires_a_name_and_version() {
        let metadata = PluginMetadata { name: String::new(), version: "1.0.0".into(), min_version: None };
        assert!(validate_metadata(&metadata, "1.0.0").is_err());
    }

    #[test]
    fn metadata_rejects_a_host_older_than_min_version() {
        let metadata =
            PluginMetadata { name: "demo".into(), version: "1.0.0".into(), min_version: Some("2.0.0".into()) };
        assert!(validate_metadata(&metadata, "1.5.0").is_err());
        assert!(validate_metadata(&metadata, "2.0.0").is_ok());
        assert!(validate_metadata(&metadata, "2.1.0").is_ok());
    }
}
