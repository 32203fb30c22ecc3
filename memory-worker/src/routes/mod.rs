//! Per-resource route modules, nested under `/api` (or bare, for `/health`
//! and `/events`) the way `tombelieber-claude-view`'s `routes/mod.rs`
//! assembles `api_routes`.

pub mod backup;
pub mod checkpoint;
pub mod context;
pub mod embeddings;
pub mod events;
pub mod health;
pub mod import_export;
pub mod knowledge;
pub mod memory;
pub mod notify;
pub mod observations;
pub mod projects;
pub mod report;
pub mod search;
pub mod sessions;
pub mod static_files;
pub mod timeline;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn api_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(search::router())
        .merge(observations::router())
        .merge(timeline::router())
        .merge(context::router())
        .merge(knowledge::router())
        .merge(memory::router())
        .merge(checkpoint::router())
        .merge(sessions::router())
        .merge(projects::router())
        .merge(embeddings::router())
        .merge(report::router())
        .merge(backup::router(state.clone()))
        .merge(import_export::router());

    Router::new()
        .merge(health::router())
        .merge(events::router())
        .merge(notify::router(state.clone()))
        .nest("/api", api)
        .with_state(state)
}
