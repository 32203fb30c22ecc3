//! `POST /api/backup/create`, `GET /api/backup/list`,
//! `POST /api/backup/restore` (§4.8). Restore is a mutating administrative
//! route and requires the worker bearer token (§4.7, §7).

use crate::auth::require_worker_token;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use memory_storage::store::BackupManifest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

async fn create(State(state): State<Arc<AppState>>) -> ApiResult<Json<BackupManifest>> {
    let _guard = state.scheduler_lock.lock().await;
    let now = chrono::Utc::now();
    let backups_dir = state.config.backups_dir();
    tokio::fs::create_dir_all(&backups_dir).await.map_err(|e| memory_core::Error::Io(e.to_string()))?;
    let manifest = state.store.create_backup(&backups_dir, now.timestamp(), &now.to_rfc3339()).await?;
    Ok(Json(manifest))
}

#[derive(Serialize)]
struct ListResponse {
    backups: Vec<BackupManifest>,
}

async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<ListResponse>> {
    let backups = state.store.list_backups(state.config.backups_dir()).await?;
    Ok(Json(ListResponse { backups }))
}

#[derive(Deserialize)]
struct RestoreRequest {
    filename: String,
}

#[derive(Serialize)]
struct RestoreResponse {
    restored_from: String,
}

async fn restore(State(state): State<Arc<AppState>>, Json(request): Json<RestoreRequest>) -> ApiResult<Json<RestoreResponse>> {
    let _guard = state.scheduler_lock.lock().await;
    let path = state.store.resolve_backup_path(&state.config.backups_dir(), &request.filename)?;
    tokio::fs::copy(&path, state.config.db_path()).await.map_err(|e| memory_core::Error::Io(e.to_string()))?;
    Ok(Json(RestoreResponse { restored_from: request.filename }))
}

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let restore_route = Router::new()
        .route("/backup/restore", post(restore))
        .layer(middleware::from_fn_with_state(state, require_worker_token));

    Router::new().route("/backup/create", post(create)).route("/backup/list", get(list)).merge(restore_route)
}
