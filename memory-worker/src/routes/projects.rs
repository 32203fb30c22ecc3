//! `GET /api/projects/aliases` and `PUT /api/projects/aliases` (§3): the
//! project_name -> display_name mapping the UI uses, not read by the core
//! scoring or retention paths.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use memory_core::model::ProjectAlias;
use serde::Deserialize;
use std::sync::Arc;

async fn list_aliases(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ProjectAlias>>> {
    Ok(Json(state.store.list_project_aliases().await?))
}

#[derive(Deserialize)]
struct SetAliasRequest {
    project_name: String,
    display_name: String,
}

async fn set_alias(State(state): State<Arc<AppState>>, Json(req): Json<SetAliasRequest>) -> ApiResult<Json<ProjectAlias>> {
    Ok(Json(state.store.set_project_alias(&req.project_name, &req.display_name).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/projects/aliases", get(list_aliases).put(set_alias))
}
