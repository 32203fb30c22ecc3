//! Bearer-token auth for administrative routes (§4.7, §7): restore backup,
//! retention overrides, the internal `/notify` trigger.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use memory_core::Error;
use std::sync::Arc;

/// Reject the request unless `Authorization: Bearer <worker_token>` matches
/// the token generated at startup (§4.7).
pub async fn require_worker_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match header {
        Some(token) if token == state.worker_token => Ok(next.run(request).await),
        _ => Err(ApiError(Error::Auth("missing or invalid worker token".to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_host::PluginHost;
    use crate::sse::Hub;
    use memory_core::config::{LogLevel, MutableSettings, SettingsService, WorkerConfig};
    use memory_core::embeddings::MockEmbeddingProvider;
    use memory_core::summary::TemplateSummaryProvider;
    use memory_storage::Store;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::Mutex;

    async fn state_with_token(token: &str) -> Arc<AppState> {
        Arc::new(AppState {
            config: WorkerConfig::from_env(),
            store: Store::open_in_memory().await.unwrap(),
            embedding_provider: Arc::new(MockEmbeddingProvider::default()),
            summary_provider: Arc::new(TemplateSummaryProvider),
            settings: SettingsService::new(MutableSettings { log_level: LogLevel::Info }),
            hub: Hub::new(),
            plugins: PluginHost::new("1.0.0", None),
            worker_token: token.to_string(),
            started_at: Instant::now(),
            scheduler_lock: Mutex::new(()),
        })
    }

    #[tokio::test]
    async fn matching_bearer_token_is_accepted() {
        use axum::body::Body;
        use axum::routing::get;
        use axum::Router;
        use tower::ServiceExt;

        let state = state_with_token("secret-token").await;
        let app = Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(state.clone(), require_worker_token))
            .with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/protected")
                    .header("Authorization", "Bearer secret-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        use axum::body::Body;
        use axum::routing::get;
        use axum::Router;
        use tower::ServiceExt;

        let state = state_with_token("secret-token").await;
        let app = Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(state.clone(), require_worker_token))
            .with_state(state);

        let response =
            app.oneshot(axum::http::Request::builder().uri("/protected").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
