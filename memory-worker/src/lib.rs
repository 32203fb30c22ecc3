//! The memory worker: HTTP API, SSE hub, scheduler, and plugin host
//! assembled into one axum [`Router`] the way `tombelieber-claude-view`'s
//! `lib.rs` assembles its own `create_app`.

pub mod auth;
pub mod error;
pub mod ingest;
pub mod plugin_host;
pub mod rate_limit;
pub mod routes;
pub mod scheduler;
pub mod shutdown;
pub mod sse;
pub mod state;

use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use rate_limit::RateLimiter;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Only localhost origins may talk to the worker (§4.7): it holds a
/// developer's own session data on their own machine, never a public API.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _parts: &axum::http::request::Parts| {
            origin.to_str().is_ok_and(|origin| {
                origin.starts_with("http://localhost:")
                    || origin.starts_with("http://127.0.0.1:")
                    || origin == "http://localhost"
                    || origin == "http://127.0.0.1"
            })
        }))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full router: `/health` and `/events` unauthenticated, `/api/*`
/// rate-limited at 200 req/min/IP, and an optional static UI fallback for
/// `GET /` (§4.7, §6).
pub fn create_app(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let limiter = Arc::new(RateLimiter::new());

    let api = routes::api_routes(state).layer(middleware::from_fn_with_state(limiter, rate_limit::enforce));

    let mut app = api.layer(CompressionLayer::new()).layer(cors_layer()).layer(TraceLayer::new_for_http());

    if let Some(dir) = static_dir {
        app = routes::static_files::fallback(app, &dir);
    }

    app
}
