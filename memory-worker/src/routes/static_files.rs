//! `GET /` and any other unmatched path: serve the bundled UI, with
//! `index.html` as the SPA fallback, the way `tombelieber-claude-view`'s
//! `lib.rs` wires `ServeDir`/`ServeFile` onto the router.

use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

pub fn fallback<S>(router: Router<S>, static_dir: &Path) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let index = static_dir.join("index.html");
    router.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
}
