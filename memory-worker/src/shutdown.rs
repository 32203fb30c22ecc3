//! Graceful shutdown (§5): stop accepting connections, close SSE clients,
//! give in-flight requests 5s to drain, then exit, always closing the
//! database and removing the pid/token files on the way out.

use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves on SIGINT or SIGTERM, for use as an axum `with_graceful_shutdown`
/// future.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

/// Drain plugins and clean up on-disk runtime files. Called after axum's
/// graceful-shutdown future has resolved and the listener has stopped
/// accepting new connections; `DRAIN_TIMEOUT` bounds how long we wait for
/// anything still in flight before the process exits anyway.
pub async fn finish(state: Arc<AppState>) {
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, state.plugins.destroy_all()).await;
    cleanup_runtime_files(&state);
    info!("shutdown complete");
}

fn cleanup_runtime_files(state: &AppState) {
    let pid_file = state.config.pid_file();
    if let Err(e) = std::fs::remove_file(&pid_file) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %pid_file.display(), error = %e, "failed to remove pid file");
        }
    }

    let token_file = state.config.token_file();
    if let Err(e) = std::fs::remove_file(&token_file) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %token_file.display(), error = %e, "failed to remove token file");
        }
    }
}
