//! Background retention and backup jobs (§4.8, §4.9, §5), spawned the way
//! `tombelieber-claude-view`'s server spawns its pricing refresh loop: an
//! initial run, then a fixed `tokio::time::interval` forever.
//!
//! Retention and backup never run concurrently with each other or with a
//! manually triggered run — both take `state.scheduler_lock` for the
//! duration of the job.

use crate::state::AppState;
use memory_storage::store::RetentionPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const RETENTION_FIRST_RUN_DELAY: Duration = Duration::from_secs(30);
const BACKUP_FIRST_RUN_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_BACKUP_KEEP: usize = 14;

/// Spawn the retention and backup loops on the current runtime.
pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(retention_loop(state.clone()));
    tokio::spawn(backup_loop(state));
}

async fn retention_loop(state: Arc<AppState>) {
    tokio::time::sleep(RETENTION_FIRST_RUN_DELAY).await;
    let mut interval = tokio::time::interval(DEFAULT_INTERVAL);
    loop {
        run_retention_once(&state).await;
        interval.tick().await;
    }
}

async fn backup_loop(state: Arc<AppState>) {
    tokio::time::sleep(BACKUP_FIRST_RUN_DELAY).await;
    let mut interval = tokio::time::interval(DEFAULT_INTERVAL);
    loop {
        run_backup_once(&state).await;
        interval.tick().await;
    }
}

async fn run_retention_once(state: &Arc<AppState>) {
    let _guard = state.scheduler_lock.lock().await;
    let now_epoch = chrono::Utc::now().timestamp();
    match state.store.run_retention(RetentionPolicy::default(), now_epoch).await {
        Ok(counts) => info!(?counts, "retention run complete"),
        Err(e) => warn!(error = %e, "retention run failed"),
    }
}

async fn run_backup_once(state: &Arc<AppState>) {
    let _guard = state.scheduler_lock.lock().await;
    let now = chrono::Utc::now();
    let backups_dir = state.config.backups_dir();
    if let Err(e) = tokio::fs::create_dir_all(&backups_dir).await {
        warn!(error = %e, "could not create backups dir");
        return;
    }
    match state.store.create_backup(&backups_dir, now.timestamp(), &now.to_rfc3339()).await {
        Ok(manifest) => {
            info!(filename = %manifest.filename, "backup created");
            if let Err(e) = state.store.rotate_backups(&backups_dir, DEFAULT_BACKUP_KEEP).await {
                warn!(error = %e, "backup rotation failed");
            }
        }
        Err(e) => warn!(error = %e, "backup run failed"),
    }
}
