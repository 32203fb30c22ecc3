//! End-to-end CLI invocations against an in-process worker.

use assert_cmd::Command;
use predicates::str::contains;
use test_utils::{spawn_test_worker, store_with_session, temp_worker_config};

#[tokio::test]
async fn health_reports_ok_against_a_live_worker() {
    let (_dir, config) = temp_worker_config();
    let worker = spawn_test_worker(config).await.expect("worker must start");

    let mut cmd = Command::cargo_bin("memory-cli").expect("binary must build");
    cmd.args(["--worker-url", &worker.base_url, "health"]);
    cmd.assert().success().stdout(contains("status: ok"));
}

#[tokio::test]
async fn health_fails_helpfully_when_no_worker_is_listening() {
    let mut cmd = Command::cargo_bin("memory-cli").expect("binary must build");
    cmd.args(["--worker-url", "http://127.0.0.1:1", "health"]);
    cmd.assert().failure().stderr(contains("Possible solutions"));
}

#[tokio::test]
async fn search_finds_an_ingested_observation() {
    let (_dir, config) = temp_worker_config();
    let worker = spawn_test_worker(config).await.expect("worker must start");

    let (_store, session) = store_with_session("sess-cli", "demo").await.expect("session must be created");
    let mut obs = test_utils::sample_observation("demo", "decision", "Use esbuild for bundling", "chose esbuild over webpack", 1_000);
    obs.memory_session_id = session.id;
    worker.state.store.ingest_observation(obs).await.expect("ingest must succeed");

    let mut cmd = Command::cargo_bin("memory-cli").expect("binary must build");
    cmd.args(["--worker-url", &worker.base_url, "search", "esbuild", "--project", "demo"]);
    cmd.assert().success().stdout(contains("Use esbuild for bundling"));
}

#[tokio::test]
async fn backup_create_then_list_shows_the_new_backup() {
    let (_dir, config) = temp_worker_config();
    let worker = spawn_test_worker(config).await.expect("worker must start");

    let mut create = Command::cargo_bin("memory-cli").expect("binary must build");
    create.args(["--worker-url", &worker.base_url, "backup", "create"]);
    create.assert().success().stdout(contains("created backup"));

    let mut list = Command::cargo_bin("memory-cli").expect("binary must build");
    list.args(["--worker-url", &worker.base_url, "backup", "list"]);
    list.assert().success();
}

#[tokio::test]
async fn backup_restore_without_a_token_is_rejected() {
    let (_dir, config) = temp_worker_config();
    let worker = spawn_test_worker(config).await.expect("worker must start");

    let mut cmd = Command::cargo_bin("memory-cli").expect("binary must build");
    cmd.env("KIRO_MEMORY_DATA_DIR", "/nonexistent-so-no-token-is-found");
    cmd.args(["--worker-url", &worker.base_url, "backup", "restore", "does-not-exist.db"]);
    cmd.assert().failure();
}

#[tokio::test]
async fn export_then_import_round_trips_observations() {
    let (_dir, config) = temp_worker_config();
    let worker = spawn_test_worker(config).await.expect("worker must start");

    let (_store, session) = store_with_session("sess-roundtrip", "demo").await.expect("session must be created");
    let mut obs = test_utils::sample_observation("demo", "file-write", "Edit main.rs", "edited the entrypoint", 2_000);
    obs.memory_session_id = session.id;
    worker.state.store.ingest_observation(obs).await.expect("ingest must succeed");

    let export_dir = tempfile::tempdir().expect("tempdir must be creatable");
    let export_path = export_dir.path().join("export.jsonl");

    let mut export = Command::cargo_bin("memory-cli").expect("binary must build");
    export.args(["--worker-url", &worker.base_url, "export", "--out", export_path.to_str().expect("path must be utf8")]);
    export.assert().success();
    assert!(export_path.metadata().expect("export file must exist").len() > 0);

    let mut import = Command::cargo_bin("memory-cli").expect("binary must build");
    import.args(["--worker-url", &worker.base_url, "import", export_path.to_str().expect("path must be utf8")]);
    import.assert().success().stdout(contains("skipped"));
}
