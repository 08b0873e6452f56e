use std::time::Duration;

use covsched::daemon::RuntimeEvent;
use covsched::store::{FileStore, JobStore};
use covsched::watch::spawn_store_watcher;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn rewriting_the_store_file_emits_store_changed() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("jobs.toml");
    let store = FileStore::new(&store_path);
    store.create("first", "*/5 * * * *").unwrap();

    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);
    let _watcher = spawn_store_watcher(&store_path, tx).unwrap();
    // Let the platform watcher arm before mutating the store.
    sleep(Duration::from_millis(250)).await;

    store.create("second", "0 3 * * *").unwrap();

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("store rewrite should produce an event")
        .expect("channel open");
    assert!(matches!(event, RuntimeEvent::StoreChanged));
}

#[tokio::test]
async fn unrelated_files_in_the_store_directory_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("jobs.toml");
    let store = FileStore::new(&store_path);
    store.create("first", "*/5 * * * *").unwrap();

    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);
    let _watcher = spawn_store_watcher(&store_path, tx).unwrap();
    sleep(Duration::from_millis(250)).await;

    std::fs::write(dir.path().join("notes.txt"), "scratch").unwrap();

    let silence = timeout(Duration::from_millis(800), rx.recv()).await;
    assert!(silence.is_err(), "no event expected for unrelated files");
}
