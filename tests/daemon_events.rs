use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use covsched::config::Settings;
use covsched::daemon::{Daemon, RuntimeEvent};
use covsched::service::JobService;
use covsched::store::{FileStore, JobStore};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

fn write_fake_tool(dir: &Path, log: &Path) -> PathBuf {
    let path = dir.join("fake-java.sh");
    let script = format!(
        "#!/bin/sh\n\
         echo \"$@\" >> \"{log}\"\n\
         prev=\"\"\n\
         for a in \"$@\"; do\n\
         \tif [ \"$prev\" = \"--destfile\" ]; then printf 'execdata' > \"$a\"; fi\n\
         \tprev=\"$a\"\n\
         done\n\
         exit 0\n",
        log = log.display(),
    );
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn settings(root: &Path, java: &Path) -> Settings {
    Settings {
        java: java.to_string_lossy().into_owned(),
        jacoco_home: root.join("jacoco"),
        agent_host: "127.0.0.1".into(),
        agent_port: 6300,
        classfiles: root.join("classes"),
        sourcefiles: root.join("sources"),
        output_dir: root.join("reports"),
        store_path: root.join("jobs.toml"),
        update_cooldown: Duration::from_secs(1),
        clear_cooldown: Duration::from_secs(2),
        dump_settle_poll: Duration::from_millis(20),
        dump_settle_timeout: Duration::from_secs(1),
        dump_fallback_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn job_due_event_runs_the_update_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log);
    let settings = settings(dir.path(), &java);

    let store = FileStore::new(&settings.store_path);
    let job = store.create("smoke", "*/5 * * * *").unwrap();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let service = Arc::new(JobService::new(
        &settings,
        Box::new(FileStore::new(&settings.store_path)),
        tx.clone(),
    ));
    service.reload().await.unwrap();

    let daemon = tokio::spawn(Daemon::new(Arc::clone(&service), rx).run());

    tx.send(RuntimeEvent::JobDue { job: job.id.clone() })
        .await
        .unwrap();

    // The firing is dispatched onto its own task; poll for its artifact.
    let exec_file = service.report_paths(&job.id).exec_file;
    let deadline = Instant::now() + Duration::from_secs(2);
    while !exec_file.exists() {
        assert!(Instant::now() < deadline, "pipeline never produced exec data");
        sleep(Duration::from_millis(20)).await;
    }

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    timeout(Duration::from_secs(1), daemon)
        .await
        .expect("daemon should stop on shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn store_changed_event_reloads_the_live_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log);
    let settings = settings(dir.path(), &java);

    let store = FileStore::new(&settings.store_path);
    let first = store.create("first", "*/5 * * * *").unwrap();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let service = Arc::new(JobService::new(
        &settings,
        Box::new(FileStore::new(&settings.store_path)),
        tx.clone(),
    ));
    service.reload().await.unwrap();
    assert_eq!(service.scheduled_ids().await, vec![first.id.clone()]);

    let daemon = tokio::spawn(Daemon::new(Arc::clone(&service), rx).run());

    // Simulate an external edit of the store file.
    let second = store.create("second", "0 3 * * *").unwrap();
    tx.send(RuntimeEvent::StoreChanged).await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let live = service.scheduled_ids().await;
        if live.contains(&second.id) && live.contains(&first.id) {
            break;
        }
        assert!(Instant::now() < deadline, "reload never picked up the new job");
        sleep(Duration::from_millis(20)).await;
    }

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    timeout(Duration::from_secs(1), daemon)
        .await
        .expect("daemon should stop on shutdown")
        .unwrap()
        .unwrap();
}
