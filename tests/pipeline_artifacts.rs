use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use covsched::config::Settings;
use covsched::report::{PipelineError, ReportPipeline};
use covsched::store::JobId;

/// Write a stand-in for the coverage CLI launcher. It appends its argument
/// list to `log`, honours `--destfile` by writing exec data, and optionally
/// fails the `dump` subcommand (the third argument after `-jar <jar>`).
fn write_fake_tool(dir: &Path, log: &Path, fail_dump_with: Option<i32>) -> PathBuf {
    let path = dir.join("fake-java.sh");
    let fail = match fail_dump_with {
        Some(code) => format!("if [ \"$3\" = \"dump\" ]; then exit {code}; fi\n"),
        None => String::new(),
    };
    let script = format!(
        "#!/bin/sh\n\
         echo \"$@\" >> \"{log}\"\n\
         {fail}\
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
        clear_cooldown: Duration::from_secs(1),
        dump_settle_poll: Duration::from_millis(20),
        dump_settle_timeout: Duration::from_secs(1),
        dump_fallback_delay: Duration::ZERO,
    }
}

fn logged_lines(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[tokio::test]
async fn update_report_runs_dump_then_report() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log, None);
    let pipeline = ReportPipeline::new(&settings(dir.path(), &java));
    let id = JobId::from("1");

    pipeline.update_report(&id).await.unwrap();

    let lines = logged_lines(&log);
    assert_eq!(lines.len(), 2, "expected dump then report, got: {lines:?}");
    assert!(lines[0].contains(" dump "));
    assert!(lines[0].contains("--destfile"));
    assert!(!lines[0].contains("--reset"));
    assert!(lines[1].contains(" report "));
    assert!(lines[1].contains("--classfiles"));
    assert!(lines[1].contains("--sourcefiles"));

    let paths = pipeline.paths_for(&id);
    assert_eq!(fs::read_to_string(&paths.exec_file).unwrap(), "execdata");
}

#[tokio::test]
async fn output_paths_are_scoped_per_job() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log, None);
    let pipeline = ReportPipeline::new(&settings(dir.path(), &java));

    let a = pipeline.paths_for(&JobId::from("1"));
    let b = pipeline.paths_for(&JobId::from("2"));
    assert_ne!(a.dir, b.dir);
    assert_ne!(a.exec_file, b.exec_file);

    pipeline.update_report(&JobId::from("1")).await.unwrap();
    pipeline.update_report(&JobId::from("2")).await.unwrap();
    assert!(a.exec_file.exists());
    assert!(b.exec_file.exists());
}

#[tokio::test]
async fn clear_and_regenerate_uses_reset_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log, None);
    let pipeline = ReportPipeline::new(&settings(dir.path(), &java));
    let id = JobId::from("1");

    // First run: no artifacts exist at all; the deletion step must not error.
    pipeline.clear_and_regenerate(&id).await.unwrap();
    // Second run in a row: exec data exists, XML/CSV do not.
    pipeline.clear_and_regenerate(&id).await.unwrap();

    let lines = logged_lines(&log);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("--reset"));
    assert!(lines[2].contains("--reset"));
}

#[tokio::test]
async fn clear_removes_stale_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log, None);
    let pipeline = ReportPipeline::new(&settings(dir.path(), &java));
    let id = JobId::from("1");

    let paths = pipeline.paths_for(&id);
    fs::create_dir_all(&paths.dir).unwrap();
    fs::write(&paths.xml_file, "stale").unwrap();
    fs::write(&paths.csv_file, "stale").unwrap();

    pipeline.clear_and_regenerate(&id).await.unwrap();

    // The fake report step writes nothing, so stale files must be gone.
    assert!(!paths.xml_file.exists());
    assert!(!paths.csv_file.exists());
}

#[tokio::test]
async fn failed_dump_skips_the_report_step() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let java = write_fake_tool(dir.path(), &log, Some(3));
    let pipeline = ReportPipeline::new(&settings(dir.path(), &java));

    let err = pipeline.update_report(&JobId::from("1")).await.unwrap_err();
    match err {
        PipelineError::ToolExit { command, exit_code } => {
            assert_eq!(exit_code, 3);
            assert!(command.contains("dump"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let lines = logged_lines(&log);
    assert_eq!(lines.len(), 1, "report must not run after a failed dump");
}
