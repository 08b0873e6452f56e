use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use covsched::guard::ExecutionGuard;
use tokio::time::sleep;

#[tokio::test]
async fn concurrent_runs_on_one_key_execute_exactly_once() {
    let guard = ExecutionGuard::new();
    let executed = AtomicUsize::new(0);

    let slow = async {
        executed.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(80)).await;
        "slow"
    };
    let fast = async {
        executed.fetch_add(1, Ordering::SeqCst);
        "fast"
    };

    let (first, second) = tokio::join!(guard.try_run("job-1", slow), guard.try_run("job-1", fast));

    assert_eq!(first, Some("slow"));
    assert_eq!(second, None);
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_keys_do_not_block_each_other() {
    let guard = ExecutionGuard::new();

    let (a, b) = tokio::join!(
        guard.try_run("job-1", async {
            sleep(Duration::from_millis(50)).await;
            1
        }),
        guard.try_run("job-2", async {
            sleep(Duration::from_millis(50)).await;
            2
        }),
    );

    assert_eq!(a, Some(1));
    assert_eq!(b, Some(2));
}

#[tokio::test]
async fn lock_is_released_after_a_failed_action() {
    let guard = ExecutionGuard::new();

    let failed: Option<Result<(), &str>> =
        guard.try_run("job-1", async { Err("pipeline blew up") }).await;
    assert_eq!(failed, Some(Err("pipeline blew up")));

    // The failure must not leave the lock held.
    let retry = guard.try_run("job-1", async { "ok" }).await;
    assert_eq!(retry, Some("ok"));
    assert!(!guard.is_held("job-1").await);
}

#[tokio::test]
async fn is_held_reflects_a_running_action() {
    let guard = ExecutionGuard::new();

    let holder = guard.try_run("job-1", async {
        sleep(Duration::from_millis(100)).await;
    });
    tokio::pin!(holder);

    // Drive the holder until it has acquired the lock and parked on sleep.
    tokio::select! {
        _ = &mut holder => panic!("holder finished too early"),
        _ = sleep(Duration::from_millis(20)) => {}
    }

    assert!(guard.is_held("job-1").await);
    assert!(!guard.is_held("job-2").await);

    holder.await;
    assert!(!guard.is_held("job-1").await);
}
