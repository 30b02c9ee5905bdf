use std::error::Error;
use std::sync::Arc;

use taskdag::{ResultEntry, Scheduler, SchedulerConfig, TaskStatus, TaskdagError};
use taskdag_test_utils::{
    RecordingExecutor, TaskSpecBuilder, chain, init_tracing, wait_until, with_timeout,
};

type TestResult = Result<(), Box<dyn Error>>;

fn scheduler(exec: &RecordingExecutor, workers: usize) -> Scheduler {
    Scheduler::with_executor(
        SchedulerConfig::default().with_max_parallel_tasks(workers),
        Arc::new(exec.clone()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_subtask_finishes_but_dependents_never_run() -> TestResult {
    init_tracing();

    let exec = RecordingExecutor::new().gate("A");
    let scheduler = scheduler(&exec, 2);

    let task_id = scheduler.submit(&chain("chain", &["A", "B", "C"]))?;
    scheduler.execute(&task_id)?;
    assert!(wait_until(|| exec.was_started("A")).await, "A never started");

    let ack = scheduler.cancel(&task_id)?;
    assert_eq!(ack.purged, 0);
    assert_eq!(ack.in_flight, 1);

    let cancelled = scheduler.status(&task_id)?;
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(cancelled.end_time.is_some());

    exec.release("A");
    let view = with_timeout(scheduler.wait_idle(&task_id)).await?;

    // A's result still lands, nothing downstream is dispatched.
    assert_eq!(view.status, TaskStatus::Cancelled);
    assert_eq!(view.end_time, cancelled.end_time);
    assert!(
        scheduler
            .entry(&task_id, "A")?
            .is_some_and(|e| e.is_success())
    );
    assert_eq!(scheduler.entry(&task_id, "B")?, Some(ResultEntry::Pending));
    assert_eq!(scheduler.entry(&task_id, "C")?, Some(ResultEntry::Pending));
    assert_eq!(exec.started(), vec!["A".to_string()]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_purges_queued_items() -> TestResult {
    init_tracing();

    // One worker: while X is blocked, Y has to wait in the queue.
    let exec = RecordingExecutor::new().gate("X");
    let scheduler = scheduler(&exec, 1);

    let spec = TaskSpecBuilder::new("pair")
        .subtask("X", &[])
        .subtask("Y", &[])
        .build();
    let task_id = scheduler.submit(&spec)?;
    let ack = scheduler.execute(&task_id)?;
    assert_eq!(ack.queued, 2);

    assert!(wait_until(|| exec.was_started("X")).await);

    let cancel = scheduler.cancel(&task_id)?;
    assert_eq!(cancel.purged, 1);
    assert_eq!(cancel.in_flight, 1);

    exec.release("X");
    with_timeout(scheduler.wait_idle(&task_id)).await?;

    assert!(!exec.was_started("Y"));
    assert_eq!(scheduler.entry(&task_id, "Y")?, Some(ResultEntry::Pending));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_immediately_after_execute_never_dispatches_downstream() -> TestResult {
    init_tracing();

    let exec = RecordingExecutor::new();
    let scheduler = scheduler(&exec, 2);

    let task_id = scheduler.submit(&chain("chain", &["A", "B", "C"]))?;
    scheduler.execute(&task_id)?;
    scheduler.cancel(&task_id)?;

    let view = with_timeout(scheduler.wait_idle(&task_id)).await?;
    assert_eq!(view.status, TaskStatus::Cancelled);

    // A may or may not have been claimed before the cancel.
    let started = exec.started();
    assert!(started.iter().all(|id| id == "A"), "started: {started:?}");
    assert_eq!(scheduler.entry(&task_id, "B")?, Some(ResultEntry::Pending));
    assert_eq!(scheduler.entry(&task_id, "C")?, Some(ResultEntry::Pending));

    Ok(())
}

#[tokio::test]
async fn cancelling_a_completed_task_is_rejected() -> TestResult {
    init_tracing();

    let exec = RecordingExecutor::new();
    let scheduler = scheduler(&exec, 2);

    let task_id = scheduler.submit(&chain("chain", &["A", "B"]))?;
    scheduler.execute(&task_id)?;
    let view = with_timeout(scheduler.wait_idle(&task_id)).await?;
    assert_eq!(view.status, TaskStatus::Completed);

    match scheduler.cancel(&task_id) {
        Err(TaskdagError::AlreadyCompleted(id)) => assert_eq!(id, task_id),
        other => panic!("expected AlreadyCompleted, got {other:?}"),
    }
    assert_eq!(scheduler.status(&task_id)?.status, TaskStatus::Completed);

    Ok(())
}

#[tokio::test]
async fn cancelling_twice_keeps_the_first_end_time() -> TestResult {
    init_tracing();

    let exec = RecordingExecutor::new();
    let scheduler = scheduler(&exec, 1);

    let task_id = scheduler.submit(&chain("chain", &["A", "B"]))?;
    scheduler.cancel(&task_id)?;
    let first = scheduler.status(&task_id)?;

    let again = scheduler.cancel(&task_id)?;
    assert_eq!(again.purged, 0);
    assert_eq!(scheduler.status(&task_id)?.end_time, first.end_time);

    Ok(())
}

#[tokio::test]
async fn cancelled_task_cannot_be_executed() -> TestResult {
    init_tracing();

    let exec = RecordingExecutor::new();
    let scheduler = scheduler(&exec, 1);

    let task_id = scheduler.submit(&chain("chain", &["A"]))?;
    scheduler.cancel(&task_id)?;

    let ack = scheduler.execute(&task_id)?;
    assert_eq!(ack.status, TaskStatus::Cancelled);
    assert_eq!(ack.queued, 0);

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(exec.started().is_empty());

    Ok(())
}

#[tokio::test]
async fn cancel_unknown_task() {
    let scheduler = scheduler(&RecordingExecutor::new(), 1);
    assert!(matches!(
        scheduler.cancel("task_0_deadbeef"),
        Err(TaskdagError::TaskNotFound(_))
    ));
}
