//! Capability failure tests.
//!
//! A failing executor or generator aborts the run, but the error still
//! carries the failing task and everything completed before it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use taskloop::orchestration::{NoFollowUp, Scheduler, SchedulerConfig};
use taskloop::{Error, RunStage, TerminalReason};

use crate::fixtures::{names, scheduler, ScriptedExecutor, ScriptedGenerator, StallingGenerator};

/// Test: Executor fails mid-run
/// Given seeds A, B, C and an executor failing on its second call
/// When the run executes
/// Then it aborts at B with A reported as completed
#[tokio::test]
async fn test_executor_failure_reports_completed_tasks() {
    let executor = Arc::new(ScriptedExecutor::failing_on_call(2));
    let s = scheduler(executor.clone(), Arc::new(NoFollowUp), 10);
    let err = s
        .run("objective", &["A", "B", "C"], &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(RunStage::Execution));
    assert_eq!(err.completed_count(), 1);
    assert_eq!(names(err.completed_tasks()), vec!["A"]);
    assert_eq!(err.completed_tasks()[0].result, "done:A");

    match &err {
        Error::CapabilityFailure { task, source, .. } => {
            assert_eq!(task.name, "B");
            assert!(matches!(**source, Error::Capability(_)));
        }
        other => panic!("Expected CapabilityFailure, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "execution failed on task 2 after 1 completed task(s): Capability error: executor failed on call 2"
    );

    // C was never attempted.
    assert_eq!(executor.call_count(), 2);
}

#[tokio::test]
async fn test_executor_failure_on_first_task() {
    let s = scheduler(
        Arc::new(ScriptedExecutor::failing_on_call(1)),
        Arc::new(NoFollowUp),
        10,
    );
    let err = s
        .run("objective", &["A"], &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(RunStage::Execution));
    assert!(err.completed_tasks().is_empty());
}

/// Test: Generator fails after a task completes
/// Given seed A and a generator failing on A
/// When the run executes
/// Then the error is tagged with the generation stage and A counts as completed
#[tokio::test]
async fn test_generator_failure_keeps_finished_task() {
    let generator = ScriptedGenerator::new().on("A", &["B"]).failing_on("B");
    let s = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(generator), 10);
    let err = s
        .run("objective", &["A"], &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(RunStage::Generation));
    assert_eq!(names(err.completed_tasks()), vec!["A", "B"]);
    match &err {
        Error::CapabilityFailure { task, .. } => {
            assert_eq!(task.name, "B");
            assert_eq!(task.result, "done:B");
        }
        other => panic!("Expected CapabilityFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_scheduler_usable_after_failure() {
    // Only the first call fails, so a second run goes through.
    let s = scheduler(
        Arc::new(ScriptedExecutor::failing_on_call(1)),
        Arc::new(NoFollowUp),
        10,
    );
    let cancel = CancellationToken::new();

    assert!(s.run("objective", &["A"], &cancel).await.is_err());
    assert!(!s.is_running());

    let outcome = s.run("objective", &["A"], &cancel).await.unwrap();
    assert_eq!(names(&outcome.completed), vec!["A"]);
    assert_eq!(outcome.reason, TerminalReason::QueueExhausted);
}

#[tokio::test]
async fn test_invalid_input_is_validation_stage() {
    let executor = Arc::new(ScriptedExecutor::new());
    let s = scheduler(executor.clone(), Arc::new(NoFollowUp), 10);
    let err = s
        .run("", &["A"], &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(err.stage(), Some(RunStage::Validation));
    assert_eq!(executor.call_count(), 0);
}

/// Test: Generator call times out
/// Given a generator that never returns and a short call timeout
/// When the run executes seed A
/// Then the run fails in the generation stage with A completed and a timeout source
#[tokio::test]
async fn test_generator_timeout_is_generation_failure() {
    let s = Scheduler::new(
        Arc::new(ScriptedExecutor::new()),
        Arc::new(StallingGenerator::default()),
    )
    .with_config(SchedulerConfig::default().with_call_timeout(Some(Duration::from_millis(20))));

    let err = s
        .run("objective", &["A", "B"], &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(RunStage::Generation));
    assert_eq!(names(err.completed_tasks()), vec!["A"]);
    match &err {
        Error::CapabilityFailure { task, source, .. } => {
            assert_eq!(task.name, "A");
            assert!(matches!(**source, Error::Timeout(limit) if limit == Duration::from_millis(20)));
        }
        other => panic!("Expected CapabilityFailure, got {:?}", other),
    }
    assert!(!s.is_running());
}
