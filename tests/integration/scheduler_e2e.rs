//! End-to-end scheduler tests.
//!
//! These tests verify ordering, id assignment, context windowing and the
//! two normal terminal conditions: an exhausted queue and a spent budget.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use taskloop::core::{TaskId, TaskStatus, NO_CONTEXT};
use taskloop::orchestration::NoFollowUp;
use taskloop::TerminalReason;

use crate::fixtures::{names, scheduler, FanOutGenerator, ScriptedExecutor, ScriptedGenerator};

/// Test: Seeds only
/// Given seeds A, B and a generator that never adds work
/// When the run executes with a budget of 5
/// Then both seeds complete in order and the queue is exhausted
#[tokio::test]
async fn test_seeds_complete_in_order() {
    let s = scheduler(
        Arc::new(ScriptedExecutor::new()),
        Arc::new(ScriptedGenerator::new()),
        5,
    );
    let outcome = s
        .run("objective", &["A", "B"], &CancellationToken::new())
        .await
        .unwrap();

    let records: Vec<_> = outcome
        .completed
        .iter()
        .map(|t| (t.name.as_str(), t.result.as_str()))
        .collect();
    assert_eq!(records, vec![("A", "done:A"), ("B", "done:B")]);
    assert_eq!(outcome.reason, TerminalReason::QueueExhausted);
    assert!(outcome.is_queue_exhausted());
}

/// Test: Generated work runs after seeds
/// Given seed A whose result derives A1 and A2
/// When the run executes with a budget of 3
/// Then A, A1, A2 execute in order and the queue is exhausted
#[tokio::test]
async fn test_generated_tasks_fill_budget_exactly() {
    let generator = ScriptedGenerator::new().on("A", &["A1", "A2"]);
    let s = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(generator), 3);
    let outcome = s
        .run("objective", &["A"], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(names(&outcome.completed), vec!["A", "A1", "A2"]);
    assert_eq!(outcome.reason, TerminalReason::QueueExhausted);
}

/// Test: Budget spent with work left
/// Given seed A whose result derives three tasks
/// When the run executes with a budget of 3
/// Then the fourth task stays queued and the cap is reported
#[tokio::test]
async fn test_iteration_cap_leaves_work_queued() {
    let generator = ScriptedGenerator::new().on("A", &["A1", "A2", "A3"]);
    let s = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(generator), 3);
    let outcome = s
        .run("objective", &["A"], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(names(&outcome.completed), vec!["A", "A1", "A2"]);
    assert_eq!(outcome.reason, TerminalReason::IterationCapReached);
    assert_eq!(names(&outcome.remaining), vec!["A3"]);
    assert_eq!(outcome.remaining[0].status, TaskStatus::Pending);
    assert!(!outcome.is_queue_exhausted());
}

/// Test: Budget and queue run out together
/// Given two seeds, no follow-up work and a budget of exactly 2
/// When the last task completes
/// Then the empty queue wins and the run reports queue exhausted
#[tokio::test]
async fn test_budget_spent_on_empty_queue_is_queue_exhausted() {
    let s = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(NoFollowUp), 2);
    let outcome = s
        .run("objective", &["A", "B"], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.iterations, 2);
    assert_eq!(names(&outcome.completed), vec!["A", "B"]);
    assert_eq!(outcome.reason, TerminalReason::QueueExhausted);
    assert!(outcome.remaining.is_empty());
}

#[tokio::test]
async fn test_empty_seeds_complete_immediately() {
    let executor = Arc::new(ScriptedExecutor::new());
    let s = scheduler(executor.clone(), Arc::new(ScriptedGenerator::new()), 5);
    let seeds: Vec<String> = Vec::new();
    let outcome = s
        .run("objective", &seeds, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.completed.is_empty());
    assert_eq!(outcome.reason, TerminalReason::QueueExhausted);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test]
async fn test_no_follow_up_runs_min_of_seeds_and_budget() {
    let seeds: Vec<String> = (1..=6).map(|i| format!("seed-{}", i)).collect();

    let roomy = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(NoFollowUp), 10);
    let outcome = roomy
        .run("objective", &seeds, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.completed.len(), 6);
    assert_eq!(outcome.reason, TerminalReason::QueueExhausted);

    let tight = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(NoFollowUp), 4);
    let outcome = tight
        .run("objective", &seeds, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.completed.len(), 4);
    assert_eq!(outcome.reason, TerminalReason::IterationCapReached);
    assert_eq!(names(&outcome.remaining), vec!["seed-5", "seed-6"]);
}

#[tokio::test]
async fn test_budget_never_exceeded_with_endless_work() {
    for cap in 1..=8 {
        let s = scheduler(
            Arc::new(ScriptedExecutor::new()),
            Arc::new(FanOutGenerator { width: 3 }),
            cap,
        );
        let outcome = s
            .run("objective", &["root"], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.completed.len(), cap, "cap {}", cap);
        assert_eq!(outcome.iterations, cap);
        assert_eq!(outcome.reason, TerminalReason::IterationCapReached);
    }
}

#[tokio::test]
async fn test_ids_unique_and_output_in_execution_order() {
    let executor = Arc::new(ScriptedExecutor::new());
    let s = scheduler(executor.clone(), Arc::new(FanOutGenerator { width: 2 }), 10);
    let outcome = s
        .run("objective", &["a", "b"], &CancellationToken::new())
        .await
        .unwrap();

    let all_ids: Vec<TaskId> = outcome
        .completed
        .iter()
        .chain(outcome.remaining.iter())
        .map(|t| t.id)
        .collect();
    let unique: HashSet<_> = all_ids.iter().collect();
    assert_eq!(unique.len(), all_ids.len(), "ids must never repeat");

    // The output matches the order the executor was called in.
    let executed: Vec<String> = executor.seen().into_iter().map(|(task, _)| task).collect();
    assert_eq!(names(&outcome.completed), executed);
    assert!(outcome
        .completed
        .iter()
        .all(|t| t.status == TaskStatus::Completed && t.result == format!("done:{}", t.name)));

    // FIFO: both seeds run before any generated task.
    assert_eq!(&executed[..4], ["a", "b", "a.1", "a.2"]);
}

#[tokio::test]
async fn test_duplicate_names_are_not_filtered() {
    let generator = ScriptedGenerator::new().on("A", &["B", "B"]);
    let s = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(generator), 10);
    let outcome = s
        .run("objective", &["A"], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(names(&outcome.completed), vec!["A", "B", "B"]);
    assert_ne!(outcome.completed[1].id, outcome.completed[2].id);
}

#[tokio::test]
async fn test_context_window_shows_last_five_oldest_first() {
    let executor = Arc::new(ScriptedExecutor::new());
    let seeds: Vec<String> = (1..=7).map(|i| format!("t{}", i)).collect();
    let s = scheduler(executor.clone(), Arc::new(NoFollowUp), 10);
    s.run("objective", &seeds, &CancellationToken::new())
        .await
        .unwrap();

    let seen = executor.seen();
    assert_eq!(seen[0].1, NO_CONTEXT);
    assert_eq!(seen[1].1, "t1: done:t1");
    assert_eq!(
        seen[6].1,
        "t2: done:t2\nt3: done:t3\nt4: done:t4\nt5: done:t5\nt6: done:t6"
    );
}

#[tokio::test]
async fn test_generator_receives_objective_task_and_result() {
    let generator = Arc::new(ScriptedGenerator::new());
    let s = scheduler(Arc::new(ScriptedExecutor::new()), generator.clone(), 5);
    s.run("Launch plan", &["Research pricing"], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        generator.seen(),
        vec![(
            "Launch plan".to_string(),
            "Research pricing".to_string(),
            "done:Research pricing".to_string()
        )]
    );
}

#[tokio::test]
async fn test_scheduler_is_reusable_across_runs() {
    let s = scheduler(Arc::new(ScriptedExecutor::new()), Arc::new(NoFollowUp), 5);
    let cancel = CancellationToken::new();

    let first = s.run("objective", &["A"], &cancel).await.unwrap();
    let second = s.run("objective", &["B"], &cancel).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.completed[0].id, TaskId(1));
    assert_eq!(names(&second.completed), vec!["B"]);
}
