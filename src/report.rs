//! Text and JSON rendering of run progress and results.

use serde::Serialize;

use crate::core::Task;
use crate::orchestration::{RunOutcome, SchedulerEvent};
use crate::util::preview;
use crate::Result;

const RESULT_PREVIEW_CHARS: usize = 100;
const SUMMARY_PREVIEW_CHARS: usize = 150;

/// One line (or a few) of live progress for an event, if it is worth printing.
pub fn progress_line(event: &SchedulerEvent) -> Option<String> {
    match event {
        SchedulerEvent::RunStarted { seeds, .. } => {
            Some(format!("Starting with {} seed task(s)\n", seeds))
        }
        SchedulerEvent::TaskStarted {
            iteration, name, ..
        } => Some(format!("[{}] Executing: {}", iteration, name)),
        SchedulerEvent::TaskCompleted { result, .. } => Some(format!(
            "    Result: {}",
            preview(result, RESULT_PREVIEW_CHARS)
        )),
        SchedulerEvent::TasksAdded { ids, queue_len } => Some(format!(
            "    Added {} new tasks\n    Queue size: {}\n",
            ids.len(),
            queue_len
        )),
        SchedulerEvent::TasksRejected { count, queue_len } => Some(format!(
            "    Rejected {} tasks (queue full at {})\n",
            count, queue_len
        )),
        SchedulerEvent::RunFinished { .. } => None,
    }
}

/// Human-readable summary of a finished run.
pub fn summary(outcome: &RunOutcome) -> String {
    let mut out = format!(
        "=== COMPLETED {} TASKS ({}) ===\n",
        outcome.completed.len(),
        outcome.reason
    );
    out.push_str(&task_lines(&outcome.completed));
    if !outcome.remaining.is_empty() {
        out.push_str(&format!("\n{} task(s) left in queue:\n", outcome.remaining.len()));
        for task in &outcome.remaining {
            out.push_str(&format!("  - {}\n", task.name));
        }
    }
    if outcome.rejected > 0 {
        out.push_str(&format!("\n{} generated task(s) rejected\n", outcome.rejected));
    }
    out
}

/// Summary of the tasks finished before a failed run aborted.
pub fn partial_summary(completed: &[Task]) -> String {
    let mut out = format!("=== ABORTED AFTER {} TASKS ===\n", completed.len());
    out.push_str(&task_lines(completed));
    out
}

fn task_lines(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|t| {
            format!(
                "✓ {}\n  {}\n",
                t.name,
                preview(&t.result, SUMMARY_PREVIEW_CHARS)
            )
        })
        .collect()
}

#[derive(Serialize)]
struct JsonTask<'a> {
    id: u64,
    name: &'a str,
    result: &'a str,
}

/// Machine-readable report: completed `{id, name, result}` records and the
/// terminal reason.
pub fn to_json(outcome: &RunOutcome) -> Result<String> {
    let tasks: Vec<_> = outcome
        .completed
        .iter()
        .map(|t| JsonTask {
            id: t.id.0,
            name: &t.name,
            result: &t.result,
        })
        .collect();
    let remaining: Vec<_> = outcome.remaining.iter().map(|t| t.name.as_str()).collect();

    let value = serde_json::json!({
        "run_id": outcome.run_id.to_string(),
        "objective": outcome.objective,
        "reason": outcome.reason,
        "completed": tasks,
        "remaining": remaining,
        "rejected": outcome.rejected,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
