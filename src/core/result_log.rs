//! Append-only history of completed tasks.
//!
//! The log doubles as the source of execution context: the scheduler shows
//! the executor a window of the most recent entries.

use crate::core::task::{Task, TaskStatus};
use crate::error::{Error, Result};

/// Context handed to the executor when nothing has completed yet.
pub const NO_CONTEXT: &str = "No previous context";

/// Ordered, append-only sequence of completed tasks.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    entries: Vec<Task>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed task.
    pub fn append(&mut self, task: Task) -> Result<()> {
        if !task.is_finished() {
            return Err(Error::InvalidTransition {
                from: task.status.to_string(),
                to: TaskStatus::Completed.to_string(),
            });
        }
        self.entries.push(task);
        Ok(())
    }

    /// The most recent `n` entries, oldest first. `n` is clamped to the log length.
    pub fn last_n(&self, n: usize) -> &[Task] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Render the most recent `window` entries as `name: result` lines.
    ///
    /// Returns [`NO_CONTEXT`] when the window is empty.
    pub fn context(&self, window: usize) -> String {
        let recent = self.last_n(window);
        if recent.is_empty() {
            return NO_CONTEXT.to_string();
        }
        recent
            .iter()
            .map(|t| format!("{}: {}", t.name, t.result))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Task> {
        self.entries
    }
}
