//! Task data model for the scheduling loop.
//!
//! A task is the unit of work handed to the executor. It moves strictly
//! forward through `pending -> executing -> completed` and its result is
//! frozen once it completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier for a task, unique within a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Hands out task ids from a monotonic counter.
///
/// Ids are never reused for the lifetime of the allocator.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Allocate the next id.
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

/// Task status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue.
    #[default]
    Pending,
    /// Handed to the executor.
    Executing,
    /// Result recorded; the task is frozen.
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Executing => write!(f, "executing"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A single unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the run.
    pub id: TaskId,
    /// Description of the work to perform.
    pub name: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Executor output. Empty until the task completes.
    pub result: String,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the result was recorded.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task with an empty result.
    pub fn new(id: TaskId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            status: TaskStatus::Pending,
            result: String::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Move the task from `pending` to `executing`.
    pub fn start(&mut self) -> Result<()> {
        self.transition(TaskStatus::Pending, TaskStatus::Executing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record the result and move the task from `executing` to `completed`.
    pub fn complete(&mut self, result: &str) -> Result<()> {
        self.transition(TaskStatus::Executing, TaskStatus::Completed)?;
        self.result = result.to_string();
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Check if the task has completed.
    pub fn is_finished(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Check if the task can be started.
    pub fn can_start(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    fn transition(&mut self, expected: TaskStatus, to: TaskStatus) -> Result<()> {
        if self.status != expected {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}
