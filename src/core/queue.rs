//! FIFO backlog of pending tasks.

use std::collections::VecDeque;

use crate::core::task::{Task, TaskStatus};
use crate::error::{Error, Result};

/// Ordered backlog of pending tasks.
///
/// Insertion order is execution order. There is no priority reordering and
/// no intrinsic capacity bound; the scheduler applies any limit.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to the tail.
    ///
    /// Only `pending` tasks may enter the queue.
    pub fn push(&mut self, task: Task) -> Result<()> {
        if !task.can_start() {
            return Err(Error::InvalidTransition {
                from: task.status.to_string(),
                to: TaskStatus::Pending.to_string(),
            });
        }
        self.tasks.push_back(task);
        Ok(())
    }

    /// Remove and return the head task.
    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Drain the queue into a vector, head first.
    pub fn into_vec(self) -> Vec<Task> {
        self.tasks.into()
    }
}
