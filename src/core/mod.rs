//! Core domain models for the scheduling loop.
//!
//! This module contains the task record, the FIFO backlog of pending work,
//! and the append-only log of completed tasks.

pub mod queue;
pub mod result_log;
pub mod task;

pub use queue::TaskQueue;
pub use result_log::{ResultLog, NO_CONTEXT};
pub use task::{IdAllocator, Task, TaskId, TaskStatus};
