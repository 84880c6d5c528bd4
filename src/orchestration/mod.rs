//! Orchestration layer for the task loop.
//!
//! This module provides the scheduler that drives the execute, generate,
//! requeue cycle, the capability traits it depends on, parsing of generated
//! task lists, and a Claude Code backed implementation of both capabilities.

mod capability;
mod claude;
mod scheduler;
mod task_list;

pub use capability::{Executor, Generator, NoFollowUp};
pub use claude::{
    execution_prompt, generation_prompt, ClaudeExecutor, ClaudeGenerator, ClaudeHeadless,
    ClaudeResponse, ResultType, DEFAULT_TIMEOUT_SECS,
};
pub use scheduler::{
    OverflowPolicy, RunOutcome, Scheduler, SchedulerConfig, SchedulerEvent, TerminalReason,
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_ITERATIONS,
};
pub use task_list::{normalize_candidates, parse_task_list};
