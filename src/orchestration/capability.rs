//! Capability boundary between the scheduler and the outside world.
//!
//! The scheduler never knows how a task is executed or how follow-up work
//! is derived. Both are injected as trait objects so that a model-backed
//! provider, a scripted fake, or anything in between can drive the loop.
//! Retries, caching and rate limiting belong to the provider; the scheduler
//! only sees success or failure.

use async_trait::async_trait;

use crate::error::Result;

/// Produces a result for a single task.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute `task` given the rendered `context` of recent results.
    ///
    /// `context` is always a defined string; when nothing has completed yet
    /// it is the "no previous context" placeholder.
    async fn execute(&self, task: &str, context: &str) -> Result<String>;
}

/// Derives follow-up tasks from a completed one.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Return new task names, in the order they should run.
    ///
    /// An empty vector means no further work was derived.
    async fn generate(
        &self,
        objective: &str,
        last_task: &str,
        last_result: &str,
    ) -> Result<Vec<String>>;
}

/// Generator that never derives new work.
///
/// Useful for draining a fixed list of seed tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFollowUp;

#[async_trait]
impl Generator for NoFollowUp {
    async fn generate(&self, _objective: &str, _last_task: &str, _last_result: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
