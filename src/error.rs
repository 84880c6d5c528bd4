use thiserror::Error;

use crate::core::task::Task;

/// Stage of a run at which a failure was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Input checks before any capability call.
    Validation,
    /// The executor capability.
    Execution,
    /// The generator capability.
    Generation,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStage::Validation => write!(f, "validation"),
            RunStage::Execution => write!(f, "execution"),
            RunStage::Generation => write!(f, "generation"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scheduler is already running")]
    ConcurrentRunRejected,

    #[error("Invalid task transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Claude binary not found in PATH")]
    ClaudeBinaryNotFound,

    /// An executor or generator call failed and aborted the run.
    ///
    /// `completed` holds every task that finished before the failure, in
    /// execution order.
    #[error("{stage} failed on task {} after {} completed task(s): {source}", task.id, completed.len())]
    CapabilityFailure {
        stage: RunStage,
        task: Box<Task>,
        completed: Vec<Task>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Stage that raised this error, if it came out of a run.
    pub fn stage(&self) -> Option<RunStage> {
        match self {
            Error::CapabilityFailure { stage, .. } => Some(*stage),
            Error::InvalidInput(_) => Some(RunStage::Validation),
            _ => None,
        }
    }

    /// Number of tasks that completed before the run failed.
    pub fn completed_count(&self) -> usize {
        match self {
            Error::CapabilityFailure { completed, .. } => completed.len(),
            _ => 0,
        }
    }

    /// Tasks completed before the run failed.
    pub fn completed_tasks(&self) -> &[Task] {
        match self {
            Error::CapabilityFailure { completed, .. } => completed,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
