//! Claude Code headless capability provider.
//!
//! `ClaudeHeadless` runs Claude Code in non-interactive mode (`-p`) with JSON
//! output and turns the response envelope into plain text. `ClaudeExecutor`
//! and `ClaudeGenerator` wrap it with the execution and task-generation
//! prompts so it can be plugged into the [`Scheduler`](super::Scheduler).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::orchestration::capability::{Executor, Generator};
use crate::orchestration::task_list::parse_task_list;
use crate::{tlog_debug, tlog_trace};

/// Default timeout for a single Claude invocation (10 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// The result type from a Claude execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultType {
    /// Successful execution with output.
    Success { output: String },
    /// Failed execution with error message.
    Error { message: String },
}

/// Response from a Claude headless execution.
#[derive(Debug, Clone)]
pub struct ClaudeResponse {
    /// Session ID, if reported.
    pub session_id: Option<String>,
    /// The result of the execution.
    pub result: ResultType,
    /// Cost in USD, if reported.
    pub cost_usd: Option<f64>,
}

impl ClaudeResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.result, ResultType::Success { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match &self.result {
            ResultType::Success { output } => Some(output),
            ResultType::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            ResultType::Success { .. } => None,
            ResultType::Error { message } => Some(message),
        }
    }

    /// Convert into the output text, or a capability error.
    pub fn into_output(self) -> Result<String> {
        match self.result {
            ResultType::Success { output } => Ok(output),
            ResultType::Error { message } => Err(Error::Capability(message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClaudeResponse {
    subtype: Option<String>,
    result: Option<String>,
    session_id: Option<String>,
    total_cost_usd: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

/// Claude Code headless runner.
#[derive(Debug, Clone)]
pub struct ClaudeHeadless {
    binary: PathBuf,
    args: Vec<String>,
    model: Option<String>,
    workdir: PathBuf,
    timeout: Duration,
}

impl ClaudeHeadless {
    /// Create a runner using the `claude` binary found on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClaudeBinaryNotFound`] if the binary cannot be found.
    pub fn new() -> Result<Self> {
        Self::from_command("claude")
    }

    /// Create a runner from a command line such as `claude --verbose`.
    ///
    /// The first word is resolved through `PATH`; the rest are passed before
    /// the prompt on every invocation.
    pub fn from_command(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(Error::ClaudeBinaryNotFound)?;
        let binary = which::which(program).map_err(|_| Error::ClaudeBinaryNotFound)?;
        let mut claude = Self::with_binary(binary);
        claude.args = parts.map(str::to_string).collect();
        Ok(claude)
    }

    /// Create a runner with a specific binary path.
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            args: Vec::new(),
            model: None,
            workdir: PathBuf::from("."),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_workdir(mut self, workdir: PathBuf) -> Self {
        self.workdir = workdir;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Send a prompt and return the parsed response.
    ///
    /// The child process is killed if this future is dropped, so a cancelled
    /// run does not leave Claude running in the background.
    pub async fn execute(&self, prompt: &str) -> Result<ClaudeResponse> {
        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("json")
            .current_dir(&self.workdir)
            .kill_on_drop(true);
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }

        tlog_debug!("ClaudeHeadless::execute prompt_len={}", prompt.len());
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if let Ok(response) = Self::parse_json_response(&stdout) {
            return Ok(response);
        }

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                format!(
                    "Claude exited with code {}",
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr.trim().to_string()
            };
            return Ok(ClaudeResponse {
                session_id: None,
                result: ResultType::Error { message },
                cost_usd: None,
            });
        }

        Ok(ClaudeResponse {
            session_id: None,
            result: ResultType::Success {
                output: stdout.trim().to_string(),
            },
            cost_usd: None,
        })
    }

    /// Parse the JSON envelope printed by `--output-format json`.
    pub fn parse_json_response(json_str: &str) -> Result<ClaudeResponse> {
        let raw: RawClaudeResponse = serde_json::from_str(json_str)?;

        let result = match raw.subtype.as_deref() {
            Some("success") => ResultType::Success {
                output: raw.result.unwrap_or_default(),
            },
            Some("error") => ResultType::Error {
                message: raw.error.or(raw.result).unwrap_or_default(),
            },
            _ => match (raw.error, raw.result) {
                (Some(error), _) => ResultType::Error { message: error },
                (None, Some(result)) => ResultType::Success { output: result },
                (None, None) => ResultType::Error {
                    message: "Unknown response format".to_string(),
                },
            },
        };

        Ok(ClaudeResponse {
            session_id: raw.session_id,
            result,
            cost_usd: raw.total_cost_usd,
        })
    }
}

/// Render the prompt that asks Claude to carry out one task.
pub fn execution_prompt(task: &str, context: &str) -> String {
    format!(
        "Execute the following task and provide a detailed result.\n\n\
         Task: {task}\n\
         Context: {context}\n\n\
         Result:"
    )
}

/// Render the prompt that asks Claude for follow-up tasks.
pub fn generation_prompt(objective: &str, last_task: &str, last_result: &str) -> String {
    format!(
        "You are a project management AI. Based on the original objective and the \
         result of the previous task, generate new tasks that need to be completed \
         to achieve the objective. Do not repeat tasks that are already done.\n\n\
         Original Objective: {objective}\n\
         Previous Task Result: {last_result}\n\
         Previous Task Description: {last_task}\n\n\
         Return a list of new tasks, one per line, in priority order. \
         Return nothing if the objective is complete."
    )
}

/// Executor capability backed by Claude.
#[derive(Debug, Clone)]
pub struct ClaudeExecutor {
    claude: ClaudeHeadless,
}

impl ClaudeExecutor {
    pub fn new(claude: ClaudeHeadless) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl Executor for ClaudeExecutor {
    async fn execute(&self, task: &str, context: &str) -> Result<String> {
        let response = self.claude.execute(&execution_prompt(task, context)).await?;
        response.into_output().map(|s| s.trim().to_string())
    }
}

/// Generator capability backed by Claude.
#[derive(Debug, Clone)]
pub struct ClaudeGenerator {
    claude: ClaudeHeadless,
}

impl ClaudeGenerator {
    pub fn new(claude: ClaudeHeadless) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl Generator for ClaudeGenerator {
    async fn generate(
        &self,
        objective: &str,
        last_task: &str,
        last_result: &str,
    ) -> Result<Vec<String>> {
        let prompt = generation_prompt(objective, last_task, last_result);
        let text = self.claude.execute(&prompt).await?.into_output()?;
        let tasks = parse_task_list(&text);
        tlog_trace!("ClaudeGenerator: parsed {} tasks", tasks.len());
        Ok(tasks)
    }
}
