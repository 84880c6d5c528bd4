//! Scheduler for the autonomous task loop.
//!
//! The Scheduler pops the head of a FIFO queue, hands it to the executor
//! with a window of recent results as context, records the result, asks the
//! generator for follow-up work and appends whatever comes back to the tail
//! of the queue. It stops when the queue drains, when the iteration budget
//! is spent, when the caller cancels, or when a capability call fails.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{IdAllocator, ResultLog, Task, TaskId, TaskQueue};
use crate::error::{Error, Result, RunStage};
use crate::orchestration::capability::{Executor, Generator};
use crate::orchestration::task_list::normalize_candidates;
use crate::{tlog, tlog_debug, tlog_error, tlog_warn};

/// Default cap on executed tasks per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
/// Default number of recent results shown to the executor.
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;
/// Default timeout for a single executor or generator call (10 minutes).
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 600;

/// What to do when generated tasks would push the queue past its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the candidates that do not fit and keep running.
    #[default]
    RejectNewest,
    /// Drop the candidates that do not fit and stop after this iteration.
    StopRun,
}

/// Tunables for a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of tasks executed per run.
    pub max_iterations: usize,
    /// Number of recent results rendered into the executor context.
    pub context_window: usize,
    /// Timeout applied to every executor and generator call.
    pub call_timeout: Option<Duration>,
    /// Upper bound on pending tasks. `None` means unbounded.
    pub max_queue_len: Option<usize>,
    /// Behavior when `max_queue_len` would be exceeded.
    pub overflow_policy: OverflowPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            context_window: DEFAULT_CONTEXT_WINDOW,
            call_timeout: Some(Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS)),
            max_queue_len: None,
            overflow_policy: OverflowPolicy::RejectNewest,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_queue_len(mut self, max_queue_len: Option<usize>, policy: OverflowPolicy) -> Self {
        self.max_queue_len = max_queue_len;
        self.overflow_policy = policy;
        self
    }
}

/// Why a run stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// No pending tasks were left.
    QueueExhausted,
    /// The iteration budget was spent while work was still queued.
    IterationCapReached,
    /// The caller cancelled the run.
    Cancelled,
    /// Generated work exceeded the queue bound under [`OverflowPolicy::StopRun`].
    QueueOverflow,
}

impl std::fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalReason::QueueExhausted => write!(f, "queue exhausted"),
            TerminalReason::IterationCapReached => write!(f, "iteration cap reached"),
            TerminalReason::Cancelled => write!(f, "cancelled"),
            TerminalReason::QueueOverflow => write!(f, "queue overflow"),
        }
    }
}

/// Events emitted by the scheduler as a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A run was accepted and seeded.
    RunStarted {
        run_id: Uuid,
        seeds: usize,
    },
    /// A task was handed to the executor.
    TaskStarted {
        /// One-based iteration number.
        iteration: usize,
        task_id: TaskId,
        name: String,
    },
    /// A task's result was recorded.
    TaskCompleted {
        task_id: TaskId,
        result: String,
    },
    /// Generated tasks were appended to the queue.
    TasksAdded {
        ids: Vec<TaskId>,
        queue_len: usize,
    },
    /// Generated tasks were dropped because the queue was full.
    TasksRejected {
        count: usize,
        queue_len: usize,
    },
    /// The run stopped without an error.
    RunFinished {
        reason: TerminalReason,
        completed: usize,
        queue_len: usize,
    },
}

/// Result of a run that stopped without an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub objective: String,
    /// Completed tasks in execution order.
    pub completed: Vec<Task>,
    /// Tasks still pending when the run stopped, head first.
    pub remaining: Vec<Task>,
    /// Task whose executor call was interrupted by cancellation.
    pub interrupted: Option<Task>,
    pub reason: TerminalReason,
    /// Number of tasks executed.
    pub iterations: usize,
    /// Generated tasks dropped because the queue was full.
    pub rejected: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// True when no pending work was left behind.
    pub fn is_queue_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Releases the running flag when a run ends, including when its future is dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ConcurrentRunRejected)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Driver of the execute, generate, requeue cycle.
///
/// The executor and generator are injected at construction. Each run owns
/// its own queue and result log, so one Scheduler can serve many runs in
/// sequence. Runs on the same instance may not overlap; a second call made
/// while one is in flight fails with [`Error::ConcurrentRunRejected`].
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use taskloop::orchestration::{NoFollowUp, Scheduler};
///
/// let scheduler = Scheduler::new(Arc::new(my_executor), Arc::new(NoFollowUp));
/// let outcome = scheduler
///     .run("ship the launch plan", &["draft timeline"], &CancellationToken::new())
///     .await?;
/// ```
pub struct Scheduler {
    executor: Arc<dyn Executor>,
    generator: Arc<dyn Generator>,
    config: SchedulerConfig,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
    running: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(executor: Arc<dyn Executor>, generator: Arc<dyn Generator>) -> Self {
        Self {
            executor,
            generator,
            config: SchedulerConfig::default(),
            event_tx: None,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Emit [`SchedulerEvent`]s on `event_tx`.
    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Check if a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run the loop with the configured iteration cap.
    pub async fn run<S: AsRef<str> + Sync>(
        &self,
        objective: &str,
        seeds: &[S],
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        self.run_with_limit(objective, seeds, self.config.max_iterations, cancel)
            .await
    }

    /// Run the loop, executing at most `max_iterations` tasks.
    ///
    /// Returns the completed tasks and the reason the run stopped. A failing
    /// executor or generator call aborts the run with
    /// [`Error::CapabilityFailure`], which still carries every task completed
    /// so far.
    pub async fn run_with_limit<S: AsRef<str> + Sync>(
        &self,
        objective: &str,
        seeds: &[S],
        max_iterations: usize,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let _guard = RunGuard::acquire(&self.running)?;

        if objective.trim().is_empty() {
            return Err(Error::InvalidInput("objective must not be empty".to_string()));
        }
        if max_iterations == 0 {
            return Err(Error::InvalidInput(
                "max_iterations must be positive".to_string(),
            ));
        }
        if let Some(pos) = seeds.iter().position(|s| s.as_ref().trim().is_empty()) {
            return Err(Error::InvalidInput(format!("seed task {} is empty", pos + 1)));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let window = self.config.context_window;

        let mut ids = IdAllocator::default();
        let mut queue = TaskQueue::new();
        for name in seeds {
            queue.push(Task::new(ids.next_id(), name.as_ref().trim()))?;
        }
        let mut log = ResultLog::new();
        let mut iterations = 0usize;
        let mut rejected = 0usize;
        let mut interrupted = None;

        tlog!(
            "Run {} started: objective={:?}, seeds={}, max_iterations={}",
            run_id,
            objective,
            queue.len(),
            max_iterations
        );
        self.emit(SchedulerEvent::RunStarted {
            run_id,
            seeds: queue.len(),
        });

        let reason = loop {
            if queue.is_empty() {
                break TerminalReason::QueueExhausted;
            }
            if iterations >= max_iterations {
                break TerminalReason::IterationCapReached;
            }
            if cancel.is_cancelled() {
                break TerminalReason::Cancelled;
            }
            let Some(mut task) = queue.pop() else {
                break TerminalReason::QueueExhausted;
            };

            task.start()?;
            tlog_debug!("[{}] Executing task {}: {}", iterations + 1, task.id, task.name);
            self.emit(SchedulerEvent::TaskStarted {
                iteration: iterations + 1,
                task_id: task.id,
                name: task.name.clone(),
            });

            let context = log.context(window);
            let executed = self
                .call(cancel, self.executor.execute(&task.name, &context))
                .await;
            let result = match executed {
                Ok(result) => result,
                Err(Error::Cancelled) => {
                    tlog_warn!("Run {} cancelled while executing task {}", run_id, task.id);
                    interrupted = Some(task);
                    break TerminalReason::Cancelled;
                }
                Err(e) => {
                    tlog_error!("Executor failed on task {}: {}", task.id, e);
                    return Err(Error::CapabilityFailure {
                        stage: RunStage::Execution,
                        task: Box::new(task),
                        completed: log.into_vec(),
                        source: Box::new(e),
                    });
                }
            };

            task.complete(&result)?;
            iterations += 1;
            self.emit(SchedulerEvent::TaskCompleted {
                task_id: task.id,
                result: result.clone(),
            });
            let finished = task.clone();
            log.append(task)?;

            let generated = self
                .call(
                    cancel,
                    self.generator
                        .generate(objective, &finished.name, &finished.result),
                )
                .await;
            let candidates = match generated {
                Ok(candidates) => normalize_candidates(candidates),
                Err(Error::Cancelled) => {
                    tlog_warn!("Run {} cancelled while generating tasks", run_id);
                    break TerminalReason::Cancelled;
                }
                Err(e) => {
                    tlog_error!("Generator failed after task {}: {}", finished.id, e);
                    return Err(Error::CapabilityFailure {
                        stage: RunStage::Generation,
                        task: Box::new(finished),
                        completed: log.into_vec(),
                        source: Box::new(e),
                    });
                }
            };

            let (added, dropped, overflowed) = self.enqueue(&mut queue, &mut ids, candidates)?;
            rejected += dropped;

            tlog_debug!(
                "Added {} new tasks, queue size {}",
                added.len(),
                queue.len()
            );
            if !added.is_empty() {
                self.emit(SchedulerEvent::TasksAdded {
                    ids: added,
                    queue_len: queue.len(),
                });
            }
            if dropped > 0 {
                tlog_warn!("Queue full, rejected {} generated tasks", dropped);
                self.emit(SchedulerEvent::TasksRejected {
                    count: dropped,
                    queue_len: queue.len(),
                });
            }
            if overflowed {
                break TerminalReason::QueueOverflow;
            }
        };

        tlog!(
            "Run {} finished: {} after {} tasks, {} still queued",
            run_id,
            reason,
            log.len(),
            queue.len()
        );
        self.emit(SchedulerEvent::RunFinished {
            reason,
            completed: log.len(),
            queue_len: queue.len(),
        });

        Ok(RunOutcome {
            run_id,
            objective: objective.to_string(),
            completed: log.into_vec(),
            remaining: queue.into_vec(),
            interrupted,
            reason,
            iterations,
            rejected,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Append generated tasks, honoring the queue bound.
    ///
    /// Returns the ids added, the number of candidates dropped, and whether
    /// the run should stop.
    fn enqueue(
        &self,
        queue: &mut TaskQueue,
        ids: &mut IdAllocator,
        candidates: Vec<String>,
    ) -> Result<(Vec<TaskId>, usize, bool)> {
        let mut added = Vec::with_capacity(candidates.len());
        let mut dropped = 0;

        for name in candidates {
            if let Some(max) = self.config.max_queue_len {
                if queue.len() >= max {
                    dropped += 1;
                    continue;
                }
            }
            let task = Task::new(ids.next_id(), &name);
            added.push(task.id);
            queue.push(task)?;
        }

        let overflowed = dropped > 0 && self.config.overflow_policy == OverflowPolicy::StopRun;
        Ok((added, dropped, overflowed))
    }

    /// Await a capability call under the configured timeout, racing cancellation.
    async fn call<T, F>(&self, cancel: &CancellationToken, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timed = async {
            match self.config.call_timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| Error::Timeout(limit))?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = timed => res,
        }
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
