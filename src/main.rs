use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use taskloop::config::Config;
use taskloop::orchestration::{
    ClaudeExecutor, ClaudeGenerator, ClaudeHeadless, OverflowPolicy, Scheduler, SchedulerConfig,
};
use taskloop::util::read_task_file;
use taskloop::{report, tlog, tlog_warn, Error, Result};

/// taskloop - autonomous task loop driven by Claude Code
#[derive(Parser, Debug)]
#[command(name = "taskloop")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TASKLOOP_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.taskloop/taskloop.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Work towards an objective until the task queue drains or the budget runs out
    Run {
        /// The objective guiding task generation
        objective: String,

        /// Seed task (repeatable). Defaults to the objective itself
        #[arg(short = 't', long = "task")]
        tasks: Vec<String>,

        /// File with seed tasks, one per line
        #[arg(short = 'f', long)]
        tasks_file: Option<PathBuf>,

        /// Maximum number of tasks to execute
        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// Number of recent results passed as context
        #[arg(long)]
        context_window: Option<usize>,

        /// Timeout per Claude call in seconds (0 disables)
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum number of pending tasks
        #[arg(long)]
        max_queue: Option<usize>,

        /// Stop the run instead of dropping tasks when the queue is full
        #[arg(long, requires = "max_queue")]
        stop_on_overflow: bool,

        /// Print JSON instead of progress text
        #[arg(long)]
        headless: bool,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    taskloop::log::init_with_debug(cli.debug);

    match cli.command {
        Command::Run {
            objective,
            tasks,
            tasks_file,
            max_iterations,
            context_window,
            timeout,
            max_queue,
            stop_on_overflow,
            headless,
        } => {
            let config = Config::load()?;
            let mut scheduler_config = config.scheduler_config();
            apply_overrides(
                &mut scheduler_config,
                max_iterations,
                context_window,
                timeout,
                max_queue,
                stop_on_overflow,
            );

            let mut seeds = tasks;
            if let Some(path) = tasks_file {
                seeds.extend(read_task_file(&path)?);
            }
            if seeds.is_empty() {
                seeds.push(objective.clone());
            }

            run_objective(&config, scheduler_config, objective, seeds, headless)
        }
        Command::Config => show_config(),
    }
}

fn apply_overrides(
    config: &mut SchedulerConfig,
    max_iterations: Option<usize>,
    context_window: Option<usize>,
    timeout: Option<u64>,
    max_queue: Option<usize>,
    stop_on_overflow: bool,
) {
    if let Some(n) = max_iterations {
        config.max_iterations = n;
    }
    if let Some(n) = context_window {
        config.context_window = n;
    }
    if let Some(secs) = timeout {
        config.call_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if max_queue.is_some() {
        config.max_queue_len = max_queue;
    }
    if stop_on_overflow {
        config.overflow_policy = OverflowPolicy::StopRun;
    }
}

fn run_objective(
    config: &Config,
    scheduler_config: SchedulerConfig,
    objective: String,
    seeds: Vec<String>,
    headless: bool,
) -> Result<()> {
    tlog!(
        "Run command: objective={:?}, seeds={}, headless={}",
        objective,
        seeds.len(),
        headless
    );

    // The scheduler bounds each call; the process timeout is only a backstop.
    let mut claude = ClaudeHeadless::from_command(config.effective_command())?
        .with_model(config.model.clone())
        .with_workdir(std::env::current_dir()?);
    if let Some(limit) = scheduler_config.call_timeout {
        claude = claude.with_timeout(limit + Duration::from_secs(5));
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(
            Arc::new(ClaudeExecutor::new(claude.clone())),
            Arc::new(ClaudeGenerator::new(claude)),
        )
        .with_config(scheduler_config)
        .with_events(event_tx);

        let printer = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if headless {
                    continue;
                }
                if let Some(line) = report::progress_line(&event) {
                    println!("{}", line);
                }
            }
        });

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tlog_warn!("Interrupt received, cancelling run");
                ctrl_c.cancel();
            }
        });

        if !headless {
            println!("=== TASKLOOP: {} ===\n", objective);
        }
        let result = scheduler.run(&objective, &seeds, &cancel).await;

        // Dropping the scheduler closes the event channel and ends the printer.
        drop(scheduler);
        let _ = printer.await;

        match result {
            Ok(outcome) => {
                if headless {
                    println!("{}", report::to_json(&outcome)?);
                } else {
                    println!("\n{}", report::summary(&outcome));
                }
                Ok(())
            }
            Err(err @ Error::CapabilityFailure { .. }) => {
                if !headless {
                    println!("\n{}", report::partial_summary(err.completed_tasks()));
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    })
}

fn show_config() -> Result<()> {
    let path = Config::config_path()?;
    let config = Config::load()?;
    let scheduler = config.scheduler_config();

    println!("Config file:     {}", path.display());
    println!("Command:         {}", config.effective_command());
    println!("Model:           {}", config.model.as_deref().unwrap_or("(default)"));
    println!("Max iterations:  {}", scheduler.max_iterations);
    println!("Context window:  {}", scheduler.context_window);
    match scheduler.call_timeout {
        Some(limit) => println!("Call timeout:    {}s", limit.as_secs()),
        None => println!("Call timeout:    disabled"),
    }
    match scheduler.max_queue_len {
        Some(max) => println!("Max queue:       {} ({:?})", max, scheduler.overflow_policy),
        None => println!("Max queue:       unbounded"),
    }
    Ok(())
}
