//! localq CLI - demo producer / consumer for a filesystem queue.
//!
//! ```text
//! localq --queue-dir /tmp/q send --count 10
//! localq --queue-dir /tmp/q run --max-exec-sec 2 --rand-err-per 0.2
//! localq --queue-dir /tmp/q find --status error
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use localq_core::{
    Consumer, ExecutionError, Handler, QueueConfig, Registry, StatusFilter, Task, ValidationError,
};

#[derive(Parser)]
#[command(name = "localq", about = "Filesystem-backed task queue demo")]
struct Cli {
    /// Queue root directory (falls back to LOCALQ_ROOT)
    #[arg(long, global = true)]
    queue_dir: Option<PathBuf>,

    /// TOML config file; --queue-dir overrides its root
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seconds between scan cycles
    #[arg(long, global = true, default_value_t = 1.0)]
    throttle: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue print tasks
    Send {
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Name printed by the task; numbered when count > 1
        #[arg(long, default_value = "localq")]
        name: String,
    },
    /// Consume print tasks until Ctrl-C (or for a fixed number of cycles)
    Run {
        /// Upper bound of the random execution time
        #[arg(long, default_value_t = 5)]
        max_exec_sec: u64,
        /// Probability of a random task failure, 0.0 to 1.0
        #[arg(long, default_value_t = 0.0)]
        rand_err_per: f64,
        /// Stop after this many scan cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// List task instances by status
    Find {
        /// all | error | orphaned | open
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct PrintTask {
    name: String,
}

impl Task for PrintTask {
    const NAME: &'static str = "print";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("PrintTask.name is empty"));
        }
        Ok(())
    }
}

/// Sleeps a random time and fails at random.
struct PrintHandler {
    max_exec: Duration,
    rand_err_per: f64,
    runs: AtomicU64,
}

impl PrintHandler {
    fn new(max_exec_sec: u64, rand_err_per: f64) -> Self {
        Self {
            max_exec: Duration::from_secs(max_exec_sec),
            rand_err_per,
            runs: AtomicU64::new(0),
        }
    }

    fn raise_error(&self) -> bool {
        self.rand_err_per > 0.0 && rand::random::<f64>() <= self.rand_err_per
    }
}

#[async_trait]
impl Handler<PrintTask> for PrintHandler {
    async fn handle(&self, task: PrintTask) -> Result<(), ExecutionError> {
        let run = self.runs.fetch_add(1, Ordering::Relaxed);
        if self.raise_error() {
            warn!(run, name = %task.name, "TASK ERR");
            return Err(ExecutionError::new("a randomly selected error occurred"));
        }
        let exec = self.max_exec.mul_f64(rand::random::<f64>());
        tokio::time::sleep(exec).await;
        info!(run, name = %task.name, exec_ms = exec.as_millis() as u64, "TASK EXE");
        Ok(())
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<QueueConfig> {
    let mut config = match (&cli.config, &cli.queue_dir) {
        (Some(path), _) => QueueConfig::from_file(path)?,
        (None, Some(dir)) => QueueConfig::new(dir),
        (None, None) => QueueConfig::from_env()?,
    };
    if let Some(dir) = &cli.queue_dir {
        config.root = dir.clone();
    }
    config = config.with_poll_interval(throttle_interval(cli.throttle)?);
    config.validate()?;
    Ok(config)
}

/// `--throttle` seconds as a Duration; rejects negative, NaN and overflowing
/// values instead of panicking.
fn throttle_interval(secs: f64) -> anyhow::Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(interval) => Ok(interval),
        Err(e) => anyhow::bail!("--throttle must be a non-negative number of seconds: {e}"),
    }
}

fn init_tracing(config: &QueueConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_registry(config: QueueConfig, handler: PrintHandler) -> anyhow::Result<Registry> {
    let registry = Registry::builder(config)
        .register::<PrintTask, _>(handler)?
        .expect_tasks(&[PrintTask::NAME])
        .build()
        .await?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    match cli.command {
        Command::Send { count, name } => cmd_send(config, count, name).await,
        Command::Run {
            max_exec_sec,
            rand_err_per,
            cycles,
        } => cmd_run(config, max_exec_sec, rand_err_per, cycles).await,
        Command::Find { status } => cmd_find(config, status).await,
    }
}

async fn cmd_send(config: QueueConfig, count: u32, name: String) -> anyhow::Result<()> {
    let registry = open_registry(config, PrintHandler::new(0, 0.0)).await?;
    let tasks = registry.enqueue::<PrintTask>()?;
    for n in 1..=count {
        let name = if count > 1 { format!("{name} #{n}") } else { name.clone() };
        let instance = tasks.send(&PrintTask { name }).await?;
        println!("{}", instance.id());
    }
    Ok(())
}

async fn cmd_run(
    config: QueueConfig,
    max_exec_sec: u64,
    rand_err_per: f64,
    cycles: Option<u64>,
) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&rand_err_per) {
        anyhow::bail!("--rand-err-per must be between 0.0 and 1.0");
    }
    let interval = config.poll_interval();
    let registry = Arc::new(open_registry(config, PrintHandler::new(max_exec_sec, rand_err_per)).await?);

    if let Some(cycles) = cycles {
        for cycle in 1..=cycles {
            let report = registry.run_all_tasks().await;
            for e in report.errors.iter() {
                warn!(cycle, error = %e, "scan error");
            }
            if cycle < cycles {
                tokio::time::sleep(interval).await;
            }
        }
        return Ok(());
    }

    let consumer = Consumer::spawn(Arc::clone(&registry), interval);
    tokio::signal::ctrl_c().await?;
    info!("shutting down; waiting for running tasks");
    let cycles = consumer.shutdown_and_join().await?;
    info!(cycles, "consumer stopped");
    Ok(())
}

async fn cmd_find(config: QueueConfig, status: StatusFilter) -> anyhow::Result<()> {
    let registry = open_registry(config, PrintHandler::new(0, 0.0)).await?;
    for queue in registry.queues() {
        for instance in queue.find(status).await? {
            let state = instance.state().await;
            let errors = instance.errors().await?;
            match errors.last() {
                Some(last) => println!(
                    "{}\t{state:?}\terrors={}\t{}",
                    instance,
                    errors.count(),
                    last.message
                ),
                None => println!("{}\t{state:?}", instance),
            }
        }
    }
    Ok(())
}
