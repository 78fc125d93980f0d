//! Run command - sums the largest prime divisors of the input values

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use primesum::{PipelineConfig, PipelineResult, run_pipeline};
use primesum_core::{Config, RuntimeFlavor, RuntimeSettings};
use tokio::{io::AsyncRead, runtime::Runtime, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::logging::init_logging;

/// Options for a pipeline run. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
  /// Read values from FILE instead of stdin
  #[arg(short, long, value_name = "FILE")]
  pub input: Option<PathBuf>,
  /// Config file (default: user config, if present)
  #[arg(short, long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// Compute budget per worker turn in milliseconds
  #[arg(long, value_name = "MS")]
  pub turn_budget_ms: Option<u64>,
  /// Enable the liveness watchdog with this latency bound
  #[arg(long, value_name = "MS")]
  pub watchdog_latency_ms: Option<u64>,
  /// Run everything on a single scheduler thread
  #[arg(long)]
  pub current_thread: bool,
  /// Scheduler worker threads (0 = one per CPU)
  #[arg(long, value_name = "N")]
  pub workers: Option<usize>,
  /// Log level (off, error, warn, info, debug, trace)
  #[arg(long, value_name = "LEVEL")]
  pub log_level: Option<String>,
  /// Write logs to FILE instead of stderr
  #[arg(long, value_name = "FILE")]
  pub log_file: Option<PathBuf>,
}

impl RunArgs {
  /// Apply command-line overrides on top of the loaded config
  pub fn apply(&self, config: &mut Config) {
    if let Some(ms) = self.turn_budget_ms {
      config.pipeline.turn_budget_ms = ms;
    }
    if let Some(ms) = self.watchdog_latency_ms {
      config.watchdog.enabled = true;
      config.watchdog.max_latency_ms = ms;
    }
    if self.current_thread {
      config.runtime.flavor = RuntimeFlavor::CurrentThread;
    }
    if let Some(workers) = self.workers {
      config.runtime.worker_threads = workers;
    }
    if let Some(ref level) = self.log_level {
      config.log.level = level.clone();
    }
  }
}

pub fn cmd_run(args: RunArgs) -> Result<()> {
  let (mut config, load_warning) = load_config(args.config.as_deref())?;
  args.apply(&mut config);
  config.validate().context("Invalid configuration")?;

  let _guard = init_logging(&config.log.level, args.log_file.as_deref())?;
  if let Some(warning) = load_warning {
    warn!("{}", warning);
  }
  debug!(config = ?config, "Configuration loaded");

  let runtime = build_runtime(&config.runtime).context("Failed to build scheduler")?;
  let outcome = runtime.block_on(run(args.input, PipelineConfig::from_config(&config)));

  // Do not wait on a stdin reader still parked in the blocking pool
  runtime.shutdown_background();

  let result = outcome?;
  debug!(sum = result.sum, values_read = result.values_read, "Run complete");
  Ok(())
}

async fn run(input: Option<PathBuf>, config: PipelineConfig) -> Result<PipelineResult> {
  let cancel = CancellationToken::new();

  // Handle ctrl-c gracefully
  let cancel_for_signal = cancel.clone();
  tokio::spawn(async move {
    if let Err(e) = signal::ctrl_c().await {
      warn!("Failed to listen for ctrl-c: {}", e);
      return;
    }
    info!("Received ctrl-c, shutting down...");
    cancel_for_signal.cancel();
  });

  let input: Box<dyn AsyncRead + Unpin + Send> = match input {
    Some(path) => Box::new(
      tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("Failed to open input {}", path.display()))?,
    ),
    None => Box::new(tokio::io::stdin()),
  };

  run_pipeline(input, tokio::io::stdout(), config, cancel)
    .await
    .context("Pipeline failed")
}

/// Load the config to run with.
///
/// An explicit path must load. Otherwise the user config is used when present;
/// a broken user config falls back to defaults and the returned warning says why.
fn load_config(path: Option<&Path>) -> Result<(Config, Option<String>)> {
  if let Some(path) = path {
    let config = Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))?;
    return Ok((config, None));
  }

  match Config::load_user() {
    Ok(Some(config)) => Ok((config, None)),
    Ok(None) => Ok((Config::default(), None)),
    Err(e) => Ok((Config::default(), Some(format!("Ignoring user config, using defaults: {e}")))),
  }
}

fn build_runtime(settings: &RuntimeSettings) -> std::io::Result<Runtime> {
  let mut builder = match settings.flavor {
    RuntimeFlavor::CurrentThread => tokio::runtime::Builder::new_current_thread(),
    RuntimeFlavor::MultiThread => {
      let mut builder = tokio::runtime::Builder::new_multi_thread();
      builder.worker_threads(worker_threads(settings));
      builder
    }
  };
  builder.thread_name("primesum-worker").enable_all().build()
}

fn worker_threads(settings: &RuntimeSettings) -> usize {
  match settings.worker_threads {
    0 => num_cpus::get(),
    n => n,
  }
}
