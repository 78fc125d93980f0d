//! Factorization Pipeline
//!
//! One source coordinator, one transient worker per input value, one sink
//! aggregator:
//!
//! ```text
//! input → Source ──spawn──► Worker × N ──Value──► Sink → output
//!           ▲                   │                   ▲
//!           └──────Done─────────┘                   │
//!           └──────────────Shutdown─────────────────┘
//! ```
//!
//! The source counts outstanding workers. Once input is exhausted and the
//! count is back to zero it tells the sink to shut down; the sink prints the
//! sum and resolves the [`Completion`](crate::actor::lifecycle::completion::Completion).
//!
//! Workers split long factorizations into turns bounded by
//! [`PipelineConfig::turn_budget`] and yield to the scheduler between turns.

mod reader;
mod sink;
mod source;
mod worker;

use std::time::Duration;

use primesum_core::Config;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use self::{
  reader::IntReader,
  sink::SinkActor,
  source::SourceActor,
  worker::{FactorWorker, WorkerReport},
};
use super::{
  lifecycle::completion::completion,
  watchdog::{Watchdog, WatchdogError},
};

/// Runtime settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
  /// Compute budget per worker turn
  pub turn_budget: Duration,
  /// Watchdog latency bound; `None` runs without a watchdog
  pub watchdog_latency: Option<Duration>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self::from_config(&Config::default())
  }
}

impl PipelineConfig {
  pub fn from_config(config: &Config) -> Self {
    Self {
      turn_budget: config.pipeline.turn_budget(),
      watchdog_latency: config.watchdog.max_latency(),
    }
  }
}

/// Run the pipeline over `input`, writing the sum to `output`.
///
/// Wires up the sink, the source and (if configured) the watchdog, then waits
/// for the completion. Cancelling `cancel` abandons the run: every actor stops
/// and in-flight workers are aborted, nothing is printed.
///
/// All actors share a child of `cancel` that is cancelled once this returns, so
/// nothing outlives the call after a failure either.
pub async fn run_pipeline<R, W>(
  input: R,
  output: W,
  config: PipelineConfig,
  cancel: CancellationToken,
) -> Result<PipelineResult, PipelineError>
where
  R: AsyncRead + Unpin + Send + 'static,
  W: AsyncWrite + Unpin + Send + 'static,
{
  debug!(config = ?config, "Starting pipeline");

  let (signal, completion) = completion();
  let pipeline_cancel = cancel.child_token();

  let watchdog = config
    .watchdog_latency
    .map(|max_latency| Watchdog::new(max_latency).spawn(signal.clone(), pipeline_cancel.clone()));

  let sink = SinkActor::spawn(output, signal.clone(), pipeline_cancel.clone());
  SourceActor::spawn(input, sink, signal, config.turn_budget, pipeline_cancel.clone());

  let mut outcome = tokio::select! {
    biased;

    _ = cancel.cancelled() => Err(PipelineError::Cancelled),
    outcome = completion.wait() => outcome,
  };

  // Stop the watchdog and any actor still running. A violation the watchdog saw
  // during the run is fatal even if the sink finished first.
  pipeline_cancel.cancel();
  if let Some(handle) = watchdog {
    match handle.await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => outcome = Err(PipelineError::Latency(e)),
      Err(e) => warn!(error = %e, "Watchdog task failed"),
    }
  }

  match &outcome {
    Ok(result) => info!(sum = result.sum, values_read = result.values_read, "Pipeline complete"),
    Err(e) => warn!(error = %e, "Pipeline failed"),
  }

  outcome
}

/// Result of running the pipeline
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineResult {
  /// Sum of every worker result
  pub sum: i64,
  /// Number of values read from input (one worker each)
  pub values_read: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Protocol violation: {0}")]
  ProtocolViolation(String),
  #[error("Watchdog: {0}")]
  Latency(#[from] WatchdogError),
  #[error("Pipeline abandoned: every actor stopped without a result")]
  Abandoned,
  #[error("Pipeline cancelled")]
  Cancelled,
}
