//! Test helpers for pipeline integration tests.
//!
//! Provides `PipelineTestContext`, which runs the full pipeline over an
//! in-memory input and captures what the sink writes.

use std::{
  io::Cursor,
  pin::Pin,
  task::{Context, Poll},
  time::Duration,
};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;

use crate::{
  actor::pipeline::{PipelineConfig, PipelineError, PipelineResult, run_pipeline},
  factor::largest_prime_divisor,
};

/// Outcome of one pipeline run plus everything written to output
pub struct PipelineRun {
  pub outcome: Result<PipelineResult, PipelineError>,
  pub output: String,
}

impl PipelineRun {
  /// The successful result; panics with the error otherwise.
  pub fn result(&self) -> PipelineResult {
    match &self.outcome {
      Ok(result) => *result,
      Err(e) => panic!("pipeline failed: {e}"),
    }
  }
}

/// Test context for pipeline integration tests.
pub struct PipelineTestContext {
  pub config: PipelineConfig,
}

impl PipelineTestContext {
  /// Default turn budget, no watchdog.
  pub fn new() -> Self {
    Self {
      config: PipelineConfig {
        turn_budget: Duration::from_millis(10),
        watchdog_latency: None,
      },
    }
  }

  pub fn with_turn_budget(mut self, budget: Duration) -> Self {
    self.config.turn_budget = budget;
    self
  }

  pub fn with_watchdog(mut self, max_latency: Duration) -> Self {
    self.config.watchdog_latency = Some(max_latency);
    self
  }

  /// Run the pipeline over a text input.
  pub async fn run(&self, input: &str) -> PipelineRun {
    self.run_reader(Cursor::new(input.as_bytes().to_vec())).await
  }

  /// Run the pipeline over an arbitrary reader.
  pub async fn run_reader<R>(&self, input: R) -> PipelineRun
  where
    R: AsyncRead + Unpin + Send + 'static,
  {
    let (writer, mut reader) = tokio::io::duplex(1024);
    let outcome = run_pipeline(input, writer, self.config.clone(), CancellationToken::new()).await;

    // The sink drops its writer when it ends, which closes the stream
    let mut output = String::new();
    if outcome.is_ok() {
      reader.read_to_string(&mut output).await.expect("read pipeline output");
    }

    PipelineRun { outcome, output }
  }
}

/// Render values the way a user would feed them on stdin.
pub fn input_of(values: &[i64]) -> String {
  values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n")
}

/// Sum computed without the pipeline.
pub fn expected_sum(values: &[i64]) -> i64 {
  values
    .iter()
    .map(|&v| largest_prime_divisor(v))
    .fold(0, i64::wrapping_add)
}

/// Reader that blocks its thread once before yielding data, starving a
/// single-threaded scheduler.
pub struct StallingInput {
  inner: Cursor<Vec<u8>>,
  stall: Option<Duration>,
}

impl StallingInput {
  pub fn new(input: &str, stall: Duration) -> Self {
    Self {
      inner: Cursor::new(input.as_bytes().to_vec()),
      stall: Some(stall),
    }
  }
}

impl AsyncRead for StallingInput {
  fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
    if let Some(stall) = self.stall.take() {
      std::thread::sleep(stall);
    }
    Pin::new(&mut self.inner).poll_read(cx, buf)
  }
}
