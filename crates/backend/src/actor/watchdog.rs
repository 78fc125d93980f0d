//! Liveness watchdog
//!
//! Not part of the data path. The watchdog yields back to the scheduler on
//! every turn and measures how long it took to be resumed. A gap above the
//! configured bound means the scheduler is starved (some task is not yielding)
//! and is fatal: the violation resolves the completion with an error and the
//! host exits.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::{lifecycle::completion::CompletionSignal, pipeline::PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WatchdogError {
  #[error("Latency too big: expected at most {expected:?} between wake-ups, observed {observed:?}")]
  LatencyExceeded { expected: Duration, observed: Duration },
}

/// Self-rescheduling latency check.
///
/// Runs until a violation or until the host cancels it while tearing down.
#[derive(Debug)]
pub struct Watchdog {
  max_latency: Duration,
  wakeups: u64,
}

impl Watchdog {
  pub fn new(max_latency: Duration) -> Self {
    Self {
      max_latency,
      wakeups: 0,
    }
  }

  pub async fn run(mut self, cancel: CancellationToken) -> Result<(), WatchdogError> {
    debug!(max_latency_ms = self.max_latency.as_millis(), "Watchdog started");
    let mut last = Instant::now();

    loop {
      tokio::task::yield_now().await;

      let now = Instant::now();
      let observed = now.duration_since(last);
      if observed > self.max_latency {
        error!(
          expected_ms = self.max_latency.as_millis(),
          observed_ms = observed.as_millis(),
          wakeups = self.wakeups,
          "Scheduler latency bound violated"
        );
        return Err(WatchdogError::LatencyExceeded {
          expected: self.max_latency,
          observed,
        });
      }

      // The gap is checked first so a stall right before teardown still counts.
      if cancel.is_cancelled() {
        debug!(wakeups = self.wakeups, "Watchdog stopped (cancelled)");
        return Ok(());
      }

      last = now;
      self.wakeups += 1;
    }
  }

  /// Spawn the watchdog; a violation also fails the pipeline completion.
  pub fn spawn(self, signal: CompletionSignal, cancel: CancellationToken) -> JoinHandle<Result<(), WatchdogError>> {
    tokio::spawn(async move {
      let result = self.run(cancel).await;
      if let Err(e) = result {
        signal.fail(PipelineError::Latency(e));
      }
      result
    })
  }
}
