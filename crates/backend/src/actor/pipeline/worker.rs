//! Factorization worker - computes the largest prime divisor of one value.

use std::time::Duration;

use tracing::{error, trace};

use super::PipelineError;
use crate::{
  actor::{
    handle::{SendError, SinkHandle, SourceHandle},
    lifecycle::completion::CompletionSignal,
  },
  factor::{FactorState, Step},
};

/// What a finished worker reports back to whoever awaited its task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
  pub result: i64,
  /// Number of scheduling turns the computation took
  pub turns: usize,
}

/// A transient worker owning one value.
///
/// Each turn runs trial division until the turn budget is spent, then yields
/// back to the scheduler with all state kept in the worker. When finished it
/// sends exactly one value to the sink and exactly one done-notice to the
/// source, then ends.
pub struct FactorWorker {
  id: usize,
  value: i64,
  state: FactorState,
  budget: Duration,
  source: SourceHandle,
  sink: SinkHandle,
  signal: CompletionSignal,
}

impl FactorWorker {
  pub fn new(
    id: usize,
    value: i64,
    budget: Duration,
    source: SourceHandle,
    sink: SinkHandle,
    signal: CompletionSignal,
  ) -> Self {
    Self {
      id,
      value,
      state: FactorState::new(value),
      budget,
      source,
      sink,
      signal,
    }
  }

  pub async fn run(mut self) -> WorkerReport {
    trace!(worker_id = self.id, value = self.value, "Worker starting");
    let mut turns = 1;

    let result = loop {
      match self.state.step(self.budget) {
        Step::Done(result) => break result,
        Step::Yield => {
          trace!(
            worker_id = self.id,
            turns,
            divisor = self.state.divisor(),
            "Worker turn budget spent, yielding"
          );
          turns += 1;
          tokio::task::yield_now().await;
        }
      }
    };

    if let Err(e) = self.report(result) {
      error!(worker_id = self.id, value = self.value, error = %e, "Worker could not report result");
      self.signal.fail(PipelineError::ProtocolViolation(format!(
        "worker {} for value {} outlived its recipients",
        self.id, self.value
      )));
    }

    trace!(worker_id = self.id, value = self.value, result, turns, "Worker finished");
    WorkerReport { result, turns }
  }

  fn report(&self, result: i64) -> Result<(), SendError> {
    // Value first: the source only shuts the sink down after this done-notice,
    // so the value is already queued ahead of the shutdown.
    self.sink.value(result)?;
    self.source.done()
  }
}
