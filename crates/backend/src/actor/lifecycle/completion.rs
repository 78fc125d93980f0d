//! Process completion signal.
//!
//! The host receives a [`Completion`] when the pipeline is wired up and waits on
//! it to know when to stop driving the scheduler. The sink aggregator resolves
//! it with the final sum; fatal conditions (protocol violations, watchdog
//! latency violations) resolve it with an error instead.
//!
//! Every actor holds a clone of the signal, so several outcomes may be sent.
//! The host only ever sees the first one; later outcomes are discarded.

use tokio::sync::mpsc;
use tracing::trace;

use crate::actor::pipeline::{PipelineError, PipelineResult};

/// Final outcome delivered to the host
pub type Outcome = Result<PipelineResult, PipelineError>;

/// Create a connected signal/completion pair.
pub fn completion() -> (CompletionSignal, Completion) {
  let (tx, rx) = mpsc::unbounded_channel();
  (CompletionSignal { tx }, Completion { rx })
}

/// Sending half, held by the actors
#[derive(Clone, Debug)]
pub struct CompletionSignal {
  tx: mpsc::UnboundedSender<Outcome>,
}

impl CompletionSignal {
  /// Resolve with the final result. Only the sink aggregator calls this, as
  /// the last thing it does.
  pub fn complete(self, result: PipelineResult) {
    if self.tx.send(Ok(result)).is_err() {
      trace!("Completion already dropped by host");
    }
  }

  /// Resolve with a fatal error.
  pub fn fail(&self, error: PipelineError) {
    if self.tx.send(Err(error)).is_err() {
      trace!("Completion already dropped by host");
    }
  }
}

/// Receiving half, held by the host
#[derive(Debug)]
pub struct Completion {
  rx: mpsc::UnboundedReceiver<Outcome>,
}

impl Completion {
  /// Wait for the first outcome. Anything sent after it is dropped unread.
  ///
  /// Yields `PipelineError::Abandoned` if every signal was dropped without
  /// resolving, which means an actor task died.
  pub async fn wait(mut self) -> Outcome {
    self.rx.recv().await.unwrap_or(Err(PipelineError::Abandoned))
  }
}
