//! Source coordinator - reads values, spawns workers, detects completion.

use std::time::Duration;

use tokio::{
  io::AsyncRead,
  sync::mpsc,
  task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::{
  PipelineError,
  reader::IntReader,
  worker::{FactorWorker, WorkerReport},
};
use crate::actor::{
  handle::{SinkHandle, SourceHandle},
  lifecycle::completion::CompletionSignal,
  message::SourceMessage,
};

/// Reads one value per turn and spawns one worker per value.
///
/// Tracks outstanding workers and sends the sink its shutdown once input is
/// exhausted and every worker has reported done. Both conditions are only
/// observed inside this actor's message loop, so the shutdown fires once.
///
/// Workers run in a `JoinSet` owned by the coordinator: a panicking worker is
/// a protocol violation, and workers still running when the coordinator stops
/// are aborted with it.
pub struct SourceActor<R> {
  reader: IntReader<R>,
  rx: mpsc::UnboundedReceiver<SourceMessage>,
  /// Own inbox, used for wake-ups and handed to workers
  handle: SourceHandle,
  sink: SinkHandle,
  signal: CompletionSignal,
  turn_budget: Duration,
  /// Workers spawned but not yet done
  pending: usize,
  values_read: usize,
  input_exhausted: bool,
  workers: JoinSet<WorkerReport>,
  cancel: CancellationToken,
}

impl<R> SourceActor<R>
where
  R: AsyncRead + Unpin + Send + 'static,
{
  pub fn new(
    input: R,
    sink: SinkHandle,
    signal: CompletionSignal,
    turn_budget: Duration,
    rx: mpsc::UnboundedReceiver<SourceMessage>,
    handle: SourceHandle,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      reader: IntReader::new(input),
      rx,
      handle,
      sink,
      signal,
      turn_budget,
      pending: 0,
      values_read: 0,
      input_exhausted: false,
      workers: JoinSet::new(),
      cancel,
    }
  }

  /// Spawn the coordinator and return a handle to its inbox
  pub fn spawn(
    input: R,
    sink: SinkHandle,
    signal: CompletionSignal,
    turn_budget: Duration,
    cancel: CancellationToken,
  ) -> SourceHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SourceHandle::new(tx);
    let actor = Self::new(input, sink, signal, turn_budget, rx, handle.clone(), cancel);
    tokio::spawn(actor.run());
    handle
  }

  /// Main actor loop
  ///
  /// Runs until the sink has been told to shut down, a protocol violation is
  /// detected, or the host cancels the run.
  pub async fn run(mut self) {
    debug!(turn_budget_ms = self.turn_budget.as_millis(), "Source coordinator started");

    if let Err(e) = self.handle.wakeup() {
      error!(error = %e, "Source coordinator could not schedule its first read");
      return;
    }

    let cancel = self.cancel.clone();
    loop {
      let outcome = tokio::select! {
        biased;

        _ = cancel.cancelled() => {
          debug!(pending = self.pending, "Source coordinator cancelled");
          break;
        }

        Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => self.handle_joined(joined),

        msg = self.rx.recv() => match msg {
          // A read may wait on a slow input, so it stays cancellable too
          Some(SourceMessage::Wakeup) => tokio::select! {
            biased;

            _ = cancel.cancelled() => {
              debug!(pending = self.pending, "Source coordinator cancelled while reading");
              break;
            }
            outcome = self.handle_wakeup() => outcome,
          },
          Some(SourceMessage::Done) => self.handle_done(),
          None => break,
        },
      };

      match outcome {
        Ok(true) => break,
        Ok(false) => {}
        Err(e) => {
          error!(error = %e, pending = self.pending, "Source coordinator failed");
          self.signal.fail(e);
          break;
        }
      }
    }

    debug!(values_read = self.values_read, "Source coordinator stopped");
  }

  /// Read one value. Returns true once the sink has been shut down.
  async fn handle_wakeup(&mut self) -> Result<bool, PipelineError> {
    match self.reader.next_value().await {
      Some(value) => {
        let id = self.values_read;
        self.values_read += 1;
        self.pending += 1;
        trace!(worker_id = id, value, pending = self.pending, "Spawning worker");

        let worker = FactorWorker::new(
          id,
          value,
          self.turn_budget,
          self.handle.clone(),
          self.sink.clone(),
          self.signal.clone(),
        );
        self.workers.spawn(worker.run());

        self
          .handle
          .wakeup()
          .map_err(|e| PipelineError::ProtocolViolation(format!("source could not reschedule itself: {e}")))?;
        Ok(false)
      }
      None => {
        debug!(
          values_read = self.values_read,
          pending = self.pending,
          "Input exhausted"
        );
        self.input_exhausted = true;
        self.try_finish()
      }
    }
  }

  fn handle_done(&mut self) -> Result<bool, PipelineError> {
    self.pending = self
      .pending
      .checked_sub(1)
      .ok_or_else(|| PipelineError::ProtocolViolation("done-notice with no outstanding worker".to_string()))?;
    trace!(pending = self.pending, "Worker done");
    self.try_finish()
  }

  fn handle_joined(&mut self, joined: Result<WorkerReport, JoinError>) -> Result<bool, PipelineError> {
    match joined {
      Ok(report) => {
        trace!(result = report.result, turns = report.turns, "Worker reaped");
        Ok(false)
      }
      Err(e) if e.is_panic() => Err(PipelineError::ProtocolViolation(format!(
        "worker panicked before reporting: {e}"
      ))),
      Err(e) => {
        debug!(error = %e, "Worker task cancelled");
        Ok(false)
      }
    }
  }

  fn try_finish(&mut self) -> Result<bool, PipelineError> {
    if !self.input_exhausted || self.pending > 0 {
      return Ok(false);
    }

    debug!(values_read = self.values_read, "All workers done, shutting down sink");
    self
      .sink
      .shutdown(self.values_read)
      .map_err(|e| PipelineError::ProtocolViolation(format!("sink gone before shutdown: {e}")))?;
    Ok(true)
  }
}
