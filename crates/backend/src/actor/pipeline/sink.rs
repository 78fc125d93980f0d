//! Sink aggregator - sums worker results and emits the total once.

use tokio::{
  io::{AsyncWrite, AsyncWriteExt},
  sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use super::{PipelineError, PipelineResult};
use crate::actor::{handle::SinkHandle, lifecycle::completion::CompletionSignal, message::SinkMessage};

/// Owns the running sum. No other actor reads or writes it.
///
/// On shutdown the sink writes the sum followed by a newline, resolves the
/// completion and stops. Anything still queued behind the shutdown is a
/// protocol violation. Cancellation stops it without printing anything.
pub struct SinkActor<W> {
  rx: mpsc::UnboundedReceiver<SinkMessage>,
  output: W,
  signal: CompletionSignal,
  sum: i64,
  values_received: usize,
  cancel: CancellationToken,
}

impl<W> SinkActor<W>
where
  W: AsyncWrite + Unpin + Send + 'static,
{
  pub fn new(
    output: W,
    signal: CompletionSignal,
    rx: mpsc::UnboundedReceiver<SinkMessage>,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      rx,
      output,
      signal,
      sum: 0,
      values_received: 0,
      cancel,
    }
  }

  /// Spawn the sink and return a handle to its inbox
  pub fn spawn(output: W, signal: CompletionSignal, cancel: CancellationToken) -> SinkHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let actor = Self::new(output, signal, rx, cancel);
    tokio::spawn(actor.run());
    SinkHandle::new(tx)
  }

  pub async fn run(mut self) {
    debug!("Sink aggregator started");

    loop {
      let msg = tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          debug!(values_received = self.values_received, "Sink aggregator cancelled");
          return;
        }
        msg = self.rx.recv() => msg,
      };
      let Some(msg) = msg else {
        break;
      };

      match msg {
        SinkMessage::Value(value) => {
          // Overflow wraps at 64 bits
          self.sum = self.sum.wrapping_add(value);
          self.values_received += 1;
          trace!(value, sum = self.sum, "Sink received value");
        }
        SinkMessage::Shutdown { values_read } => {
          self.finish(values_read).await;
          return;
        }
      }
    }

    warn!(
      values_received = self.values_received,
      "Sink inbox closed without shutdown"
    );
  }

  async fn finish(mut self, values_read: usize) {
    // Nothing may follow the shutdown. Close first so late senders fail too.
    self.rx.close();
    let mut late = 0usize;
    while let Ok(msg) = self.rx.try_recv() {
      error!(?msg, "Sink received message after shutdown");
      late += 1;
    }

    if late > 0 {
      self.signal.fail(PipelineError::ProtocolViolation(format!(
        "{late} message(s) queued after sink shutdown"
      )));
      return;
    }

    if self.values_received != values_read {
      error!(
        values_read,
        values_received = self.values_received,
        "Sink shut down before receiving every value"
      );
      self.signal.fail(PipelineError::ProtocolViolation(format!(
        "sink received {} of {} values before shutdown",
        self.values_received, values_read
      )));
      return;
    }

    if let Err(e) = self.emit().await {
      error!(error = %e, "Failed to write sum");
      self.signal.fail(PipelineError::Io(e));
      return;
    }

    debug!(sum = self.sum, values_read, "Sink aggregator complete");
    self.signal.complete(PipelineResult {
      sum: self.sum,
      values_read,
    });
  }

  async fn emit(&mut self) -> std::io::Result<()> {
    let line = format!("{}\n", self.sum);
    self.output.write_all(line.as_bytes()).await?;
    self.output.flush().await
  }
}

#[cfg(test)]
mod tests {
  use tokio::io::AsyncReadExt;

  use super::*;
  use crate::actor::lifecycle::completion::completion;

  #[tokio::test]
  async fn test_sums_and_writes_once() {
    let (writer, mut reader) = tokio::io::duplex(64);
    let (signal, completion) = completion();
    let sink = SinkActor::spawn(writer, signal, CancellationToken::new());

    sink.value(3).unwrap();
    sink.value(-4).unwrap();
    sink.value(17).unwrap();
    sink.shutdown(3).unwrap();

    let result = completion.wait().await.unwrap();
    assert_eq!(result.sum, 16);
    assert_eq!(result.values_read, 3);

    let mut output = String::new();
    reader.read_to_string(&mut output).await.unwrap();
    assert_eq!(output, "16\n");
  }

  #[tokio::test]
  async fn test_empty_sum_is_zero() {
    let (writer, mut reader) = tokio::io::duplex(64);
    let (signal, completion) = completion();
    let sink = SinkActor::spawn(writer, signal, CancellationToken::new());

    sink.shutdown(0).unwrap();

    assert_eq!(completion.wait().await.unwrap().sum, 0);
    let mut output = String::new();
    reader.read_to_string(&mut output).await.unwrap();
    assert_eq!(output, "0\n");
  }

  #[tokio::test]
  async fn test_message_after_shutdown_is_violation() {
    let (writer, mut reader) = tokio::io::duplex(64);
    let (signal, completion) = completion();
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = SinkHandle::new(tx);

    // Queue everything before the actor runs so the late value is already buffered
    sink.value(5).unwrap();
    sink.shutdown(1).unwrap();
    sink.value(9).unwrap();
    SinkActor::new(writer, signal, rx, CancellationToken::new()).run().await;

    assert!(matches!(
      completion.wait().await,
      Err(PipelineError::ProtocolViolation(_))
    ));
    // Nothing was printed
    let mut output = String::new();
    reader.read_to_string(&mut output).await.unwrap();
    assert!(output.is_empty());
    // And the inbox is closed for good
    assert!(sink.value(1).is_err());
  }

  #[tokio::test]
  async fn test_missing_value_is_violation() {
    let (writer, _reader) = tokio::io::duplex(64);
    let (signal, completion) = completion();
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = SinkHandle::new(tx);

    sink.value(2).unwrap();
    sink.shutdown(2).unwrap();
    SinkActor::new(writer, signal, rx, CancellationToken::new()).run().await;

    assert!(matches!(
      completion.wait().await,
      Err(PipelineError::ProtocolViolation(_))
    ));
  }

  #[tokio::test]
  async fn test_sum_wraps_on_overflow() {
    let (writer, _reader) = tokio::io::duplex(64);
    let (signal, completion) = completion();
    let sink = SinkActor::spawn(writer, signal, CancellationToken::new());

    sink.value(i64::MAX).unwrap();
    sink.value(2).unwrap();
    sink.shutdown(2).unwrap();

    assert_eq!(completion.wait().await.unwrap().sum, i64::MIN + 1);
  }

  #[tokio::test]
  async fn test_cancel_stops_sink_without_output() {
    let (writer, mut reader) = tokio::io::duplex(64);
    let (signal, completion) = completion();
    let cancel = CancellationToken::new();
    let sink = SinkActor::spawn(writer, signal, cancel.clone());

    sink.value(4).unwrap();
    cancel.cancel();

    // The sink drops its output when it stops, closing the stream
    let mut output = String::new();
    tokio::time::timeout(std::time::Duration::from_secs(1), reader.read_to_string(&mut output))
      .await
      .expect("sink stops once cancelled")
      .unwrap();
    assert!(output.is_empty());

    drop(sink);
    assert!(matches!(completion.wait().await, Err(PipelineError::Abandoned)));
  }
}
