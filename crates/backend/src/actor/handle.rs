//! Actor handles for communicating with actors
//!
//! Handles are cheap to clone and wrap the actor's inbox sender. Inboxes are
//! unbounded: actors send themselves wake-ups, and a full bounded inbox would
//! block the only task able to drain it.

use tokio::sync::mpsc;

use super::message::{SinkMessage, SourceMessage};

// ============================================================================
// Source Handle
// ============================================================================

/// Handle to communicate with the source coordinator
#[derive(Clone, Debug)]
pub struct SourceHandle {
  pub tx: mpsc::UnboundedSender<SourceMessage>,
}

impl SourceHandle {
  /// Create a new handle from a sender
  pub fn new(tx: mpsc::UnboundedSender<SourceMessage>) -> Self {
    Self { tx }
  }

  pub fn send(&self, msg: SourceMessage) -> Result<(), SendError> {
    self.tx.send(msg).map_err(|_| SendError::ActorGone)
  }

  /// Schedule another read turn
  pub fn wakeup(&self) -> Result<(), SendError> {
    self.send(SourceMessage::Wakeup)
  }

  /// Report that a worker finished
  pub fn done(&self) -> Result<(), SendError> {
    self.send(SourceMessage::Done)
  }
}

// ============================================================================
// Sink Handle
// ============================================================================

/// Handle to communicate with the sink aggregator
#[derive(Clone, Debug)]
pub struct SinkHandle {
  pub tx: mpsc::UnboundedSender<SinkMessage>,
}

impl SinkHandle {
  /// Create a new handle from a sender
  pub fn new(tx: mpsc::UnboundedSender<SinkMessage>) -> Self {
    Self { tx }
  }

  pub fn send(&self, msg: SinkMessage) -> Result<(), SendError> {
    self.tx.send(msg).map_err(|_| SendError::ActorGone)
  }

  /// Add a value to the running sum
  pub fn value(&self, value: i64) -> Result<(), SendError> {
    self.send(SinkMessage::Value(value))
  }

  /// Tell the sink to emit the sum and finish
  pub fn shutdown(&self, values_read: usize) -> Result<(), SendError> {
    self.send(SinkMessage::Shutdown { values_read })
  }
}

// ============================================================================
// Errors
// ============================================================================

/// Error when sending to an actor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
  #[error("Actor has shut down")]
  ActorGone,
}
