//! Actor message types for the factorization pipeline
//!
//! Every actor owns an unbounded `mpsc` inbox and processes one message at a
//! time. Delivery between a given sender and receiver is FIFO.
//!
//! ```text
//! Source ──spawn──► Worker ──Value──► Sink
//!   ▲                  │                ▲
//!   └──────Done────────┘                │
//!   └────────────────Shutdown───────────┘
//! ```

// ============================================================================
// Source Coordinator Messages
// ============================================================================

/// A message for the source coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMessage {
  /// Self-scheduled: read the next value from input
  Wakeup,
  /// A worker has reported its result and finished
  Done,
}

// ============================================================================
// Sink Aggregator Messages
// ============================================================================

/// A message for the sink aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMessage {
  /// A worker's final divisor (or a passed-through non-positive value)
  Value(i64),
  /// Input is exhausted and every worker has finished. Must be the last message.
  Shutdown {
    /// Number of values the source read, for the completion report
    values_read: usize,
  },
}
