//! Actor-based factorization pipeline
//!
//! Components communicate only by message passing. Each counter has exactly
//! one owner:
//!
//! - the source coordinator owns the pending-worker count and the
//!   input-exhausted flag
//! - the sink aggregator owns the running sum
//!
//! # Actors
//!
//! - [`SourceActor`](pipeline::SourceActor): reads values, spawns one worker each, detects completion
//! - [`FactorWorker`](pipeline::FactorWorker): computes one largest prime divisor in bounded turns
//! - [`SinkActor`](pipeline::SinkActor): sums results, prints the total, resolves the completion
//! - [`Watchdog`]: off the data path, asserts the scheduler keeps resuming tasks promptly
//!
//! Every unit of work runs on its own tokio task. Suspension is always an
//! explicit yield or self-sent wake-up, never a blocking wait.

pub mod handle;
pub mod lifecycle;
pub mod message;
pub mod pipeline;
mod watchdog;

#[cfg(test)]
mod __tests__;

pub use watchdog::{Watchdog, WatchdogError};
