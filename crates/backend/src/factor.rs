//! Resumable largest-prime-divisor computation.
//!
//! Trial division is split into turns so that a worker can hand control back to
//! the scheduler mid-computation and pick up exactly where it stopped. All loop
//! state lives in [`FactorState`]; nothing is lost between turns.

use std::time::{Duration, Instant};

/// Iterations run between two clock reads inside [`FactorState::step`].
const SLICE_ITERATIONS: usize = 256;

/// Outcome of one bounded turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// The turn budget ran out; call `step` again on a later turn.
  Yield,
  /// The computation finished with this result.
  Done(i64),
}

/// Trial-division state for one input value.
///
/// `largest` never decreases and `divisor` never decreases. The loop runs while
/// `divisor * divisor <= remaining`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorState {
  remaining: i64,
  divisor: i64,
  largest: i64,
}

impl FactorState {
  pub fn new(value: i64) -> Self {
    Self {
      remaining: value,
      divisor: 2,
      largest: 1,
    }
  }

  pub fn remaining(&self) -> i64 {
    self.remaining
  }

  pub fn divisor(&self) -> i64 {
    self.divisor
  }

  pub fn largest(&self) -> i64 {
    self.largest
  }

  /// Run at most `max_iterations` loop iterations.
  ///
  /// Returns the final divisor once the loop condition fails. Values below 1
  /// are returned unchanged without any factorization.
  pub fn advance(&mut self, max_iterations: usize) -> Option<i64> {
    if self.remaining < 1 {
      return Some(self.remaining);
    }

    for _ in 0..max_iterations {
      if !self.should_continue() {
        return Some(self.finish());
      }

      if self.remaining % self.divisor == 0 {
        // Same divisor is retried next iteration, it may divide again.
        self.largest = self.divisor;
        self.remaining /= self.divisor;
      } else {
        self.divisor += 1;
      }
    }

    (!self.should_continue()).then(|| self.finish())
  }

  /// Run until finished or until wall time for this turn exceeds `budget`.
  pub fn step(&mut self, budget: Duration) -> Step {
    let started = Instant::now();

    loop {
      if let Some(result) = self.advance(SLICE_ITERATIONS) {
        return Step::Done(result);
      }
      if started.elapsed() > budget {
        return Step::Yield;
      }
    }
  }

  fn should_continue(&self) -> bool {
    // An overflowing square is larger than any i64 remainder.
    self
      .divisor
      .checked_mul(self.divisor)
      .is_some_and(|square| square <= self.remaining)
  }

  fn finish(&self) -> i64 {
    if self.remaining > 1 { self.remaining } else { self.largest }
  }
}

/// Compute the largest prime divisor of `value` in one go, without yielding.
///
/// Returns 1 for 1 and `value` itself for values below 1.
pub fn largest_prime_divisor(value: i64) -> i64 {
  let mut state = FactorState::new(value);
  loop {
    if let Some(result) = state.advance(usize::MAX) {
      return result;
    }
  }
}
