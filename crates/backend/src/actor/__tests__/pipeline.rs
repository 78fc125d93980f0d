//! End-to-end pipeline tests.
//!
//! Feed input through source, workers and sink and check the printed sum, the
//! completion report and the termination behaviour.

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use pretty_assertions::assert_eq;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio_util::sync::CancellationToken;

  use crate::actor::{
    __tests__::helpers::{PipelineTestContext, expected_sum, input_of},
    pipeline::{PipelineConfig, PipelineError, PipelineResult, run_pipeline},
  };

  // ==========================================================================
  // Reference Scenarios
  // ==========================================================================

  #[tokio::test]
  async fn test_one() {
    let run = PipelineTestContext::new().run("1\n").await;
    assert_eq!(run.output, "1\n");
  }

  #[tokio::test]
  async fn test_composite() {
    let run = PipelineTestContext::new().run("6\n").await;
    assert_eq!(run.output, "3\n");
  }

  #[tokio::test]
  async fn test_prime() {
    let run = PipelineTestContext::new().run("17\n").await;
    assert_eq!(run.output, "17\n");
  }

  #[tokio::test]
  async fn test_several_values() {
    let run = PipelineTestContext::new().run("2 3 4\n").await;
    assert_eq!(run.output, "7\n");
    assert_eq!(run.result(), PipelineResult { sum: 7, values_read: 3 });
  }

  #[tokio::test]
  async fn test_empty_input_prints_zero() {
    let run = PipelineTestContext::new().run("").await;
    assert_eq!(run.output, "0\n");
    assert_eq!(run.result(), PipelineResult { sum: 0, values_read: 0 });
  }

  /// A large prime needs many turns with a zero budget; the answer must not change.
  #[tokio::test]
  async fn test_yielding_worker_matches_direct_computation() {
    let values = [1_000_000_007, 999_999_937, 12];
    let run = PipelineTestContext::new()
      .with_turn_budget(Duration::ZERO)
      .run(&input_of(&values))
      .await;

    assert_eq!(run.result().sum, expected_sum(&values));
    assert_eq!(run.output, format!("{}\n", 1_000_000_007i64 + 999_999_937 + 3));
  }

  // ==========================================================================
  // Input Handling
  // ==========================================================================

  #[tokio::test]
  async fn test_non_positive_values_pass_through() {
    let run = PipelineTestContext::new().run("-5 0 6 -1").await;
    assert_eq!(run.output, "-3\n");
    assert_eq!(run.result().values_read, 4);
  }

  #[tokio::test]
  async fn test_unparsable_token_ends_input() {
    let run = PipelineTestContext::new().run("6 17\nabc 4\n").await;
    assert_eq!(run.output, "20\n");
    assert_eq!(run.result().values_read, 2);
  }

  // ==========================================================================
  // Termination & Counting
  // ==========================================================================

  #[tokio::test]
  async fn test_many_values_current_thread() {
    let values: Vec<i64> = (1..=500).collect();
    let run = PipelineTestContext::new().run(&input_of(&values)).await;

    assert_eq!(run.result().sum, expected_sum(&values));
    assert_eq!(run.result().values_read, values.len());
    assert_eq!(run.output.lines().count(), 1, "sum must be printed exactly once");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_many_values_multi_thread() {
    let values: Vec<i64> = (0..2_000).map(|i| i * 7_919 - 1_000).collect();
    let run = PipelineTestContext::new()
      .with_turn_budget(Duration::from_micros(50))
      .run(&input_of(&values))
      .await;

    assert_eq!(run.result().sum, expected_sum(&values));
    assert_eq!(run.result().values_read, values.len());
    assert_eq!(run.output.lines().count(), 1);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_runs_are_independent() {
    let ctx = PipelineTestContext::new();
    let (a, b) = tokio::join!(ctx.run("10 21"), ctx.run("35 2 2"));

    assert_eq!(a.output, "12\n");
    assert_eq!(b.output, "11\n");
  }

  // ==========================================================================
  // Host Teardown
  // ==========================================================================

  #[tokio::test]
  async fn test_cancel_abandons_run_and_stops_actors() {
    let (mut input_writer, input) = tokio::io::duplex(64);
    let (output, mut output_reader) = tokio::io::duplex(64);
    let cancel = CancellationToken::new();

    // Some values arrive, then the input stays open without ending
    input_writer.write_all(b"6 17 1000000007 ").await.unwrap();
    let run = tokio::spawn(run_pipeline(
      input,
      output,
      PipelineConfig {
        turn_budget: Duration::ZERO,
        watchdog_latency: None,
      },
      cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    assert!(matches!(run.await.unwrap(), Err(PipelineError::Cancelled)));

    // The sink dropped its output without writing a sum
    let mut printed = String::new();
    tokio::time::timeout(Duration::from_secs(1), output_reader.read_to_string(&mut printed))
      .await
      .expect("sink stops after cancel")
      .unwrap();
    assert_eq!(printed, "");
  }
}
