//! Pipeline runs with the liveness watchdog attached.

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::actor::{
    WatchdogError,
    __tests__::helpers::{PipelineTestContext, StallingInput},
    pipeline::PipelineError,
  };

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_watchdog_does_not_disturb_healthy_run() {
    let run = PipelineTestContext::new()
      .with_watchdog(Duration::from_secs(2))
      .run("2 3 4 1000000007")
      .await;

    assert_eq!(run.output, "1000000014\n");
  }

  /// An input that blocks the only scheduler thread must abort the run.
  #[tokio::test]
  async fn test_starved_scheduler_fails_run() {
    let input = StallingInput::new("6 17", Duration::from_millis(150));
    let run = PipelineTestContext::new()
      .with_watchdog(Duration::from_millis(30))
      .run_reader(input)
      .await;

    match run.outcome {
      Err(PipelineError::Latency(WatchdogError::LatencyExceeded { expected, observed })) => {
        assert_eq!(expected, Duration::from_millis(30));
        assert!(observed >= Duration::from_millis(150));
      }
      other => panic!("expected latency violation, got {other:?}"),
    }
  }
}
