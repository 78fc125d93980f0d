pub mod actor;
pub mod factor;

pub use actor::{
  Watchdog, WatchdogError,
  lifecycle::completion::{Completion, CompletionSignal, completion},
  pipeline::{PipelineConfig, PipelineError, PipelineResult, run_pipeline},
};
pub use factor::{FactorState, Step, largest_prime_divisor};
