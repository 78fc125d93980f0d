//! Configuration for the primesum pipeline.
//!
//! Config priority: explicit `--config` file > user (~/.config/primesum/config.toml) > defaults.
//! Every value is read once at startup; nothing here is reconfigured while the pipeline runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse config {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
  #[error("Invalid config: {0}")]
  Invalid(String),
}

// ============================================================================
// Pipeline Configuration
// ============================================================================

/// Worker scheduling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
  /// Compute budget per worker turn in milliseconds (default: 10)
  ///
  /// A worker that runs longer than this yields and resumes on a later turn.
  pub turn_budget_ms: u64,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self { turn_budget_ms: 10 }
  }
}

impl PipelineSettings {
  pub fn turn_budget(&self) -> Duration {
    Duration::from_millis(self.turn_budget_ms)
  }
}

// ============================================================================
// Watchdog Configuration
// ============================================================================

/// Liveness watchdog settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
  /// Run the watchdog alongside the pipeline (default: false)
  pub enabled: bool,

  /// Maximum allowed delay between two watchdog wake-ups in milliseconds (default: 1000)
  pub max_latency_ms: u64,
}

impl Default for WatchdogSettings {
  fn default() -> Self {
    Self {
      enabled: false,
      max_latency_ms: 1000,
    }
  }
}

impl WatchdogSettings {
  /// The latency bound to enforce, or `None` when the watchdog is disabled.
  pub fn max_latency(&self) -> Option<Duration> {
    self.enabled.then(|| Duration::from_millis(self.max_latency_ms))
  }
}

// ============================================================================
// Runtime Configuration
// ============================================================================

/// Which tokio scheduler drives the actors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFlavor {
  CurrentThread,
  #[default]
  MultiThread,
}

impl RuntimeFlavor {
  /// Name as written in the config file
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::CurrentThread => "current_thread",
      Self::MultiThread => "multi_thread",
    }
  }
}

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeSettings {
  /// Scheduler flavor (default: multi_thread)
  pub flavor: RuntimeFlavor,

  /// Worker threads for the multi-threaded scheduler (0 = one per CPU)
  pub worker_threads: usize,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Log level: off, error, warn, info, debug, trace (default: info)
  ///
  /// `RUST_LOG` takes precedence when set.
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
  #[serde(default)]
  pub pipeline: PipelineSettings,

  #[serde(default)]
  pub watchdog: WatchdogSettings,

  #[serde(default)]
  pub runtime: RuntimeSettings,

  #[serde(default)]
  pub log: LogConfig,
}

impl Config {
  /// Load config from an explicit path. Missing or malformed files are errors.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Load the user-level config if one exists.
  ///
  /// Returns `Ok(None)` when there is no user config file.
  pub fn load_user() -> Result<Option<Self>, ConfigError> {
    match Self::user_config_path() {
      Some(path) if path.exists() => Self::load(&path).map(Some),
      _ => Ok(None),
    }
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PRIMESUM_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("primesum").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("primesum").join("config.toml"))
  }

  /// Reject values the pipeline cannot run with.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.watchdog.enabled && self.watchdog.max_latency_ms == 0 {
      return Err(ConfigError::Invalid(
        "watchdog.max_latency_ms must be greater than 0 when the watchdog is enabled".to_string(),
      ));
    }
    Ok(())
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Self::default();

    format!(
      r#"# primesum configuration
# Place in ~/.config/primesum/config.toml or pass with --config

# ============================================================================
# Pipeline
# ============================================================================

[pipeline]
# Compute budget per worker turn (milliseconds).
# A factorization running longer than this yields and resumes later.
turn_budget_ms = {turn_budget_ms}

# ============================================================================
# Liveness Watchdog
# ============================================================================

[watchdog]
# Abort when the scheduler fails to resume the watchdog within max_latency_ms
enabled = {watchdog_enabled}
max_latency_ms = {max_latency_ms}

# ============================================================================
# Scheduler
# ============================================================================

[runtime]
# current_thread or multi_thread
flavor = "{flavor}"

# Worker threads for multi_thread (0 = one per CPU)
worker_threads = {worker_threads}

# ============================================================================
# Logging
# ============================================================================

[log]
# off, error, warn, info, debug, trace (RUST_LOG overrides)
level = "{level}"
"#,
      turn_budget_ms = defaults.pipeline.turn_budget_ms,
      watchdog_enabled = defaults.watchdog.enabled,
      max_latency_ms = defaults.watchdog.max_latency_ms,
      flavor = defaults.runtime.flavor.as_str(),
      worker_threads = defaults.runtime.worker_threads,
      level = defaults.log.level,
    )
  }
}
