pub mod config;

pub use config::{Config, ConfigError, LogConfig, PipelineSettings, RuntimeFlavor, RuntimeSettings, WatchdogSettings};
