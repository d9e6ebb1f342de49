//! Configuration for stack lifecycles

use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default format of the timestamp suffix in synthesized run names
pub const DEFAULT_RUN_NAME_TIMESTAMP_FORMAT: &str = "%d_%h_%y-%H_%M_%S_%f";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Lifecycle configuration shared by every run on a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// strftime format for the timestamp in default run names
    #[serde(default = "default_run_name_timestamp_format")]
    pub run_name_timestamp_format: String,

    /// Require every component to support the orchestrator's execution mode
    #[serde(default = "default_true")]
    pub enforce_execution_mode: bool,

    /// Clean up components whose run preparation completed when a later
    /// component fails `prepare_pipeline_run`
    #[serde(default)]
    pub cleanup_after_failed_preparation: bool,

    /// Capacity of the lifecycle event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            run_name_timestamp_format: default_run_name_timestamp_format(),
            enforce_execution_mode: true,
            cleanup_after_failed_preparation: false,
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_run_name_timestamp_format() -> String {
    DEFAULT_RUN_NAME_TIMESTAMP_FORMAT.to_string()
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LifecycleConfig {
    /// Load configuration from defaults, an optional file and `KEEL_*` variables
    ///
    /// Nested keys use a double underscore, e.g. `KEEL_LOGGING__JSON=true`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        builder = builder.add_source(::config::Config::try_from(&LifecycleConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("KEEL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: LifecycleConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run fail or panic later
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_name_timestamp_format.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "run_name_timestamp_format must not be empty".into(),
            ));
        }

        if StrftimeItems::new(&self.run_name_timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "run_name_timestamp_format `{}` is not a valid strftime format",
                self.run_name_timestamp_format
            )));
        }

        if !has_second_resolution(&self.run_name_timestamp_format) {
            return Err(ConfigError::Invalid(format!(
                "run_name_timestamp_format `{}` must include seconds or a finer field",
                self.run_name_timestamp_format
            )));
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be > 0".into()));
        }

        Ok(())
    }
}

/// Does the format render at least one second-or-finer field?
///
/// Default run names of back-to-back runs must differ, so `%Y-%m-%d` or a
/// plain literal is not enough.
fn has_second_resolution(format: &str) -> bool {
    StrftimeItems::new(format).any(|item| {
        matches!(
            item,
            Item::Numeric(Numeric::Second | Numeric::Timestamp | Numeric::Nanosecond, _)
                | Item::Fixed(
                    Fixed::Nanosecond
                        | Fixed::Nanosecond3
                        | Fixed::Nanosecond6
                        | Fixed::Nanosecond9
                        | Fixed::RFC2822
                        | Fixed::RFC3339
                        | Fixed::Internal(_)
                )
        )
    })
}
