//! Simulation configuration.
//!
//! A simulation file describes one clock, one integer source and any number
//! of values reading from that source:
//!
//! ```yaml
//! seed: 12345
//! clock:
//!   interval: 100ms
//! source:
//!   type: int_range
//!   min: 1
//!   max: 10
//! values:
//!   - name: accumulated
//!     transforms:
//!       - type: accumulate
//!   - name: reset_on_read
//!     transforms:
//!       - type: accumulate
//!     reset_on_read: true
//!     trace: true
//! read:
//!   interval: 500ms
//!   count: 10
//! ```
//!
//! Omitting `seed` seeds the random source from the wall clock.

pub mod duration;

pub use duration::{format_duration, parse_duration};

use serde::{Deserialize, Serialize};
use simval_core::{Accumulate, Clamp, Difference, FaultPolicy, Transform};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Malformed duration string
    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Semantically invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete description of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master seed for random sources; time-derived when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub source: SourceConfig,

    /// Values fed by the source, in start order.
    pub values: Vec<ValueConfig>,

    #[serde(default)]
    pub read: ReadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// Time between ticks.
    #[serde(with = "duration::serde_format", default = "default_tick_interval")]
    pub interval: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            interval: default_tick_interval(),
        }
    }
}

/// How the source computes a value from each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Same value on every tick
    Constant { value: i64 },

    /// `start + tick sequence`
    Sequential {
        #[serde(default)]
        start: i64,
    },

    /// Uniform random integer, both bounds inclusive
    IntRange { min: i64, max: i64 },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::IntRange { min: 1, max: 10 }
    }
}

/// One transform step of a value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Add the input to the prior state
    Accumulate,

    /// Change since the previous input
    Difference,

    /// Bound the input to `[min, max]`
    Clamp { min: i64, max: i64 },
}

impl TransformConfig {
    /// Build a fresh transform instance.
    pub fn build(&self) -> Box<dyn Transform<i64>> {
        match self {
            TransformConfig::Accumulate => Box::new(Accumulate::new()),
            TransformConfig::Difference => Box::new(Difference::new()),
            TransformConfig::Clamp { min, max } => Box::new(Clamp::new(*min, *max)),
        }
    }
}

/// What a value does after a transform fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    #[default]
    Continue,
    Halt,
}

impl From<OnFailure> for FaultPolicy {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Continue => FaultPolicy::Continue,
            OnFailure::Halt => FaultPolicy::Halt,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValueConfig {
    /// Unique name, used in reports and trace output.
    pub name: String,

    #[serde(default)]
    pub transforms: Vec<TransformConfig>,

    /// Starting state, also the state restored by each read when
    /// `reset_on_read` is set.
    #[serde(default)]
    pub initial: i64,

    #[serde(default)]
    pub reset_on_read: bool,

    /// Log every update through the trace hook.
    #[serde(default)]
    pub trace: bool,

    #[serde(default)]
    pub on_failure: OnFailure,
}

impl ValueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transforms: Vec::new(),
            initial: 0,
            reset_on_read: false,
            trace: false,
            on_failure: OnFailure::default(),
        }
    }

    pub fn with_transform(mut self, transform: TransformConfig) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn with_initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_reset_on_read(mut self) -> Self {
        self.reset_on_read = true;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    pub fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }
}

/// How often the runner reads every value, and how many times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReadConfig {
    #[serde(with = "duration::serde_format", default = "default_read_interval")]
    pub interval: Duration,

    #[serde(default = "default_read_count")]
    pub count: u32,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            interval: default_read_interval(),
            count: default_read_count(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_read_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_read_count() -> u32 {
    10
}

impl Default for SimulationConfig {
    /// Random integers 1..=10 every 100ms into a running total and a traced
    /// reset-on-read window, read ten times every 500ms.
    fn default() -> Self {
        Self {
            seed: Some(12345),
            clock: ClockConfig::default(),
            source: SourceConfig::default(),
            values: vec![
                ValueConfig::new("accumulated").with_transform(TransformConfig::Accumulate),
                ValueConfig::new("reset_on_read")
                    .with_transform(TransformConfig::Accumulate)
                    .with_reset_on_read()
                    .with_trace(),
            ],
            read: ReadConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Set the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed random sources from the wall clock.
    pub fn with_time_seed(mut self) -> Self {
        self.seed = None;
        self
    }

    /// Set the clock tick interval.
    pub fn with_clock_interval(mut self, interval: Duration) -> Self {
        self.clock.interval = interval;
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Replace all values.
    pub fn with_values(mut self, values: Vec<ValueConfig>) -> Self {
        self.values = values;
        self
    }

    /// Set the time between reads.
    pub fn with_read_interval(mut self, interval: Duration) -> Self {
        self.read.interval = interval;
        self
    }

    /// Set the number of reads.
    pub fn with_read_count(mut self, count: u32) -> Self {
        self.read.count = count;
        self
    }

    /// Check everything serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "clock.interval must be greater than zero".to_string(),
            ));
        }
        if self.read.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "read.interval must be greater than zero".to_string(),
            ));
        }
        if let SourceConfig::IntRange { min, max } = self.source {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "source range min {min} exceeds max {max}"
                )));
            }
        }
        if self.values.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one value must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for value in &self.values {
            if value.name.trim().is_empty() {
                return Err(ConfigError::Invalid("value name must not be empty".to_string()));
            }
            if !names.insert(value.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate value name '{}'",
                    value.name
                )));
            }
            for transform in &value.transforms {
                if let TransformConfig::Clamp { min, max } = transform {
                    if min > max {
                        return Err(ConfigError::Invalid(format!(
                            "value '{}': clamp min {min} exceeds max {max}",
                            value.name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
