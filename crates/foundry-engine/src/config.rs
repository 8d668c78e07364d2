//! Simulation input, validated configuration, and configuration errors.
//!
//! [`SimulationInput`] is the raw string-keyed store callers fill in.
//! [`SimulationConfig::from_input`] turns it into a typed configuration
//! and [`validate()`](SimulationConfig::validate) checks it before any
//! unit starts.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;

/// Input keys understood by [`SimulationConfig::from_input`].
pub mod keys {
    /// Run length in whole seconds. Required.
    pub const TIME: &str = "Time";
    /// Actions each unit performs per second. Required, positive.
    pub const ACTIONS_PER_SECOND: &str = "ActionsPerSecond";
    /// Number of producer units.
    pub const NUM_PRODUCERS: &str = "NumProducers";
    /// Number of consumer units.
    pub const NUM_CONSUMERS: &str = "NumConsumers";
    /// Alias of [`NUM_PRODUCERS`].
    pub const NUM_BELTS: &str = "NumBelts";
    /// Alias of [`NUM_CONSUMERS`].
    pub const NUM_ROBOTS: &str = "NumRobots";
    /// Capacity of the shared channel.
    pub const CHANNEL_CAPACITY: &str = "ChannelCapacity";
    /// Consumer actions allowed to run at once.
    pub const CONSUMER_PERMITS: &str = "ConsumerPermits";
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building or validating a [`SimulationConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent.
    Missing {
        /// The missing key.
        key: String,
    },
    /// A key is present but its value is not an integer.
    NotAnInteger {
        /// The offending key.
        key: String,
        /// The value as supplied.
        value: String,
    },
    /// `Time` is negative.
    NegativeTime {
        /// The value as parsed.
        value: i64,
    },
    /// `ActionsPerSecond` is zero, negative, or does not fit in a `u32`.
    InvalidRate {
        /// The value as parsed.
        value: i64,
    },
    /// Channel capacity is zero.
    ZeroCapacity,
    /// Consumer permit count is zero.
    ZeroPermits,
    /// `Time * ActionsPerSecond` overflows `u64`.
    TooManyActions {
        /// Configured run length.
        time_secs: u64,
        /// Configured rate.
        actions_per_second: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing required input '{key}'"),
            Self::NotAnInteger { key, value } => {
                write!(f, "input '{key}' must be an integer, got '{value}'")
            }
            Self::NegativeTime { value } => {
                write!(f, "{} must not be negative, got {value}", keys::TIME)
            }
            Self::InvalidRate { value } => {
                write!(f, "{} must be positive, got {value}", keys::ACTIONS_PER_SECOND)
            }
            Self::ZeroCapacity => write!(f, "channel capacity must be at least 1"),
            Self::ZeroPermits => write!(f, "consumer permits must be at least 1"),
            Self::TooManyActions {
                time_secs,
                actions_per_second,
            } => write!(
                f,
                "{time_secs}s at {actions_per_second} actions/s overflows the action counter"
            ),
        }
    }
}

impl Error for ConfigError {}

// ── SimulationInput ────────────────────────────────────────────────

/// String-keyed, multi-valued raw input.
///
/// Keys keep insertion order. Unknown keys are carried along untouched so
/// callers and custom behaviors can read their own settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimulationInput {
    entries: IndexMap<String, Vec<String>>,
}

impl SimulationInput {
    /// An empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rows of `[key, value, value, ...]`. Empty rows are skipped.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input = Self::new();
        for row in rows {
            let mut cells = row.into_iter().map(Into::into);
            if let Some(key) = cells.next() {
                input.add_input(key, cells);
            }
        }
        input
    }

    /// Set `key` to `values`, replacing any previous values.
    pub fn add_input<S: Into<String>>(
        &mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.entries
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Set `key` to a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries.insert(key.into(), vec![value.to_string()]);
        self
    }

    /// All values of `key`.
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// First value of `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.values(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// First value of `key` parsed as an integer.
    pub fn integer(&self, key: &str) -> Result<i64, ConfigError> {
        let raw = self.text(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })?;
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::NotAnInteger {
                key: key.to_string(),
                value: raw.to_string(),
            })
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for SimulationInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut input = Self::new();
        for (k, v) in iter {
            input.set(k, v);
        }
        input
    }
}

// ── SimulationConfig ───────────────────────────────────────────────

/// Validated settings of one simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Run length in seconds.
    pub time_secs: u64,
    /// Actions per unit per second. Must be positive.
    pub actions_per_second: u32,
    /// Producer units to start. Default: 1.
    pub producers: usize,
    /// Consumer units to start. Default: 3.
    pub consumers: usize,
    /// Capacity of the shared channel. Default: 10.
    pub channel_capacity: usize,
    /// Consumer actions allowed at once. Default: 2.
    pub consumer_permits: usize,
}

impl SimulationConfig {
    /// Default number of producers.
    pub const DEFAULT_PRODUCERS: usize = 1;
    /// Default number of consumers.
    pub const DEFAULT_CONSUMERS: usize = 3;
    /// Default shared channel capacity.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;
    /// Default consumer permit count.
    pub const DEFAULT_CONSUMER_PERMITS: usize = 2;

    /// A configuration with the given timing and default counts.
    pub fn new(time_secs: u64, actions_per_second: u32) -> Self {
        Self {
            time_secs,
            actions_per_second,
            producers: Self::DEFAULT_PRODUCERS,
            consumers: Self::DEFAULT_CONSUMERS,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            consumer_permits: Self::DEFAULT_CONSUMER_PERMITS,
        }
    }

    /// Set the unit counts.
    pub fn with_units(mut self, producers: usize, consumers: usize) -> Self {
        self.producers = producers;
        self.consumers = consumers;
        self
    }

    /// Parse and validate a raw input.
    ///
    /// `Time` and `ActionsPerSecond` are required. Unit counts, channel
    /// capacity and permits fall back to their defaults when absent or
    /// unparsable; `NumBelts` / `NumRobots` are read when the canonical
    /// keys are absent.
    pub fn from_input(input: &SimulationInput) -> Result<Self, ConfigError> {
        let time = input.integer(keys::TIME)?;
        let time_secs = u64::try_from(time).map_err(|_| ConfigError::NegativeTime { value: time })?;

        let rate = input.integer(keys::ACTIONS_PER_SECOND)?;
        let actions_per_second = u32::try_from(rate)
            .ok()
            .filter(|&r| r > 0)
            .ok_or(ConfigError::InvalidRate { value: rate })?;

        let config = Self {
            time_secs,
            actions_per_second,
            producers: optional_count(
                input,
                &[keys::NUM_PRODUCERS, keys::NUM_BELTS],
                Self::DEFAULT_PRODUCERS,
            ),
            consumers: optional_count(
                input,
                &[keys::NUM_CONSUMERS, keys::NUM_ROBOTS],
                Self::DEFAULT_CONSUMERS,
            ),
            channel_capacity: optional_count(
                input,
                &[keys::CHANNEL_CAPACITY],
                Self::DEFAULT_CHANNEL_CAPACITY,
            ),
            consumer_permits: optional_count(
                input,
                &[keys::CONSUMER_PERMITS],
                Self::DEFAULT_CONSUMER_PERMITS,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actions_per_second == 0 {
            return Err(ConfigError::InvalidRate { value: 0 });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.consumer_permits == 0 {
            return Err(ConfigError::ZeroPermits);
        }
        if self
            .time_secs
            .checked_mul(u64::from(self.actions_per_second))
            .is_none()
        {
            return Err(ConfigError::TooManyActions {
                time_secs: self.time_secs,
                actions_per_second: self.actions_per_second,
            });
        }
        Ok(())
    }

    /// Actions each unit performs over the run: `Time * ActionsPerSecond`.
    pub fn total_actions(&self) -> u64 {
        self.time_secs
            .saturating_mul(u64::from(self.actions_per_second))
    }

    /// Target wall-clock time between action starts: `1s / ActionsPerSecond`.
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.actions_per_second.max(1)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// First parseable non-negative value among `aliases`, else `default`.
///
/// Aliases are tried in order; a present but malformed key is skipped in
/// favour of the next one.
fn optional_count(input: &SimulationInput, aliases: &[&str], default: usize) -> usize {
    for key in aliases.iter().copied().filter(|k| input.contains(k)) {
        match input.integer(key).map(usize::try_from) {
            Ok(Ok(n)) => return n,
            _ => log::warn!(
                "ignoring {key}={:?}",
                input.text(key).unwrap_or_default()
            ),
        }
    }
    default
}
