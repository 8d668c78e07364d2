//! Error types for the Foundry simulation, organized by subsystem:
//! statistics registry, shared channel, concurrency limiter, and unit
//! construction.
//!
//! Configuration and orchestration errors live next to the code that
//! raises them in `foundry-engine`.

use std::error::Error;
use std::fmt;

/// Errors from statistics registry lookups and lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatsError {
    /// No metric set was ever registered under this component name.
    ComponentNotFound {
        /// The component that was looked up.
        component: String,
    },
    /// The component exists but has no stream with this metric name.
    MetricNotFound {
        /// The owning component.
        component: String,
        /// The metric that was looked up.
        metric: String,
    },
    /// `reset_all()` was called while units of a run were still active.
    RunInProgress {
        /// Number of runs still holding the registry.
        active_runs: usize,
    },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComponentNotFound { component } => {
                write!(f, "component '{component}' not registered")
            }
            Self::MetricNotFound { component, metric } => {
                write!(f, "metric '{metric}' not registered for component '{component}'")
            }
            Self::RunInProgress { active_runs } => {
                write!(f, "cannot reset registry: {active_runs} run(s) still active")
            }
        }
    }
}

impl Error for StatsError {}

/// Why a blocking channel operation did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// The caller's cancel token fired while the operation was blocked.
    Cancelled,
    /// The opposite side of the channel has finished: no producer will
    /// ever put again (for `take`) or no consumer will ever take again
    /// (for `put`).
    Closed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "channel operation cancelled"),
            Self::Closed => write!(f, "channel closed"),
        }
    }
}

impl Error for ChannelError {}

/// A failed `put`: the item is handed back untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct PutError<T> {
    /// The item that was not enqueued.
    pub item: T,
    /// Why it was not enqueued.
    pub reason: ChannelError,
}

impl<T> PutError<T> {
    /// Discard the item, keeping only the reason.
    pub fn into_reason(self) -> ChannelError {
        self.reason
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutError")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "put failed: {}", self.reason)
    }
}

impl<T> Error for PutError<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.reason)
    }
}

/// Errors from acquiring a concurrency-limiter permit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireError {
    /// The caller's cancel token fired while waiting for a permit.
    Cancelled,
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "permit acquisition cancelled"),
        }
    }
}

impl Error for AcquireError {}

/// Errors from constructing a unit through the type-tag factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitError {
    /// The type tag does not name a known unit kind.
    UnknownKind {
        /// The tag as supplied.
        tag: String,
    },
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind { tag } => write!(f, "unknown unit type: {tag}"),
        }
    }
}

impl Error for UnitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_error_keeps_item() {
        let err = PutError {
            item: "widget",
            reason: ChannelError::Cancelled,
        };
        assert_eq!(err.item, "widget");
        assert_eq!(err.to_string(), "put failed: channel operation cancelled");
        assert_eq!(err.into_reason(), ChannelError::Cancelled);
    }

    #[test]
    fn stats_error_messages_name_the_lookup() {
        let err = StatsError::MetricNotFound {
            component: "Robot-1".into(),
            metric: "ItemsMoved".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Robot-1"));
        assert!(msg.contains("ItemsMoved"));
    }
}
