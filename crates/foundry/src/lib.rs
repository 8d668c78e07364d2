//! Foundry: a concurrent factory simulation.
//!
//! Units (conveyor belts and robots) run fixed-rate action loops on their
//! own threads, hand items over through a bounded channel, share a
//! consumer concurrency limiter, and record every measurement into a
//! run-scoped statistics registry with synchronous observers.
//!
//! This is the facade crate that re-exports the public API of the
//! `foundry-*` sub-crates.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use foundry::prelude::*;
//!
//! let registry = StatisticsRegistry::new();
//! registry.register_observer(LoggingObserver);
//!
//! let mut input = SimulationInput::new();
//! input.set("Time", 1).set("ActionsPerSecond", 3).set("NumBelts", 1).set("NumRobots", 0);
//!
//! Simulation::from_input(&input, registry.clone())?.run()?;
//! assert_eq!(registry.aggregate("belt-1", "ItemsMoved")?, 3.0);
//! print!("{}", registry.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `foundry-core` | metric names, values, observer trait, errors |
//! | [`stats`] | `foundry-stats` | streams, metric sets, registry, summaries |
//! | [`engine`] | `foundry-engine` | channel, limiter, scheduler, units, orchestrator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shared vocabulary (`foundry-core`).
pub use foundry_core as types;

/// Statistics registry and observers (`foundry-stats`).
///
/// [`stats::StatisticsRegistry`] is the entry point; every run records
/// into one.
pub use foundry_stats as stats;

/// Simulation engine (`foundry-engine`).
///
/// [`engine::Simulation`] starts a run; [`engine::BoundedChannel`] and
/// [`engine::ConcurrencyLimiter`] are usable on their own.
pub use foundry_engine as engine;

/// Common imports for typical Foundry usage.
///
/// ```rust
/// use foundry::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use foundry_core::{metric_names, MetricValue, StatisticObserver};

    // Errors
    pub use foundry_core::{AcquireError, ChannelError, PutError, StatsError, UnitError};

    // Statistics
    pub use foundry_stats::{Aggregation, LoggingObserver, Statistic, Statistics, StatisticsRegistry};

    // Engine
    pub use foundry_engine::{
        ActionOutcome, BoundedChannel, CancelToken, ConcurrencyLimiter, ConfigError, RunReport,
        Simulation, SimulationConfig, SimulationError, SimulationInput, UnitBehavior,
    };
}
