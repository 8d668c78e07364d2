//! Statistics registry for Foundry simulations.
//!
//! Three levels, each owning the next:
//!
//! - [`StatisticsRegistry`]: one per run. Maps component names to their
//!   metric sets and owns the observer list.
//! - [`Statistics`]: the metric set of one component (one unit).
//! - [`Statistic`]: one ordered metric stream with an [`Aggregation`].
//!
//! Writers synchronize per stream; a component's streams are only ever
//! written by the unit that owns the component, so units never contend
//! with each other on the registry. Every numeric value recorded anywhere
//! in a registry is delivered synchronously to the registry's observers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod aggregation;
pub mod observers;
pub mod registry;
pub mod statistic;
pub mod statistics;
pub mod summary;

pub use aggregation::Aggregation;
pub use observers::{LoggingObserver, ObserverList};
pub use registry::{RunLease, StatisticsRegistry};
pub use statistic::{ActiveMarker, Statistic};
pub use statistics::Statistics;
pub use summary::{ComponentSummary, MetricSummary, RegistrySummary};
