//! Core types and traits for the Foundry factory simulation.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: metric keys and
//! well-known metric names, recorded metric values, the observer trait,
//! and the error enums of every subsystem.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod observer;
pub mod value;

pub use error::{AcquireError, ChannelError, PutError, StatsError, UnitError};
pub use id::{metric_names, MetricKey, UnitKind};
pub use observer::StatisticObserver;
pub use value::MetricValue;
