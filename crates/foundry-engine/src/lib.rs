//! Simulation engine for Foundry factory runs.
//!
//! Provides the shared floor every unit works against (a bounded
//! [`BoundedChannel`] and a [`ConcurrencyLimiter`]), the drift-corrected
//! action loop units run under, the built-in producer and consumer units,
//! and the [`Simulation`] orchestrator that starts one thread per unit.
//! Cancellation is cooperative through a run-wide [`CancelToken`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod channel;
pub mod config;
pub mod limiter;
pub mod scheduler;
pub mod simulation;
pub mod unit;

pub use cancel::CancelToken;
pub use channel::BoundedChannel;
pub use config::{ConfigError, SimulationConfig, SimulationInput};
pub use limiter::{ConcurrencyLimiter, Permit};
pub use scheduler::{run_action_loop, run_paced, ActionOutcome, LoopReport, Pacing, UnitBehavior};
pub use simulation::{RunReport, RunningSimulation, Simulation, SimulationError};
pub use unit::{
    build_unit, ActionStrategy, ConsumeStrategy, ConsumerBehavior, FloorResources,
    ProducerBehavior, Unit, WorkerSpec, Widget,
};
