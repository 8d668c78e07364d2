//! Orchestrator: builds the shared floor, starts one thread per unit, and
//! joins them.
//!
//! # Shutdown
//!
//! The last producer thread to exit closes the channel's producing side
//! and the last consumer thread closes its consuming side. Units of the
//! other kind then see `Closed` instead of blocking forever, so runs with
//! unbalanced producer and consumer counts still terminate. Closing is
//! done by a guard owned by each thread, so a panicking unit still counts
//! as finished.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use foundry_core::{UnitError, UnitKind};
use foundry_stats::{RunLease, StatisticsRegistry};

use crate::cancel::CancelToken;
use crate::channel::BoundedChannel;
use crate::config::{ConfigError, SimulationConfig, SimulationInput};
use crate::scheduler::LoopReport;
use crate::unit::{build_unit, FloorResources, Unit, Widget};

// ── SimulationError ────────────────────────────────────────────────

/// Errors from setting up or running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// The configuration is invalid. Raised before any unit starts.
    Config(ConfigError),
    /// A unit could not be built.
    Unit(UnitError),
    /// The OS refused to spawn a unit thread. Units already started were
    /// cancelled and joined.
    ThreadSpawnFailed {
        /// The unit whose thread failed to spawn.
        unit: String,
        /// The OS error.
        reason: String,
    },
    /// One or more unit threads panicked. Every other unit ran normally.
    UnitPanicked {
        /// Names of the units that panicked.
        units: Vec<String>,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Unit(e) => write!(f, "unit: {e}"),
            Self::ThreadSpawnFailed { unit, reason } => {
                write!(f, "failed to spawn thread for {unit}: {reason}")
            }
            Self::UnitPanicked { units } => {
                write!(f, "unit thread(s) panicked: {}", units.join(", "))
            }
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Unit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<UnitError> for SimulationError {
    fn from(e: UnitError) -> Self {
        Self::Unit(e)
    }
}

// ── RunReport ──────────────────────────────────────────────────────

/// Outcome of a whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// One report per unit, consumers first, in start order.
    pub units: Vec<LoopReport>,
    /// Wall-clock time from start to the last join.
    pub elapsed: Duration,
    /// Whether cancellation was requested during the run.
    pub cancelled: bool,
}

impl RunReport {
    /// The report of the unit named `name`.
    pub fn unit(&self, name: &str) -> Option<&LoopReport> {
        self.units.iter().find(|u| u.unit == name)
    }

    /// Actions completed across every unit.
    pub fn total_completed(&self) -> u64 {
        self.units.iter().map(|u| u.completed).sum()
    }

    /// Actions expected across every unit.
    pub fn total_expected(&self) -> u64 {
        self.units.iter().map(|u| u.expected).sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run finished in {:?}: {}/{} actions{}",
            self.elapsed,
            self.total_completed(),
            self.total_expected(),
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        for unit in &self.units {
            writeln!(f, "  {unit}")?;
        }
        Ok(())
    }
}

// ── Simulation ─────────────────────────────────────────────────────

/// A configured, not yet started run.
#[derive(Debug)]
pub struct Simulation {
    config: Arc<SimulationConfig>,
    registry: StatisticsRegistry,
    resources: FloorResources,
    units: Vec<Unit>,
}

impl Simulation {
    /// Validate `config` and build every unit against `registry`.
    ///
    /// Consumers are named `Robot-1..=M` and producers `belt-1..=N`.
    pub fn new(
        config: SimulationConfig,
        registry: StatisticsRegistry,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let config = Arc::new(config);
        let resources = FloorResources::new(&config);

        let mut units = Vec::with_capacity(config.consumers + config.producers);
        for (kind, count) in [
            (UnitKind::Consumer, config.consumers),
            (UnitKind::Producer, config.producers),
        ] {
            for i in 1..=count {
                units.push(build_unit(
                    kind.tag(),
                    kind.unit_name(i),
                    Arc::clone(&config),
                    &registry,
                    &resources,
                )?);
            }
        }

        Ok(Self {
            config,
            registry,
            resources,
            units,
        })
    }

    /// Parse `input` and build the run.
    pub fn from_input(
        input: &SimulationInput,
        registry: StatisticsRegistry,
    ) -> Result<Self, SimulationError> {
        Self::new(SimulationConfig::from_input(input)?, registry)
    }

    /// Add a unit built outside the factory, e.g. with a custom behavior.
    pub fn add_unit(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    /// The validated configuration.
    pub fn config(&self) -> &Arc<SimulationConfig> {
        &self.config
    }

    /// The registry units record into.
    pub fn registry(&self) -> &StatisticsRegistry {
        &self.registry
    }

    /// The shared channel and limiter.
    pub fn resources(&self) -> &FloorResources {
        &self.resources
    }

    /// Unit names in start order.
    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(Unit::name).collect()
    }

    /// Start every unit on its own thread and return immediately.
    pub fn start(self) -> Result<RunningSimulation, SimulationError> {
        let Self {
            config,
            registry,
            resources,
            units,
        } = self;
        let lease = registry.begin_run();
        let cancel = CancelToken::new();

        let count = |kind| units.iter().filter(|u| u.kind() == kind).count();
        let producers = SideCloser::new(Side::Producers, count(UnitKind::Producer), &resources.channel);
        let consumers = SideCloser::new(Side::Consumers, count(UnitKind::Consumer), &resources.channel);

        log::info!(
            "starting run: {} unit(s), {}s at {} action(s)/s",
            units.len(),
            config.time_secs,
            config.actions_per_second
        );

        let mut running = RunningSimulation {
            handles: Vec::with_capacity(units.len()),
            cancel,
            started: Instant::now(),
            lease: Some(lease),
        };

        for unit in units {
            let name = unit.name().to_string();
            let guard = match unit.kind() {
                UnitKind::Producer => producers.guard(),
                UnitKind::Consumer => consumers.guard(),
            };
            let cancel = running.cancel.clone();
            let spawned = thread::Builder::new()
                .name(format!("foundry-{name}"))
                .spawn(move || {
                    let _guard = guard;
                    unit.run(&cancel)
                });
            match spawned {
                Ok(handle) => running.handles.push((name, handle)),
                Err(e) => {
                    log::error!("failed to spawn thread for {name}: {e}");
                    running.cancel.cancel();
                    // Dropping `running` joins what already started.
                    return Err(SimulationError::ThreadSpawnFailed {
                        unit: name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(running)
    }

    /// Start every unit and block until all are done.
    pub fn run(self) -> Result<RunReport, SimulationError> {
        self.start()?.join()
    }
}

/// A run in progress.
///
/// Dropping it without calling [`join`](Self::join) cancels the run and
/// waits for every unit thread.
pub struct RunningSimulation {
    handles: Vec<(String, JoinHandle<LoopReport>)>,
    cancel: CancelToken,
    started: Instant,
    lease: Option<RunLease>,
}

impl RunningSimulation {
    /// Ask every unit to stop. Units finish their current cleanup and exit.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            log::info!("cancelling run");
        }
        self.cancel.cancel();
    }

    /// A handle that cancels this run from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether every unit thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|(_, h)| h.is_finished())
    }

    /// Block until every unit is done.
    ///
    /// # Errors
    ///
    /// [`SimulationError::UnitPanicked`] if any unit thread panicked. The
    /// other units are still joined first.
    pub fn join(mut self) -> Result<RunReport, SimulationError> {
        let (units, panicked) = self.join_all();
        let report = RunReport {
            units,
            elapsed: self.started.elapsed(),
            cancelled: self.cancel.is_cancelled(),
        };
        self.lease.take();
        if !panicked.is_empty() {
            return Err(SimulationError::UnitPanicked { units: panicked });
        }
        log::info!(
            "run finished in {:?}: {}/{} actions",
            report.elapsed,
            report.total_completed(),
            report.total_expected()
        );
        Ok(report)
    }

    fn join_all(&mut self) -> (Vec<LoopReport>, Vec<String>) {
        let mut reports = Vec::with_capacity(self.handles.len());
        let mut panicked = Vec::new();
        for (name, handle) in self.handles.drain(..) {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => {
                    log::error!("unit {name} panicked");
                    panicked.push(name);
                }
            }
        }
        (reports, panicked)
    }
}

impl fmt::Debug for RunningSimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningSimulation")
            .field("units", &self.handles.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Drop for RunningSimulation {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.cancel.cancel();
            self.join_all();
        }
    }
}

// ── Channel side closing ───────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
enum Side {
    Producers,
    Consumers,
}

/// Counts live units of one side and closes that side of the channel
/// when the count reaches zero.
struct SideCloser {
    side: Side,
    remaining: AtomicUsize,
    channel: Arc<BoundedChannel<Widget>>,
}

impl SideCloser {
    fn new(side: Side, units: usize, channel: &Arc<BoundedChannel<Widget>>) -> Arc<Self> {
        let closer = Arc::new(Self {
            side,
            remaining: AtomicUsize::new(units),
            channel: Arc::clone(channel),
        });
        if units == 0 {
            closer.close();
        }
        closer
    }

    fn guard(self: &Arc<Self>) -> SideGuard {
        SideGuard {
            closer: Arc::clone(self),
        }
    }

    fn close(&self) {
        match self.side {
            Side::Producers => self.channel.close_producers(),
            Side::Consumers => self.channel.close_consumers(),
        }
    }
}

struct SideGuard {
    closer: Arc<SideCloser>,
}

impl Drop for SideGuard {
    fn drop(&mut self) {
        if self.closer.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            log::debug!("last of {:?} finished", self.closer.side);
            self.closer.close();
        }
    }
}
