//! Configuration shortcuts and scripted unit behaviors.
//!
//! - [`input`] / [`input_with_units`]: raw inputs using the original keys.
//! - [`TimedBehavior`]: sleeps a fixed time per action, logging start times.
//! - [`ScriptedBehavior`]: returns a fixed cycle of outcomes.
//! - [`BlockingBehavior`]: blocks every action until cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use foundry_engine::config::keys;
use foundry_engine::{ActionOutcome, CancelToken, SimulationConfig, SimulationInput, UnitBehavior};

/// `Time` and `ActionsPerSecond` only; unit counts take their defaults.
pub fn input(time_secs: u64, actions_per_second: u32) -> SimulationInput {
    let mut si = SimulationInput::new();
    si.set(keys::TIME, time_secs)
        .set(keys::ACTIONS_PER_SECOND, actions_per_second);
    si
}

/// Timing plus explicit `NumBelts` / `NumRobots`.
pub fn input_with_units(
    time_secs: u64,
    actions_per_second: u32,
    belts: usize,
    robots: usize,
) -> SimulationInput {
    let mut si = input(time_secs, actions_per_second);
    si.set(keys::NUM_BELTS, belts).set(keys::NUM_ROBOTS, robots);
    si
}

/// A validated-shape configuration with explicit unit counts.
pub fn config(
    time_secs: u64,
    actions_per_second: u32,
    producers: usize,
    consumers: usize,
) -> SimulationConfig {
    SimulationConfig::new(time_secs, actions_per_second).with_units(producers, consumers)
}

/// Sleeps `work` per action and records when each action started.
pub struct TimedBehavior {
    pub work: Duration,
    starts: Arc<Mutex<Vec<Instant>>>,
}

impl TimedBehavior {
    pub fn new(work: Duration) -> Self {
        Self {
            work,
            starts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the start times, readable after the behavior is
    /// moved into a unit.
    pub fn starts(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.starts)
    }
}

impl UnitBehavior for TimedBehavior {
    fn perform_action(&mut self, _cancel: &CancelToken) -> ActionOutcome {
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());
        if !self.work.is_zero() {
            thread::sleep(self.work);
        }
        ActionOutcome::Completed
    }

    fn submit_metrics(&mut self, _outcome: ActionOutcome) {}
}

/// Returns `script[i % len]` for the i-th action and counts submissions.
pub struct ScriptedBehavior {
    script: Vec<ActionOutcome>,
    next: usize,
    submitted: Arc<AtomicU64>,
}

impl ScriptedBehavior {
    pub fn new(script: Vec<ActionOutcome>) -> Self {
        assert!(!script.is_empty(), "script must not be empty");
        Self {
            script,
            next: 0,
            submitted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn submitted(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.submitted)
    }
}

impl UnitBehavior for ScriptedBehavior {
    fn perform_action(&mut self, _cancel: &CancelToken) -> ActionOutcome {
        let outcome = self.script[self.next % self.script.len()];
        self.next += 1;
        outcome
    }

    fn submit_metrics(&mut self, _outcome: ActionOutcome) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Blocks inside every action until the run is cancelled.
#[derive(Default)]
pub struct BlockingBehavior;

impl UnitBehavior for BlockingBehavior {
    fn perform_action(&mut self, cancel: &CancelToken) -> ActionOutcome {
        while !cancel.wait_for(Duration::from_secs(3600)) {}
        ActionOutcome::Cancelled
    }

    fn submit_metrics(&mut self, _outcome: ActionOutcome) {}
}
