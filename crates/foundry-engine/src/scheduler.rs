//! Drift-corrected fixed-rate action loop.
//!
//! Every unit runs [`run_action_loop`] on its own thread. The loop owns
//! timing and the `ActiveUnits` gauge; the unit's [`UnitBehavior`] only
//! supplies the two hooks, "perform one action" and "submit metrics for
//! that action".
//!
//! ```text
//! for each of Time * ActionsPerSecond iterations:
//!     start = now
//!     mark active ─> perform_action ─> submit_metrics ─> unmark active
//!     sleep(period - elapsed)    // skipped when the action overran
//! ```
//!
//! Overruns are not caught up: a slow action shortens only its own sleep.

use std::fmt;
use std::time::{Duration, Instant};

use foundry_core::metric_names;
use foundry_stats::Aggregation;

use crate::cancel::CancelToken;
use crate::unit::WorkerSpec;

/// What one `perform_action` call achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action did its work.
    Completed,
    /// The action ran but had nothing to do, e.g. the shared channel's
    /// other side had shut down.
    Idle,
    /// The run was cancelled while the action was blocked. No metrics are
    /// submitted for it and the loop stops.
    Cancelled,
}

/// The behavior a unit kind plugs into the action loop.
pub trait UnitBehavior: Send {
    /// Perform one action. May block on the shared channel or limiter; must
    /// return [`ActionOutcome::Cancelled`] promptly once `cancel` fires.
    fn perform_action(&mut self, cancel: &CancelToken) -> ActionOutcome;

    /// Record the metrics of the action that just ran. Not called for
    /// cancelled actions.
    fn submit_metrics(&mut self, outcome: ActionOutcome);

    /// Called once after the loop exits, on every path.
    fn finish(&mut self) {}
}

/// Timing parameters of one loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Iterations to run.
    pub total_actions: u64,
    /// Target time between iteration starts.
    pub period: Duration,
}

/// How a unit's loop went.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopReport {
    /// Unit name.
    pub unit: String,
    /// Iterations the configuration asked for.
    pub expected: u64,
    /// Iterations that ran to completion, idle ones included.
    pub completed: u64,
    /// Completed iterations whose action had nothing to do.
    pub idle: u64,
    /// Whether the loop stopped before `expected` iterations.
    pub cancelled: bool,
    /// Wall-clock time spent in the loop.
    pub elapsed: Duration,
}

impl fmt::Display for LoopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} actions ({} idle) in {:?}",
            self.unit, self.completed, self.expected, self.idle, self.elapsed
        )?;
        if self.cancelled {
            write!(f, " [cancelled]")?;
        }
        Ok(())
    }
}

/// Run `behavior` for the pacing derived from `spec`'s configuration.
pub fn run_action_loop(
    spec: &WorkerSpec,
    behavior: &mut dyn UnitBehavior,
    cancel: &CancelToken,
) -> LoopReport {
    let pacing = Pacing {
        total_actions: spec.config.total_actions(),
        period: spec.config.period(),
    };
    run_paced(spec, behavior, pacing, cancel)
}

/// Run `behavior` for exactly `pacing`.
pub fn run_paced(
    spec: &WorkerSpec,
    behavior: &mut dyn UnitBehavior,
    pacing: Pacing,
    cancel: &CancelToken,
) -> LoopReport {
    let active = spec
        .metrics
        .get_or_create(metric_names::ACTIVE_UNITS, Aggregation::Count);
    let mut report = LoopReport {
        unit: spec.name.clone(),
        expected: pacing.total_actions,
        completed: 0,
        idle: 0,
        cancelled: false,
        elapsed: Duration::ZERO,
    };
    log::debug!(
        "{} starting: {} actions, period {:?}",
        spec.name,
        pacing.total_actions,
        pacing.period
    );

    let loop_start = Instant::now();
    for _ in 0..pacing.total_actions {
        if cancel.is_cancelled() {
            break;
        }
        let action_start = Instant::now();

        let outcome = {
            let _marker = active.mark_active();
            let outcome = behavior.perform_action(cancel);
            if outcome != ActionOutcome::Cancelled {
                behavior.submit_metrics(outcome);
            }
            outcome
        };

        match outcome {
            ActionOutcome::Completed => report.completed += 1,
            ActionOutcome::Idle => {
                report.completed += 1;
                report.idle += 1;
            }
            ActionOutcome::Cancelled => break,
        }

        if let Some(remaining) = pacing.period.checked_sub(action_start.elapsed()) {
            if cancel.wait_for(remaining) {
                break;
            }
        }
    }
    behavior.finish();

    report.elapsed = loop_start.elapsed();
    report.cancelled = report.completed < report.expected;
    if report.cancelled {
        log::warn!("{report}");
    } else {
        log::debug!("{report}");
    }
    report
}
