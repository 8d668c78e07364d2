//! Units: the worker record, the built-in producer and consumer
//! behaviors, and the type-tag factory.
//!
//! A [`Unit`] is a [`WorkerSpec`] (name, configuration, metric set)
//! composed with a boxed [`UnitBehavior`]. The factory picks the behavior
//! from a tag, so adding a unit kind means adding a behavior, not a
//! subtype.

use std::fmt;
use std::sync::Arc;

use foundry_core::{metric_names, ChannelError, UnitError, UnitKind};
use foundry_stats::{Aggregation, Statistic, Statistics, StatisticsRegistry};

use crate::cancel::CancelToken;
use crate::channel::BoundedChannel;
use crate::config::SimulationConfig;
use crate::limiter::ConcurrencyLimiter;
use crate::scheduler::{run_action_loop, ActionOutcome, LoopReport, UnitBehavior};

// ── WorkerSpec ─────────────────────────────────────────────────────

/// Identity and per-run context of one unit.
#[derive(Clone, Debug)]
pub struct WorkerSpec {
    /// Unit name; also the component name of its metric set.
    pub name: String,
    /// Read-only run configuration.
    pub config: Arc<SimulationConfig>,
    /// The unit's own metric set.
    pub metrics: Arc<Statistics>,
}

impl WorkerSpec {
    /// Register `name` as a component of `registry` and build the record.
    /// The `ActiveUnits` stream is created up front.
    pub fn new(
        name: impl Into<String>,
        config: Arc<SimulationConfig>,
        registry: &StatisticsRegistry,
    ) -> Self {
        let name = name.into();
        let metrics = registry.register_component(&name);
        metrics.get_or_create(metric_names::ACTIVE_UNITS, Aggregation::Count);
        Self {
            name,
            config,
            metrics,
        }
    }

    fn stream(&self, metric: &str) -> Arc<Statistic> {
        self.metrics.get_or_create(metric, Aggregation::Count)
    }
}

// ── Shared resources ───────────────────────────────────────────────

/// An item moved from producers to consumers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Widget {
    /// Name of the producer that made it.
    pub producer: String,
    /// Per-producer sequence number, starting at 0.
    pub seq: u64,
}

/// The channel and limiter shared by every unit of a run.
#[derive(Clone, Debug)]
pub struct FloorResources {
    /// Producer to consumer handoff.
    pub channel: Arc<BoundedChannel<Widget>>,
    /// Gate on simultaneous consumer actions.
    pub limiter: Arc<ConcurrencyLimiter>,
}

impl FloorResources {
    /// Build the channel and limiter sized by `config`.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            channel: Arc::new(BoundedChannel::new(config.channel_capacity)),
            limiter: Arc::new(ConcurrencyLimiter::new(config.consumer_permits)),
        }
    }
}

// ── Producer ───────────────────────────────────────────────────────

/// Puts one [`Widget`] per action and records `ItemsMoved`.
pub struct ProducerBehavior {
    name: String,
    channel: Arc<BoundedChannel<Widget>>,
    items_moved: Arc<Statistic>,
    next_seq: u64,
}

impl ProducerBehavior {
    /// Build a producer for `spec`, registering its `ItemsMoved` stream.
    pub fn new(spec: &WorkerSpec, resources: &FloorResources) -> Self {
        Self {
            name: spec.name.clone(),
            channel: Arc::clone(&resources.channel),
            items_moved: spec.stream(metric_names::ITEMS_MOVED),
            next_seq: 0,
        }
    }
}

impl UnitBehavior for ProducerBehavior {
    fn perform_action(&mut self, cancel: &CancelToken) -> ActionOutcome {
        let widget = Widget {
            producer: self.name.clone(),
            seq: self.next_seq,
        };
        match self.channel.put(widget, cancel) {
            Ok(()) => {
                self.next_seq += 1;
                ActionOutcome::Completed
            }
            Err(e) => match e.reason {
                ChannelError::Closed => ActionOutcome::Idle,
                ChannelError::Cancelled => ActionOutcome::Cancelled,
            },
        }
    }

    fn submit_metrics(&mut self, outcome: ActionOutcome) {
        if outcome == ActionOutcome::Completed {
            self.items_moved.record(1);
        }
    }
}

// ── Consumer ───────────────────────────────────────────────────────

/// How a consumer uses the channel once it holds a permit.
pub trait ActionStrategy: Send {
    /// Execute one action for the unit named `unit`. Returns the item
    /// taken, if any.
    fn execute(
        &mut self,
        unit: &str,
        channel: &BoundedChannel<Widget>,
        cancel: &CancelToken,
    ) -> Result<Option<Widget>, ChannelError>;
}

/// Take exactly one item.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsumeStrategy;

impl ActionStrategy for ConsumeStrategy {
    fn execute(
        &mut self,
        _unit: &str,
        channel: &BoundedChannel<Widget>,
        cancel: &CancelToken,
    ) -> Result<Option<Widget>, ChannelError> {
        channel.take(cancel).map(Some)
    }
}

/// Runs its strategy under a limiter permit. Records `ActionsPerformed`
/// for every action and `ItemsTaken` for each item actually taken.
///
/// With zero producers configured the consumer skips the channel and
/// only counts the action.
pub struct ConsumerBehavior {
    name: String,
    resources: FloorResources,
    consume: bool,
    strategy: Box<dyn ActionStrategy>,
    actions_performed: Arc<Statistic>,
    items_taken: Arc<Statistic>,
    last_taken: Option<Widget>,
}

impl ConsumerBehavior {
    /// Build a consumer with the default [`ConsumeStrategy`].
    pub fn new(spec: &WorkerSpec, resources: &FloorResources) -> Self {
        Self::with_strategy(spec, resources, Box::new(ConsumeStrategy))
    }

    /// Build a consumer running `strategy`.
    pub fn with_strategy(
        spec: &WorkerSpec,
        resources: &FloorResources,
        strategy: Box<dyn ActionStrategy>,
    ) -> Self {
        Self {
            name: spec.name.clone(),
            resources: resources.clone(),
            consume: spec.config.producers > 0,
            strategy,
            actions_performed: spec.stream(metric_names::ACTIONS_PERFORMED),
            items_taken: spec.stream(metric_names::ITEMS_TAKEN),
            last_taken: None,
        }
    }

    /// The item taken by the most recent action, if any.
    pub fn last_taken(&self) -> Option<&Widget> {
        self.last_taken.as_ref()
    }
}

impl UnitBehavior for ConsumerBehavior {
    fn perform_action(&mut self, cancel: &CancelToken) -> ActionOutcome {
        self.last_taken = None;
        let Ok(_permit) = self.resources.limiter.acquire(cancel) else {
            return ActionOutcome::Cancelled;
        };
        if !self.consume {
            return ActionOutcome::Completed;
        }
        match self
            .strategy
            .execute(&self.name, &self.resources.channel, cancel)
        {
            Ok(item) => {
                self.last_taken = item;
                ActionOutcome::Completed
            }
            Err(ChannelError::Closed) => ActionOutcome::Idle,
            Err(ChannelError::Cancelled) => ActionOutcome::Cancelled,
        }
    }

    fn submit_metrics(&mut self, _outcome: ActionOutcome) {
        self.actions_performed.record(1);
        if self.last_taken.is_some() {
            self.items_taken.record(1);
        }
    }
}

// ── Unit and factory ───────────────────────────────────────────────

/// A runnable unit: a worker record plus its behavior.
pub struct Unit {
    kind: UnitKind,
    spec: WorkerSpec,
    behavior: Box<dyn UnitBehavior>,
}

impl Unit {
    /// Compose a unit from parts. Used for custom behaviors; the built-in
    /// kinds go through [`build_unit`].
    pub fn new(kind: UnitKind, spec: WorkerSpec, behavior: Box<dyn UnitBehavior>) -> Self {
        Self {
            kind,
            spec,
            behavior,
        }
    }

    /// Build a built-in unit of `kind`.
    pub fn of_kind(kind: UnitKind, spec: WorkerSpec, resources: &FloorResources) -> Self {
        let behavior: Box<dyn UnitBehavior> = match kind {
            UnitKind::Producer => Box::new(ProducerBehavior::new(&spec, resources)),
            UnitKind::Consumer => Box::new(ConsumerBehavior::new(&spec, resources)),
        };
        Self::new(kind, spec, behavior)
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Unit kind.
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// The worker record.
    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Run the action loop to completion or cancellation.
    pub fn run(mut self, cancel: &CancelToken) -> LoopReport {
        run_action_loop(&self.spec, self.behavior.as_mut(), cancel)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("kind", &self.kind)
            .field("name", &self.spec.name)
            .finish_non_exhaustive()
    }
}

/// Build a unit from a type tag: `"producer"` / `"belt"` or
/// `"consumer"` / `"robot"`, case-insensitive.
///
/// The unit's component is registered in `registry` with every stream
/// its kind records.
///
/// # Errors
///
/// [`UnitError::UnknownKind`] for any other tag. Nothing is registered in
/// that case.
pub fn build_unit(
    tag: &str,
    name: impl Into<String>,
    config: Arc<SimulationConfig>,
    registry: &StatisticsRegistry,
    resources: &FloorResources,
) -> Result<Unit, UnitError> {
    let kind: UnitKind = tag.parse()?;
    let spec = WorkerSpec::new(name, config, registry);
    Ok(Unit::of_kind(kind, spec, resources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_core::StatsError;

    fn fixture(producers: usize) -> (StatisticsRegistry, Arc<SimulationConfig>, FloorResources) {
        let config = Arc::new(SimulationConfig::new(1, 1).with_units(producers, 1));
        let resources = FloorResources::new(&config);
        (StatisticsRegistry::new(), config, resources)
    }

    #[test]
    fn factory_accepts_tags_and_aliases() {
        let (reg, config, res) = fixture(1);
        for (tag, kind) in [
            ("producer", UnitKind::Producer),
            ("belt", UnitKind::Producer),
            ("Robot", UnitKind::Consumer),
            ("consumer", UnitKind::Consumer),
        ] {
            let unit = build_unit(tag, format!("{tag}-x"), Arc::clone(&config), &reg, &res).unwrap();
            assert_eq!(unit.kind(), kind);
        }
    }

    #[test]
    fn factory_rejects_unknown_tag_without_registering() {
        let (reg, config, res) = fixture(1);
        let err = build_unit("forklift", "forklift-1", config, &reg, &res).unwrap_err();
        assert_eq!(
            err,
            UnitError::UnknownKind {
                tag: "forklift".into()
            }
        );
        assert!(matches!(
            reg.component("forklift-1"),
            Err(StatsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn units_register_their_streams() {
        let (reg, config, res) = fixture(1);
        build_unit("belt", "belt-1", Arc::clone(&config), &reg, &res).unwrap();
        build_unit("robot", "Robot-1", config, &reg, &res).unwrap();
        assert_eq!(
            reg.component("belt-1").unwrap().metric_names(),
            vec!["ActiveUnits", "ItemsMoved"]
        );
        assert_eq!(
            reg.component("Robot-1").unwrap().metric_names(),
            vec!["ActiveUnits", "ActionsPerformed", "ItemsTaken"]
        );
    }

    #[test]
    fn producer_numbers_its_widgets() {
        let (reg, config, res) = fixture(1);
        let spec = WorkerSpec::new("belt-1", config, &reg);
        let mut belt = ProducerBehavior::new(&spec, &res);
        let cancel = CancelToken::new();
        for _ in 0..2 {
            let outcome = belt.perform_action(&cancel);
            belt.submit_metrics(outcome);
        }
        assert_eq!(
            res.channel.try_take(),
            Some(Widget {
                producer: "belt-1".into(),
                seq: 0
            })
        );
        assert_eq!(res.channel.try_take().map(|w| w.seq), Some(1));
        assert_eq!(reg.aggregate("belt-1", "ItemsMoved").unwrap(), 2.0);
    }

    #[test]
    fn producer_is_idle_when_consumers_closed_and_full() {
        let (reg, mut config, _) = fixture(1);
        Arc::make_mut(&mut config).channel_capacity = 1;
        let res = FloorResources::new(&config);
        let spec = WorkerSpec::new("belt-1", config, &reg);
        let mut belt = ProducerBehavior::new(&spec, &res);
        let cancel = CancelToken::new();
        assert_eq!(belt.perform_action(&cancel), ActionOutcome::Completed);
        res.channel.close_consumers();
        let outcome = belt.perform_action(&cancel);
        assert_eq!(outcome, ActionOutcome::Idle);
        belt.submit_metrics(outcome);
        assert_eq!(reg.aggregate("belt-1", "ItemsMoved").unwrap(), 0.0);
    }

    #[test]
    fn consumer_takes_under_permit() {
        let (reg, config, res) = fixture(1);
        let spec = WorkerSpec::new("Robot-1", config, &reg);
        let mut robot = ConsumerBehavior::new(&spec, &res);
        let cancel = CancelToken::new();
        res.channel
            .try_put(Widget {
                producer: "belt-1".into(),
                seq: 7,
            })
            .unwrap();
        let outcome = robot.perform_action(&cancel);
        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(robot.last_taken().map(|w| w.seq), Some(7));
        assert_eq!(res.limiter.in_use(), 0);
        robot.submit_metrics(outcome);
        assert_eq!(reg.aggregate("Robot-1", "ActionsPerformed").unwrap(), 1.0);
        assert_eq!(reg.aggregate("Robot-1", "ItemsTaken").unwrap(), 1.0);
    }

    #[test]
    fn consumer_without_producers_only_counts() {
        let (reg, config, res) = fixture(0);
        let spec = WorkerSpec::new("Robot-1", config, &reg);
        let mut robot = ConsumerBehavior::new(&spec, &res);
        let outcome = robot.perform_action(&CancelToken::new());
        robot.submit_metrics(outcome);
        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(reg.aggregate("Robot-1", "ActionsPerformed").unwrap(), 1.0);
        assert_eq!(reg.aggregate("Robot-1", "ItemsTaken").unwrap(), 0.0);
    }

    #[test]
    fn consumer_idle_after_producers_close() {
        let (reg, config, res) = fixture(1);
        let spec = WorkerSpec::new("Robot-1", config, &reg);
        let mut robot = ConsumerBehavior::new(&spec, &res);
        res.channel.close_producers();
        let outcome = robot.perform_action(&CancelToken::new());
        assert_eq!(outcome, ActionOutcome::Idle);
        robot.submit_metrics(outcome);
        assert_eq!(reg.aggregate("Robot-1", "ActionsPerformed").unwrap(), 1.0);
        assert_eq!(reg.aggregate("Robot-1", "ItemsTaken").unwrap(), 0.0);
    }

    #[test]
    fn consumer_cancelled_while_waiting_for_permit() {
        let (reg, config, res) = fixture(1);
        let spec = WorkerSpec::new("Robot-1", config, &reg);
        let mut robot = ConsumerBehavior::new(&spec, &res);
        let _held: Vec<_> = std::iter::from_fn(|| res.limiter.try_acquire()).collect();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(robot.perform_action(&cancel), ActionOutcome::Cancelled);
    }

    #[test]
    fn custom_strategy_runs_under_permit() {
        struct Peek;
        impl ActionStrategy for Peek {
            fn execute(
                &mut self,
                unit: &str,
                channel: &BoundedChannel<Widget>,
                _cancel: &CancelToken,
            ) -> Result<Option<Widget>, ChannelError> {
                assert_eq!(unit, "Robot-1");
                assert!(channel.is_empty());
                Ok(None)
            }
        }
        let (reg, config, res) = fixture(1);
        let spec = WorkerSpec::new("Robot-1", config, &reg);
        let mut robot = ConsumerBehavior::with_strategy(&spec, &res, Box::new(Peek));
        let outcome = robot.perform_action(&CancelToken::new());
        robot.submit_metrics(outcome);
        assert_eq!(reg.aggregate("Robot-1", "ItemsTaken").unwrap(), 0.0);
        assert_eq!(reg.aggregate("Robot-1", "ActionsPerformed").unwrap(), 1.0);
    }
}
