//! Run-scoped statistics registry.
//!
//! A [`StatisticsRegistry`] is created once per simulation run and handed
//! to every unit and observer of that run. Cloning the registry clones a
//! handle; all clones share the same state.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──> begin_run() ──> [units record] ──> lease dropped ──> reset_all() / dispose()
//! ```
//!
//! `reset_all()` refuses to run while any [`RunLease`] is alive, so a
//! fresh run can never observe metrics leaking from a previous one.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use foundry_core::{MetricValue, StatisticObserver, StatsError};

use crate::aggregation::Aggregation;
use crate::observers::ObserverList;
use crate::statistic::Statistic;
use crate::statistics::Statistics;
use crate::summary::{ComponentSummary, MetricSummary, RegistrySummary};

struct RegistryState {
    components: IndexMap<String, Arc<Statistics>>,
    active_runs: usize,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    observers: Arc<ObserverList>,
}

/// Maps component names to their metric sets and owns the observer list.
#[derive(Clone)]
pub struct StatisticsRegistry {
    inner: Arc<RegistryInner>,
}

// Compile-time assertion: StatisticsRegistry must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<StatisticsRegistry>();
};

impl StatisticsRegistry {
    /// Create an empty registry with no observers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState {
                    components: IndexMap::new(),
                    active_runs: 0,
                }),
                observers: Arc::new(ObserverList::new()),
            }),
        }
    }

    /// Ensure a metric set exists for `component` and return it.
    ///
    /// Idempotent: registering an existing component returns the existing
    /// set with its streams intact.
    pub fn register_component(&self, component: &str) -> Arc<Statistics> {
        if let Some(stats) = self.read().components.get(component) {
            return Arc::clone(stats);
        }
        let mut state = self.write();
        let stats = state
            .components
            .entry(component.to_string())
            .or_insert_with(|| {
                log::debug!("registering component {component}");
                Arc::new(Statistics::new(component, Arc::clone(&self.inner.observers)))
            });
        Arc::clone(stats)
    }

    /// The metric set of a registered component.
    pub fn component(&self, component: &str) -> Result<Arc<Statistics>, StatsError> {
        self.read()
            .components
            .get(component)
            .cloned()
            .ok_or_else(|| StatsError::ComponentNotFound {
                component: component.to_string(),
            })
    }

    /// Return the stream `(component, metric)`, creating the component
    /// and the stream as needed. Never fails.
    pub fn get_or_create_stream(
        &self,
        component: &str,
        metric: &str,
        aggregation: Aggregation,
    ) -> Arc<Statistic> {
        self.register_component(component)
            .get_or_create(metric, aggregation)
    }

    /// Look up an existing stream.
    pub fn statistic(&self, component: &str, metric: &str) -> Result<Arc<Statistic>, StatsError> {
        self.component(component)?.statistic(metric)
    }

    /// Append `value` to an existing stream and notify observers.
    pub fn record(
        &self,
        component: &str,
        metric: &str,
        value: impl Into<MetricValue>,
    ) -> Result<(), StatsError> {
        self.statistic(component, metric)?.record(value);
        Ok(())
    }

    /// The aggregate of an existing stream at call time.
    pub fn aggregate(&self, component: &str, metric: &str) -> Result<f64, StatsError> {
        Ok(self.statistic(component, metric)?.aggregate())
    }

    /// Sum of `metric` aggregates over every component that has the metric.
    pub fn total(&self, metric: &str) -> f64 {
        self.components()
            .iter()
            .filter_map(|c| c.aggregate(metric).ok())
            .sum()
    }

    /// Append an observer. Observers live until the next reset.
    pub fn register_observer<O>(&self, observer: O)
    where
        O: StatisticObserver + 'static,
    {
        self.inner.observers.register(Arc::new(observer));
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Component names in registration order.
    pub fn component_names(&self) -> Vec<String> {
        self.read().components.keys().cloned().collect()
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.read().components.len()
    }

    /// Every metric set, in registration order.
    pub fn components(&self) -> Vec<Arc<Statistics>> {
        self.read().components.values().cloned().collect()
    }

    /// Mark a run as active until the returned lease is dropped.
    pub fn begin_run(&self) -> RunLease {
        self.write().active_runs += 1;
        RunLease {
            registry: self.clone(),
        }
    }

    /// Number of live [`RunLease`]s.
    pub fn active_runs(&self) -> usize {
        self.read().active_runs
    }

    /// Discard every component and observer.
    ///
    /// Handles to metric sets obtained before the reset stay usable but are
    /// detached: lookups through the registry return `NotFound`.
    ///
    /// # Errors
    ///
    /// [`StatsError::RunInProgress`] if a run still holds a lease.
    pub fn reset_all(&self) -> Result<(), StatsError> {
        let mut state = self.write();
        if state.active_runs > 0 {
            return Err(StatsError::RunInProgress {
                active_runs: state.active_runs,
            });
        }
        let dropped = state.components.len();
        state.components.clear();
        self.inner.observers.clear();
        log::info!("statistics registry reset ({dropped} components dropped)");
        Ok(())
    }

    /// Reset and release this handle.
    pub fn dispose(self) -> Result<(), StatsError> {
        self.reset_all()
    }

    /// Aggregates of every stream, grouped by component.
    pub fn summary(&self) -> RegistrySummary {
        let components = self
            .components()
            .iter()
            .map(|stats| ComponentSummary {
                name: stats.name().to_string(),
                metrics: stats
                    .streams()
                    .iter()
                    .map(|stat| MetricSummary {
                        name: stat.name().to_string(),
                        aggregation: stat.aggregation(),
                        entries: stat.len(),
                        aggregate: stat.aggregate(),
                    })
                    .collect(),
            })
            .collect();
        RegistrySummary { components }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatisticsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatisticsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsRegistry")
            .field("components", &self.component_names())
            .field("observers", &self.observer_count())
            .field("active_runs", &self.active_runs())
            .finish()
    }
}

/// Keeps a registry marked as in use by a run. Released on drop.
#[must_use = "the run is marked finished as soon as the lease is dropped"]
pub struct RunLease {
    registry: StatisticsRegistry,
}

impl fmt::Debug for RunLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLease").finish_non_exhaustive()
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        let mut state = self.registry.write();
        state.active_runs = state.active_runs.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn register_component_is_idempotent() {
        let reg = StatisticsRegistry::new();
        let a = reg.register_component("belt-1");
        a.get_or_create("ItemsMoved", Aggregation::Count).record(1);
        let b = reg.register_component("belt-1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.aggregate("belt-1", "ItemsMoved").unwrap(), 1.0);
        assert_eq!(reg.component_count(), 1);
    }

    #[test]
    fn get_or_create_stream_twice_returns_same_stream() {
        let reg = StatisticsRegistry::new();
        let first = reg.get_or_create_stream("Robot-1", "ActionsPerformed", Aggregation::Count);
        first.record(1);
        let second = reg.get_or_create_stream("Robot-1", "ActionsPerformed", Aggregation::Count);
        second.record(1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reg.aggregate("Robot-1", "ActionsPerformed").unwrap(), 2.0);
    }

    #[test]
    fn lookups_of_unknown_names_fail() {
        let reg = StatisticsRegistry::new();
        assert_eq!(
            reg.aggregate("ghost", "ItemsMoved"),
            Err(StatsError::ComponentNotFound {
                component: "ghost".into()
            })
        );
        reg.register_component("belt-1");
        assert!(matches!(
            reg.record("belt-1", "ItemsMoved", 1),
            Err(StatsError::MetricNotFound { .. })
        ));
    }

    #[test]
    fn record_notifies_observers_with_identity() {
        let reg = StatisticsRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        reg.register_observer(move |c: &str, m: &str, v: f64| {
            sink.lock().unwrap().push((c.to_string(), m.to_string(), v));
        });
        reg.get_or_create_stream("belt-1", "ItemsMoved", Aggregation::Count);
        reg.record("belt-1", "ItemsMoved", 1).unwrap();
        reg.record("belt-1", "ItemsMoved", "not a number").unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("belt-1".to_string(), "ItemsMoved".to_string(), 1.0)]
        );
        assert_eq!(reg.aggregate("belt-1", "ItemsMoved").unwrap(), 2.0);
    }

    #[test]
    fn reset_clears_components_and_observers() {
        let reg = StatisticsRegistry::new();
        reg.register_observer(|_: &str, _: &str, _: f64| {});
        reg.get_or_create_stream("belt-1", "ItemsMoved", Aggregation::Count);
        reg.get_or_create_stream("Robot-1", "ActionsPerformed", Aggregation::Count);

        reg.reset_all().unwrap();

        assert_eq!(reg.component_count(), 0);
        assert_eq!(reg.observer_count(), 0);
        for name in ["belt-1", "Robot-1"] {
            assert!(matches!(
                reg.component(name),
                Err(StatsError::ComponentNotFound { .. })
            ));
        }
    }

    #[test]
    fn reset_refused_while_run_active() {
        let reg = StatisticsRegistry::new();
        let lease = reg.begin_run();
        assert_eq!(
            reg.reset_all(),
            Err(StatsError::RunInProgress { active_runs: 1 })
        );
        drop(lease);
        assert_eq!(reg.active_runs(), 0);
        assert!(reg.reset_all().is_ok());
    }

    #[test]
    fn component_names_keep_registration_order() {
        let reg = StatisticsRegistry::new();
        for name in ["Robot-1", "Robot-2", "belt-1"] {
            reg.register_component(name);
        }
        assert_eq!(reg.component_names(), vec!["Robot-1", "Robot-2", "belt-1"]);
    }

    #[test]
    fn total_sums_across_components() {
        let reg = StatisticsRegistry::new();
        for (i, n) in [(1, 2), (2, 3)] {
            let s = reg.get_or_create_stream(&format!("belt-{i}"), "ItemsMoved", Aggregation::Count);
            for _ in 0..n {
                s.record(1);
            }
        }
        reg.register_component("Robot-1");
        assert_eq!(reg.total("ItemsMoved"), 5.0);
    }

    #[test]
    fn concurrent_writers_on_distinct_components() {
        let reg = StatisticsRegistry::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        reg.register_observer(move |_: &str, _: &str, _: f64| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                thread::spawn(move || {
                    let name = format!("unit-{i}");
                    let stat = reg.get_or_create_stream(&name, "Events", Aggregation::Count);
                    for _ in 0..1_000 {
                        stat.record(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(reg.component_count(), 8);
        assert_eq!(reg.total("Events"), 8_000.0);
        assert_eq!(notified.load(Ordering::Relaxed), 8_000);
    }

    #[test]
    fn summary_lists_every_stream() {
        let reg = StatisticsRegistry::new();
        reg.get_or_create_stream("belt-1", "ItemsMoved", Aggregation::Count)
            .record(1);
        reg.get_or_create_stream("belt-1", "ActiveUnits", Aggregation::Count);
        let summary = reg.summary();
        assert_eq!(summary.components.len(), 1);
        let belt = &summary.components[0];
        assert_eq!(belt.name, "belt-1");
        assert_eq!(belt.metrics.len(), 2);
        assert_eq!(belt.metrics[0].aggregate, 1.0);
        assert_eq!(belt.metrics[1].entries, 0);
    }
}
