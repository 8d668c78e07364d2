//! The metric set of one component.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use foundry_core::{MetricValue, StatsError};

use crate::aggregation::Aggregation;
use crate::observers::ObserverList;
use crate::statistic::Statistic;

/// Maps metric names to streams for a single component, in the order the
/// metrics were first registered.
pub struct Statistics {
    component: String,
    streams: RwLock<IndexMap<String, Arc<Statistic>>>,
    observers: Arc<ObserverList>,
}

impl Statistics {
    pub(crate) fn new(component: impl Into<String>, observers: Arc<ObserverList>) -> Self {
        Self {
            component: component.into(),
            streams: RwLock::new(IndexMap::new()),
            observers,
        }
    }

    /// The component name.
    pub fn name(&self) -> &str {
        &self.component
    }

    /// Return the stream named `metric`, creating it with `aggregation`
    /// if absent.
    ///
    /// Idempotent. If the stream already exists its original aggregation
    /// is kept and `aggregation` is ignored.
    pub fn get_or_create(&self, metric: &str, aggregation: Aggregation) -> Arc<Statistic> {
        if let Some(stat) = self.read_streams().get(metric) {
            return Arc::clone(stat);
        }
        let mut streams = self
            .streams
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stat = streams.entry(metric.to_string()).or_insert_with(|| {
            Arc::new(Statistic::new(
                self.component.as_str(),
                metric,
                aggregation,
                Arc::clone(&self.observers),
            ))
        });
        Arc::clone(stat)
    }

    /// Look up an existing stream.
    pub fn statistic(&self, metric: &str) -> Result<Arc<Statistic>, StatsError> {
        self.read_streams()
            .get(metric)
            .cloned()
            .ok_or_else(|| StatsError::MetricNotFound {
                component: self.component.clone(),
                metric: metric.to_string(),
            })
    }

    /// Whether a stream named `metric` exists.
    pub fn contains(&self, metric: &str) -> bool {
        self.read_streams().contains_key(metric)
    }

    /// Record into an existing stream.
    pub fn record(&self, metric: &str, value: impl Into<MetricValue>) -> Result<(), StatsError> {
        self.statistic(metric)?.record(value);
        Ok(())
    }

    /// Aggregate of an existing stream.
    pub fn aggregate(&self, metric: &str) -> Result<f64, StatsError> {
        Ok(self.statistic(metric)?.aggregate())
    }

    /// Metric names in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.read_streams().keys().cloned().collect()
    }

    /// All streams in registration order.
    pub fn streams(&self) -> Vec<Arc<Statistic>> {
        self.read_streams().values().cloned().collect()
    }

    fn read_streams(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, IndexMap<String, Arc<Statistic>>> {
        self.streams.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statistics")
            .field("component", &self.component)
            .field("metrics", &self.metric_names())
            .finish()
    }
}
