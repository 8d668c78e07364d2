//! Observer trait for metric updates.

/// Receives every numeric value recorded into any metric stream of a
/// registry.
///
/// Observers run synchronously on the recording thread, in registration
/// order. A slow observer throttles every unit that records metrics, so
/// implementations should return quickly and never block.
///
/// Closures with the matching signature implement this trait:
///
/// ```
/// use foundry_core::StatisticObserver;
///
/// let obs = |component: &str, metric: &str, value: f64| {
///     let _ = (component, metric, value);
/// };
/// obs.on_statistic_updated("belt-1", "ItemsMoved", 1.0);
/// ```
pub trait StatisticObserver: Send + Sync {
    /// Called once per recorded numeric value.
    fn on_statistic_updated(&self, component: &str, metric: &str, value: f64);
}

impl<F> StatisticObserver for F
where
    F: Fn(&str, &str, f64) + Send + Sync,
{
    fn on_statistic_updated(&self, component: &str, metric: &str, value: f64) {
        self(component, metric, value)
    }
}
