//! A single metric stream.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use foundry_core::MetricValue;

use crate::aggregation::Aggregation;
use crate::observers::ObserverList;

/// An ordered, per-component sequence of recorded values.
///
/// Identified by `(component, name)`. All mutation goes through one
/// mutex per stream, so two units never contend on each other's streams
/// and [`aggregate`](Statistic::aggregate) always sees a whole prefix of
/// the recorded values.
pub struct Statistic {
    component: String,
    name: String,
    aggregation: Aggregation,
    values: Mutex<Vec<MetricValue>>,
    observers: Arc<ObserverList>,
}

impl Statistic {
    pub(crate) fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        aggregation: Aggregation,
        observers: Arc<ObserverList>,
    ) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            aggregation,
            values: Mutex::new(Vec::new()),
            observers,
        }
    }

    /// Metric name of this stream.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the component owning this stream.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The aggregation applied by [`aggregate`](Statistic::aggregate).
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Append a value, then notify observers if it is numeric.
    ///
    /// The stream lock is released before observers run, so an observer
    /// may read this stream (or any other) from its callback.
    pub fn record(&self, value: impl Into<MetricValue>) {
        let value = value.into();
        let numeric = value.as_number();
        self.lock().push(value);
        if let Some(v) = numeric {
            self.observers.notify(&self.component, &self.name, v);
        }
    }

    /// Remove and return the most recently recorded value.
    pub fn remove_last(&self) -> Option<MetricValue> {
        self.lock().pop()
    }

    /// Remove and return the value at `index`, shifting later values down.
    ///
    /// Returns `None` if `index` is out of bounds.
    pub fn remove_at(&self, index: usize) -> Option<MetricValue> {
        let mut values = self.lock();
        (index < values.len()).then(|| values.remove(index))
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// This stream's aggregation applied to its current contents.
    pub fn aggregate(&self) -> f64 {
        self.aggregation.apply(&self.lock())
    }

    /// Record `1` and return a guard that removes the most recent entry
    /// when dropped.
    ///
    /// Used for point-in-time gauges such as `ActiveUnits`. Removing the
    /// most recent entry equals removing this guard's entry only while the
    /// stream has a single writer, which holds for per-unit streams.
    pub fn mark_active(self: &Arc<Self>) -> ActiveMarker {
        self.record(1);
        ActiveMarker {
            stat: Arc::clone(self),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MetricValue>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statistic")
            .field("component", &self.component)
            .field("name", &self.name)
            .field("aggregation", &self.aggregation)
            .field("len", &self.len())
            .finish()
    }
}

/// Scoped "currently active" marker returned by [`Statistic::mark_active`].
///
/// Dropping the marker, on any exit path including unwinding, removes the
/// entry it added.
#[must_use = "the marker is removed as soon as it is dropped"]
pub struct ActiveMarker {
    stat: Arc<Statistic>,
}

impl Drop for ActiveMarker {
    fn drop(&mut self) {
        self.stat.remove_last();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn stream(aggregation: Aggregation) -> Arc<Statistic> {
        Arc::new(Statistic::new(
            "belt-1",
            "ItemsMoved",
            aggregation,
            Arc::new(ObserverList::new()),
        ))
    }

    #[test]
    fn record_appends_in_order() {
        let s = stream(Aggregation::Count);
        s.record(1);
        s.record("status");
        s.record(2.5);
        assert_eq!(s.len(), 3);
        assert_eq!(s.aggregate(), 3.0);
        assert_eq!(s.remove_at(1), Some(MetricValue::from("status")));
        assert_eq!(s.remove_last(), Some(MetricValue::from(2.5)));
    }

    #[test]
    fn text_values_skip_notification_but_are_stored() {
        let observers = Arc::new(ObserverList::new());
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        observers.register(Arc::new(move |_: &str, _: &str, v: f64| {
            sink.lock().unwrap().push(v);
        }));
        let s = Statistic::new("Robot-1", "Label", Aggregation::Count, observers);
        s.record("HELLO, WORLD");
        s.record("4");
        assert_eq!(s.len(), 2);
        assert_eq!(*hits.lock().unwrap(), vec![4.0]);
    }

    #[test]
    fn remove_at_out_of_bounds_is_none() {
        let s = stream(Aggregation::Count);
        s.record(1);
        assert_eq!(s.remove_at(5), None);
        assert_eq!(s.remove_at(0), Some(MetricValue::from(1)));
        assert!(s.is_empty());
    }

    #[test]
    fn active_marker_removes_on_drop() {
        let s = stream(Aggregation::Count);
        {
            let _marker = s.mark_active();
            assert_eq!(s.aggregate(), 1.0);
        }
        assert_eq!(s.aggregate(), 0.0);
    }

    #[test]
    fn active_marker_removes_on_panic() {
        let s = stream(Aggregation::Count);
        let cloned = Arc::clone(&s);
        let result = thread::spawn(move || {
            let _marker = cloned.mark_active();
            panic!("action failed");
        })
        .join();
        assert!(result.is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn aggregate_during_concurrent_records_sees_a_prefix() {
        let s = stream(Aggregation::Sum);
        let writer = {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    s.record(1);
                }
            })
        };
        let mut last = 0.0;
        while !writer.is_finished() {
            let now = s.aggregate();
            assert!(now >= last, "aggregate went backwards: {now} < {last}");
            assert_eq!(now.fract(), 0.0);
            last = now;
        }
        writer.join().unwrap();
        assert_eq!(s.aggregate(), 10_000.0);
    }
}
