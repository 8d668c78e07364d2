//! Observer list and the built-in logging observer.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use foundry_core::StatisticObserver;

type ObserverSlice = Arc<[Arc<dyn StatisticObserver>]>;

/// Append-only, ordered list of observers.
///
/// Copy-on-write: registration replaces the whole slice, notification
/// clones the current `Arc` and iterates without holding the lock. An
/// observer may therefore register further observers from inside its
/// callback; those take effect from the next notification.
pub struct ObserverList {
    observers: RwLock<ObserverSlice>,
}

impl ObserverList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Append an observer. There is no way to unregister.
    pub fn register(&self, observer: Arc<dyn StatisticObserver>) {
        let mut guard = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<_> = guard.iter().cloned().collect();
        next.push(observer);
        *guard = next.into();
    }

    /// Deliver one update to every observer, in registration order.
    pub fn notify(&self, component: &str, metric: &str, value: f64) {
        let snapshot = self.snapshot();
        for obs in snapshot.iter() {
            obs.on_statistic_updated(component, metric, value);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every observer.
    pub(crate) fn clear(&self) {
        *self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::from(Vec::new());
    }

    fn snapshot(&self) -> ObserverSlice {
        Arc::clone(&self.observers.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for ObserverList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.len())
            .finish()
    }
}

/// Forwards every update to the `log` facade at `info` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl StatisticObserver for LoggingObserver {
    fn on_statistic_updated(&self, component: &str, metric: &str, value: f64) {
        log::info!(target: "foundry::observer", "{component} -> {metric} updated by {value}");
    }
}
