//! Test utilities and fixtures for Foundry development.
//!
//! - [`RecordingObserver`]: captures every notification for later asserts.
//! - [`ConcurrencyProbe`]: tracks current and peak concurrent holders.
//! - [`fixtures`]: configuration shortcuts and scripted unit behaviors.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use foundry_core::StatisticObserver;

/// One observed `(component, metric, value)` notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub component: String,
    pub metric: String,
    pub value: f64,
}

/// Observer that stores every notification in arrival order.
///
/// Clones share the same buffer, so one clone can be registered while
/// another is kept for assertions.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all notifications so far.
    pub fn events(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of notifications for `(component, metric)`.
    pub fn count_for(&self, component: &str, metric: &str) -> usize {
        self.lock()
            .iter()
            .filter(|n| n.component == component && n.metric == metric)
            .count()
    }

    /// Sum of values notified for `metric` across all components.
    pub fn total(&self, metric: &str) -> f64 {
        self.lock()
            .iter()
            .filter(|n| n.metric == metric)
            .map(|n| n.value)
            .sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatisticObserver for RecordingObserver {
    fn on_statistic_updated(&self, component: &str, metric: &str, value: f64) {
        self.lock().push(Notification {
            component: component.to_string(),
            metric: metric.to_string(),
            value,
        });
    }
}

/// Counts how many threads are inside a section at once.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
    entries: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enter the section until the returned guard drops.
    pub fn enter(&self) -> ProbeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.entries.fetch_add(1, Ordering::SeqCst);
        ProbeGuard { probe: self }
    }

    /// Largest number of simultaneous holders observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Holders right now.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Total entries.
    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::SeqCst)
    }
}

pub struct ProbeGuard<'a> {
    probe: &'a ConcurrencyProbe,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.probe.current.fetch_sub(1, Ordering::SeqCst);
    }
}
