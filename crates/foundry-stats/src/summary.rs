//! Point-in-time snapshot of a registry, for end-of-run reporting.

use std::fmt;

use crate::aggregation::Aggregation;

/// Aggregate of one stream at snapshot time.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSummary {
    /// Metric name.
    pub name: String,
    /// Aggregation that produced `aggregate`.
    pub aggregation: Aggregation,
    /// Number of recorded entries.
    pub entries: usize,
    /// The stream's aggregate.
    pub aggregate: f64,
}

/// Every stream of one component.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSummary {
    /// Component name.
    pub name: String,
    /// Streams in registration order.
    pub metrics: Vec<MetricSummary>,
}

impl ComponentSummary {
    /// Aggregate of `metric`, if the component has it.
    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.name == metric)
            .map(|m| m.aggregate)
    }
}

/// Every component of a registry, in registration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrySummary {
    /// Components in registration order.
    pub components: Vec<ComponentSummary>,
}

impl RegistrySummary {
    /// Sum of `metric` over every component that has it.
    pub fn total(&self, metric: &str) -> f64 {
        self.components.iter().filter_map(|c| c.metric(metric)).sum()
    }
}

impl fmt::Display for RegistrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            writeln!(f, "{}", component.name)?;
            for m in &component.metrics {
                writeln!(
                    f,
                    "  {:<20} {:>10} ({}, {} entries)",
                    m.name, m.aggregate, m.aggregation, m.entries
                )?;
            }
        }
        Ok(())
    }
}
