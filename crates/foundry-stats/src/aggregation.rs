//! Aggregation functions over a metric stream.

use std::fmt;

use foundry_core::MetricValue;

/// How a [`Statistic`](crate::Statistic) summarizes its recorded values.
///
/// Non-numeric entries are counted by [`Count`](Aggregation::Count) and
/// ignored by every other kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Number of recorded entries. Units record one entry per event, so
    /// this is the event count.
    #[default]
    Count,
    /// Sum of numeric entries.
    Sum,
    /// Sum of the absolute values of numeric entries.
    SumOfMagnitudes,
    /// Arithmetic mean of numeric entries; `0.0` when there are none.
    Mean,
    /// Largest numeric entry; `0.0` when there are none.
    Max,
}

impl Aggregation {
    /// Apply this aggregation to a slice of recorded values.
    pub fn apply(self, values: &[MetricValue]) -> f64 {
        let numeric = values.iter().filter_map(MetricValue::as_number);
        match self {
            Self::Count => values.len() as f64,
            Self::Sum => numeric.sum(),
            Self::SumOfMagnitudes => numeric.map(f64::abs).sum(),
            Self::Mean => {
                let (sum, n) = numeric.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    0.0
                } else {
                    sum / n as f64
                }
            }
            Self::Max => numeric.reduce(f64::max).unwrap_or(0.0),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::SumOfMagnitudes => "sum_abs",
            Self::Mean => "mean",
            Self::Max => "max",
        };
        f.write_str(name)
    }
}
