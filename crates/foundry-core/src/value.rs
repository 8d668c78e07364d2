//! Recorded metric values.
//!
//! Most metrics are quantitative, but a stream may also hold free-form
//! text (e.g. a status label). Text that parses as a number is treated as
//! numeric for aggregation and observer notification.

use std::fmt;

/// A single value recorded into a metric stream.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    /// A quantitative measurement.
    Number(f64),
    /// A non-quantitative value, stored verbatim.
    Text(String),
}

impl MetricValue {
    /// Numeric interpretation of this value, if it has one.
    ///
    /// `Text` values are parsed after trimming whitespace; anything that
    /// does not parse as a finite or infinite `f64` yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Whether this value has a numeric interpretation.
    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}
