//! Identifiers: metric keys, unit kinds, and well-known metric names.

use std::fmt;
use std::str::FromStr;

use crate::error::UnitError;

/// Metric names recorded by the built-in units.
pub mod metric_names {
    /// Point-in-time gauge: one entry per unit currently inside an action.
    pub const ACTIVE_UNITS: &str = "ActiveUnits";
    /// One entry per item a producer placed on the shared channel.
    pub const ITEMS_MOVED: &str = "ItemsMoved";
    /// One entry per action a consumer performed.
    pub const ACTIONS_PERFORMED: &str = "ActionsPerformed";
    /// One entry per item a consumer actually took off the channel.
    pub const ITEMS_TAKEN: &str = "ItemsTaken";
}

/// Identifies one metric stream: `(component, metric)`.
///
/// Components are unit instances (e.g. `"belt-1"`); metrics are named
/// measurements recorded by that component (e.g. `"ItemsMoved"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    /// Name of the owning component.
    pub component: String,
    /// Name of the metric within the component.
    pub metric: String,
}

impl MetricKey {
    /// Build a key from any string-like component and metric names.
    pub fn new(component: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            metric: metric.into(),
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.metric)
    }
}

/// The kind of a unit, selected by a type tag at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Puts items onto the shared channel (a conveyor belt).
    Producer,
    /// Takes items off the shared channel under the concurrency limiter (a robot).
    Consumer,
}

impl UnitKind {
    /// Canonical type tag for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }

    /// Name of the `index`-th unit (1-based) of this kind.
    ///
    /// Producers are named `belt-N` and consumers `Robot-N`.
    pub fn unit_name(self, index: usize) -> String {
        match self {
            Self::Producer => format!("belt-{index}"),
            Self::Consumer => format!("Robot-{index}"),
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for UnitKind {
    type Err = UnitError;

    /// Parse a type tag, case-insensitively. `"belt"` and `"robot"` are
    /// accepted as aliases for producer and consumer.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.to_ascii_lowercase().as_str() {
            "producer" | "belt" => Ok(Self::Producer),
            "consumer" | "robot" => Ok(Self::Consumer),
            _ => Err(UnitError::UnknownKind {
                tag: tag.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_tags() {
        assert_eq!("producer".parse::<UnitKind>(), Ok(UnitKind::Producer));
        assert_eq!("consumer".parse::<UnitKind>(), Ok(UnitKind::Consumer));
    }

    #[test]
    fn parse_aliases_case_insensitive() {
        assert_eq!("Belt".parse::<UnitKind>(), Ok(UnitKind::Producer));
        assert_eq!("ROBOT".parse::<UnitKind>(), Ok(UnitKind::Consumer));
    }

    #[test]
    fn parse_unknown_tag_fails() {
        match "forklift".parse::<UnitKind>() {
            Err(UnitError::UnknownKind { tag }) => assert_eq!(tag, "forklift"),
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }

    #[test]
    fn unit_names_follow_kind() {
        assert_eq!(UnitKind::Producer.unit_name(1), "belt-1");
        assert_eq!(UnitKind::Consumer.unit_name(3), "Robot-3");
    }

    #[test]
    fn metric_key_display() {
        let key = MetricKey::new("belt-1", metric_names::ITEMS_MOVED);
        assert_eq!(key.to_string(), "belt-1/ItemsMoved");
    }
}
