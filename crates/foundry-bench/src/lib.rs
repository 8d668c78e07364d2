//! Benchmark profiles for the Foundry simulation.
//!
//! - [`reference_config`]: the default floor (1 belt, 3 robots) at 10 actions/s
//! - [`busy_config`]: 8 belts and 8 robots at 50 actions/s
//! - [`populated_registry`]: a registry pre-filled with components and streams

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use foundry_stats::{Aggregation, StatisticsRegistry};
use foundry_engine::SimulationConfig;

/// Default unit counts, one second at 10 actions per second.
pub fn reference_config() -> SimulationConfig {
    SimulationConfig::new(1, 10)
}

/// Many units contending on the shared floor.
pub fn busy_config() -> SimulationConfig {
    SimulationConfig::new(1, 50).with_units(8, 8)
}

/// A registry with `components` components named `unit-N`, each holding
/// `metrics` count streams named `metric-M` with one entry apiece.
pub fn populated_registry(components: usize, metrics: usize) -> StatisticsRegistry {
    let registry = StatisticsRegistry::new();
    for c in 0..components {
        let name = format!("unit-{c}");
        for m in 0..metrics {
            registry
                .get_or_create_stream(&name, &format!("metric-{m}"), Aggregation::Count)
                .record(1);
        }
    }
    registry
}
