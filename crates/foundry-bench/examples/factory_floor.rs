//! End-to-end factory floor run.
//!
//! Demonstrates: raw input → Simulation → run with a logging observer →
//! per-unit report → registry summary → reset.
//!
//! Run with `RUST_LOG=info` to see every metric update.

use foundry_core::metric_names::{ACTIONS_PERFORMED, ITEMS_MOVED, ITEMS_TAKEN};
use foundry_engine::config::keys;
use foundry_engine::{Simulation, SimulationInput};
use foundry_stats::{LoggingObserver, StatisticsRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut input = SimulationInput::new();
    input
        .set(keys::TIME, 2)
        .set(keys::ACTIONS_PER_SECOND, 4)
        .set(keys::NUM_BELTS, 2)
        .set(keys::NUM_ROBOTS, 3);
    input.add_input("RobotsMustYell", ["HELLO, WORLD"]);

    let registry = StatisticsRegistry::new();
    registry.register_observer(LoggingObserver);

    let simulation = Simulation::from_input(&input, registry.clone())?;
    log::info!("units: {:?}", simulation.unit_names());
    let report = simulation.run()?;

    println!("{report}");
    print!("{}", registry.summary());
    println!(
        "moved {} / taken {} / robot actions {}",
        registry.total(ITEMS_MOVED),
        registry.total(ITEMS_TAKEN),
        registry.total(ACTIONS_PERFORMED)
    );

    registry.dispose()?;
    Ok(())
}
