//! End-to-end runs of the factory floor.
//!
//! Each test builds its own registry, so tests are independent even when
//! run in parallel.

use foundry_core::metric_names::{ACTIONS_PERFORMED, ACTIVE_UNITS, ITEMS_MOVED, ITEMS_TAKEN};
use foundry_core::StatsError;
use foundry_engine::{Simulation, SimulationError};
use foundry_stats::StatisticsRegistry;
use foundry_test_utils::fixtures::{config, input, input_with_units};
use foundry_test_utils::RecordingObserver;

#[test]
fn single_belt_moves_three_items_at_three_per_second() {
    let registry = StatisticsRegistry::new();
    Simulation::from_input(&input_with_units(1, 3, 1, 0), registry.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(registry.aggregate("belt-1", ITEMS_MOVED).unwrap(), 3.0);
}

#[test]
fn robot_without_belts_performs_two_actions() {
    let registry = StatisticsRegistry::new();
    let report = Simulation::from_input(&input_with_units(1, 2, 0, 1), registry.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(registry.aggregate("Robot-1", ACTIONS_PERFORMED).unwrap(), 2.0);
    assert_eq!(registry.aggregate("Robot-1", ITEMS_TAKEN).unwrap(), 0.0);
    assert_eq!(report.unit("Robot-1").unwrap().completed, 2);
}

#[test]
fn three_belts_and_three_robots_balance() {
    let registry = StatisticsRegistry::new();
    let report = Simulation::from_input(&input_with_units(1, 1, 3, 3), registry.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(registry.total(ITEMS_MOVED), 3.0);
    assert_eq!(registry.total(ACTIONS_PERFORMED), 3.0);
    assert_eq!(registry.total(ITEMS_TAKEN), 3.0);
    assert!(!report.cancelled);
    assert_eq!(report.total_completed(), 6);
}

#[test]
fn default_counts_start_one_belt_and_three_robots() {
    let registry = StatisticsRegistry::new();
    let report = Simulation::from_input(&input(1, 3), registry.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(
        registry.component_names(),
        vec!["Robot-1", "Robot-2", "Robot-3", "belt-1"]
    );
    assert_eq!(registry.aggregate("belt-1", ITEMS_MOVED).unwrap(), 3.0);
    // Three items for nine consumer actions: the rest run idle once the
    // belt is done.
    assert_eq!(registry.total(ITEMS_TAKEN), 3.0);
    assert_eq!(registry.total(ACTIONS_PERFORMED), 9.0);
    assert_eq!(report.units.len(), 4);
}

#[test]
fn active_units_gauge_is_empty_after_run() {
    let registry = StatisticsRegistry::new();
    Simulation::new(config(1, 4, 2, 2), registry.clone())
        .unwrap()
        .run()
        .unwrap();

    for name in registry.component_names() {
        assert_eq!(registry.aggregate(&name, ACTIVE_UNITS).unwrap(), 0.0, "{name}");
    }
}

#[test]
fn observers_see_every_numeric_record() {
    let registry = StatisticsRegistry::new();
    let observer = RecordingObserver::new();
    registry.register_observer(observer.clone());

    Simulation::new(config(1, 2, 1, 1), registry.clone())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(observer.count_for("belt-1", ITEMS_MOVED), 2);
    assert_eq!(observer.count_for("Robot-1", ACTIONS_PERFORMED), 2);
    // Every active marker is notified once on entry.
    assert_eq!(observer.count_for("belt-1", ACTIVE_UNITS), 2);
    assert_eq!(observer.total(ITEMS_MOVED), registry.total(ITEMS_MOVED));
}

#[test]
fn registry_reset_between_runs() {
    let registry = StatisticsRegistry::new();
    Simulation::new(config(1, 2, 1, 1), registry.clone())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(registry.component_count(), 2);

    registry.reset_all().unwrap();
    assert_eq!(registry.component_count(), 0);
    assert!(matches!(
        registry.aggregate("belt-1", ITEMS_MOVED),
        Err(StatsError::ComponentNotFound { .. })
    ));

    Simulation::new(config(1, 1, 1, 0), registry.clone())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(registry.aggregate("belt-1", ITEMS_MOVED).unwrap(), 1.0);
}

#[test]
fn missing_rate_fails_before_any_unit_starts() {
    let registry = StatisticsRegistry::new();
    let mut si = input(1, 1);
    si.add_input("ActionsPerSecond", Vec::<String>::new());
    let err = Simulation::from_input(&si, registry.clone()).unwrap_err();
    assert!(matches!(err, SimulationError::Config(_)), "{err}");
    assert_eq!(registry.component_count(), 0);
}
