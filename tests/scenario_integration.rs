//! Integration tests for scenario files and presets.

mod common;

use std::io::Write;

use approx::assert_relative_eq;
use rayon::prelude::*;
use voyage_physics::PhysicsError;
use voyage_physics::ephemeris::Planet;
use voyage_physics::propagation::IntegratorKind;
use voyage_physics::scenario::{Scenario, presets};

const STRAIGHT_LINE: &str = r#"{
    "name": "one-au-sprint",
    "description": "1 AU from rest to rest at the reference thrust",
    "mass_kg": 4.8e7,
    "thrust_n": 9.8e6,
    "distance_km": 149597870.7,
    "epoch": "2035-03-01T00:00:00Z",
    "duration_s": 1712000.0,
    "exhaust_velocity_km_s": 980.665,
    "integrator": { "method": "rk4", "step": 60.0 }
}"#;

fn write_scenario(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_and_analyze_file() {
    let file = write_scenario(STRAIGHT_LINE);
    let scenario = Scenario::load(file.path()).unwrap();
    assert_eq!(scenario.name, "one-au-sprint");

    let report = scenario.analyze().unwrap();
    assert_relative_eq!(report.acceleration_m_s2, 0.204_17, epsilon = 1e-5);
    // 2√(d/a) for 1 AU at 0.204 m/s² is about 19.8 days
    assert_relative_eq!(report.closed_form.transit_days, 19.8, epsilon = 0.1);
    assert!(report.closed_form.timing_error_fraction.unwrap() < 1e-3);

    assert_eq!(report.propagated.integrator, IntegratorKind::Rk4);
    assert!(report.propagated.distance_error_fraction < 1e-3);
    assert_eq!(report.propagated.rejected_steps, 0);
    assert!(report.arrival.is_none());
    assert!(report.hohmann.is_none());

    let budget = report.propellant.unwrap();
    assert!(budget.mass_ratio > 1.0);
    assert!(budget.propellant_kg < 4.8e7);
}

#[test]
fn test_scenario_file_round_trip() {
    let scenario = Scenario::from_json(STRAIGHT_LINE).unwrap();
    let file = write_scenario(&scenario.to_json().unwrap());
    let back = Scenario::load(file.path()).unwrap();
    assert_eq!(back.name, scenario.name);
    assert_eq!(back.epoch, scenario.epoch);
    assert_eq!(back.integrator, scenario.integrator);
    let km = |s: &Scenario| s.distance.unwrap().get::<voyage_physics::units::kilometer>();
    assert_relative_eq!(km(&back), km(&scenario), max_relative = 1e-15);
}

#[test]
fn test_bad_files_rejected() {
    let missing = std::path::Path::new("/nonexistent/scenario.json");
    assert!(matches!(Scenario::load(missing), Err(PhysicsError::Io(_))));

    let garbled = write_scenario("{ not json");
    assert!(matches!(Scenario::load(garbled.path()), Err(PhysicsError::Serialization(_))));

    let lonely = STRAIGHT_LINE.replace("\"distance_km\": 149597870.7,", "\"departure\": \"mars\",");
    let file = write_scenario(&lonely);
    assert!(matches!(Scenario::load(file.path()), Err(PhysicsError::InputValidation { .. })));
}

#[test]
fn test_reference_transit_reaches_jupiter() {
    let report = presets::reference_transit().analyze().unwrap();
    let arrival = report.arrival.unwrap();
    assert_eq!(arrival.planet, Planet::Jupiter);
    // Aimed at the planet's position at the closed-form arrival time
    assert!(arrival.within_ephemeris_accuracy, "missed by {} deg", arrival.angular_miss_deg);
    assert!(report.propagated.distance_error_fraction < 1e-3);

    let hohmann = report.hohmann.unwrap();
    assert!(hohmann.transfer_days > 10.0 * report.closed_form.transit_days);
    assert!(hohmann.next_window.is_some());
}

#[test]
fn test_presets_analyze_in_parallel() {
    let reports: Vec<_> = presets::all()
        .par_iter()
        .map(|s| s.analyze().map(|r| (r.name.clone(), r.relativistic.significance)))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(reports.len(), presets::NAMES.len());
    for ((name, _), expected) in reports.iter().zip(presets::NAMES) {
        assert_eq!(name, expected);
    }
}
