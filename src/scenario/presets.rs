//! Preset scenarios.
//!
//! The reference ship is 48 000 t pushed by 9.8 MN (a ≈ 0.204 m/s²). The
//! other presets are the lighter-mass legs whose timings the narrative states
//! outright, so the analysis can confirm or refute them.

use chrono::{DateTime, TimeZone, Utc};

use super::Scenario;
use crate::ephemeris::Planet;
use crate::propagation::Integrator;
use crate::relativistic::DEFAULT_SIGNIFICANCE_THRESHOLD;
use crate::types::SECONDS_PER_DAY;
use crate::units::{kilograms, km, km_per_s, newtons, seconds};

/// Identifiers accepted by [`by_name`].
pub const NAMES: [&str; 3] = ["reference-transit", "saturn-uranus-leg", "uranus-earth-leg"];

fn epoch(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Full-mass ship, Mars to Jupiter.
pub fn reference_transit() -> Scenario {
    Scenario {
        name: "reference-transit".into(),
        description: "48 000 t at 9.8 MN from Mars to Jupiter".into(),
        mass: kilograms(4.8e7),
        thrust: newtons(9.8e6),
        distance: None,
        epoch: epoch(2035, 3, 1),
        duration: None,
        exhaust_velocity: Some(km_per_s(980.665)),
        departure: Some(Planet::Mars),
        arrival: Some(Planet::Jupiter),
        dry_mass: None,
        mass_events: Vec::new(),
        integrator: Integrator::default(),
        significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
    }
}

/// Stated 1 438 930 000 km in 515 520 s; needs the ship at 452 t.
pub fn saturn_uranus_leg() -> Scenario {
    Scenario {
        name: "saturn-uranus-leg".into(),
        description: "Saturn to Uranus at the mass that makes the stated timing work".into(),
        mass: kilograms(452_000.0),
        thrust: newtons(9.8e6),
        distance: Some(km(1_438_930_000.0)),
        epoch: epoch(2040, 6, 1),
        duration: Some(seconds(515_520.0)),
        exhaust_velocity: None,
        departure: Some(Planet::Saturn),
        arrival: Some(Planet::Uranus),
        dry_mass: None,
        mass_events: Vec::new(),
        integrator: Integrator::default(),
        significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
    }
}

/// 18.2 AU in 8.3 days at 300 t: about 2.5 % of light speed at the flip.
pub fn uranus_earth_leg() -> Scenario {
    Scenario {
        name: "uranus-earth-leg".into(),
        description: "Uranus to Earth, pure brachistochrone".into(),
        mass: kilograms(300_000.0),
        thrust: newtons(6.384e6),
        distance: Some(km(2_722_861_977.0)),
        epoch: epoch(2041, 1, 15),
        duration: Some(seconds(8.3 * SECONDS_PER_DAY)),
        exhaust_velocity: Some(km_per_s(9_806.65)),
        departure: None,
        arrival: None,
        dry_mass: None,
        mass_events: Vec::new(),
        integrator: Integrator::default(),
        significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
    }
}

/// All presets in [`NAMES`] order.
pub fn all() -> Vec<Scenario> {
    vec![reference_transit(), saturn_uranus_leg(), uranus_earth_leg()]
}

pub fn by_name(name: &str) -> Option<Scenario> {
    all().into_iter().find(|s| s.name == name)
}
