//! Property-based tests for the mean-element ephemeris.

use proptest::prelude::*;

use super::*;
use crate::state::specific_energy_raw;
use crate::types::SECONDS_PER_DAY;

/// Roughly ±50 years around J2000.
const SPAN_DAYS: f64 = 50.0 * 365.25;

fn any_planet() -> impl Strategy<Value = Planet> {
    prop::sample::select(Planet::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Heliocentric distance stays between perihelion and aphelion of the
    /// drifted elements at the same epoch.
    #[test]
    fn prop_distance_within_apsides(planet in any_planet(), days in -SPAN_DAYS..SPAN_DAYS) {
        let epoch = Epoch::from_j2000_seconds(days * SECONDS_PER_DAY);
        let el = mean_elements(planet).at(epoch).unwrap();
        let a = el.semi_major_axis().unwrap().get::<kilometer>();
        let e = el.eccentricity().value();
        let r = planet_position(planet, epoch).unwrap().radius().get::<kilometer>();
        prop_assert!(r >= a * (1.0 - e) * (1.0 - 1e-9), "{planet}: r={r} below perihelion");
        prop_assert!(r <= a * (1.0 + e) * (1.0 + 1e-9), "{planet}: r={r} above aphelion");
    }

    /// Ephemeris states are bound heliocentric orbits with the tabulated energy.
    #[test]
    fn prop_energy_matches_semi_major_axis(planet in any_planet(), days in -SPAN_DAYS..SPAN_DAYS) {
        let epoch = Epoch::from_j2000_seconds(days * SECONDS_PER_DAY);
        let el = mean_elements(planet).at(epoch).unwrap();
        let a = el.semi_major_axis().unwrap().get::<kilometer>();
        let state = planet_position(planet, epoch).unwrap();
        let energy = specific_energy_raw(&state, mu::SUN);
        let expected = -mu::SUN.km3_s2() / (2.0 * a);
        prop_assert!(((energy - expected) / expected).abs() < 1e-9);
    }

    /// Phase angle is antisymmetric and wrapped into (−π, π].
    #[test]
    fn prop_phase_angle_antisymmetric(
        a in any_planet(),
        b in any_planet(),
        days in -SPAN_DAYS..SPAN_DAYS,
    ) {
        let epoch = Epoch::from_j2000_seconds(days * SECONDS_PER_DAY);
        let ab = phase_angle(a, b, epoch).unwrap().get::<radian>();
        let ba = phase_angle(b, a, epoch).unwrap().get::<radian>();
        prop_assert!(ab > -PI && ab <= PI);
        prop_assert!(normalize_radians(ab + ba).abs() < 1e-12);
    }

    /// Inclinations stay in [0, π] even where the table drifts negative.
    #[test]
    fn prop_inclination_in_range(planet in any_planet(), days in -SPAN_DAYS..SPAN_DAYS) {
        let epoch = Epoch::from_j2000_seconds(days * SECONDS_PER_DAY);
        let i = mean_elements(planet).at(epoch).unwrap().inclination().get::<radian>();
        prop_assert!((0.0..=PI).contains(&i));
    }
}
