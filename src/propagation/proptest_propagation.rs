//! Property-based tests for the propagators.
//!
//! These check physical invariants across a range of orbits rather than
//! specific trajectories.

use proptest::prelude::*;

use super::*;
use crate::types::{mu, radius};

fn earth_frame() -> Frame {
    Frame::BodyCentric(crate::ephemeris::Planet::Earth)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// One full period of a circular orbit returns to the starting point.
    #[test]
    fn prop_circular_orbit_closes(r in radius::LEO..radius::GEO) {
        let start = circular_orbit_state(mu::EARTH, km(r), Epoch::J2000, earth_frame()).unwrap();
        let period = std::f64::consts::TAU * (r.powi(3) / mu::EARTH.km3_s2()).sqrt();
        let config = AdaptiveConfig {
            max_step: seconds(period / 50.0),
            ..AdaptiveConfig::planetocentric()
        };
        let result = propagate_dp45(&start, &ForceModel::coast(mu::EARTH), seconds(period), &config).unwrap();
        let miss = (result.final_state().position - start.position).norm();
        prop_assert!(miss / r < 1e-6, "r = {r} km: missed start by {miss} km");
    }

    /// Coasting energy is conserved for bound ellipses of any eccentricity.
    #[test]
    fn prop_dp45_conserves_energy(e in 0.0f64..0.8, a in 8_000.0f64..40_000.0) {
        let start = periapsis_state(
            mu::EARTH,
            km(a),
            Eccentricity::new(e).unwrap(),
            Epoch::J2000,
            earth_frame(),
        )
        .unwrap();
        let period = std::f64::consts::TAU * (a.powi(3) / mu::EARTH.km3_s2()).sqrt();
        let result = propagate_dp45(
            &start,
            &ForceModel::coast(mu::EARTH),
            seconds(period),
            &AdaptiveConfig::default(),
        )
        .unwrap();
        let drift = result.diagnostics().energy_drift.unwrap();
        prop_assert!(drift < 1e-7, "e = {e}, a = {a}: drift {drift:e}");
        prop_assert!(result.diagnostics().angular_momentum_drift.unwrap() < 1e-7);
    }

    /// Prograde thrust never lowers the orbital energy.
    #[test]
    fn prop_prograde_thrust_raises_energy(accel in 1e-4f64..1e-1, duration in 60.0f64..3_600.0) {
        let start = circular_orbit_state(mu::EARTH, km(radius::LEO), Epoch::J2000, earth_frame()).unwrap();
        let model = ForceModel::new(
            Gravity::Central(mu::EARTH),
            ThrustProfile::ConstantPrograde { acceleration: crate::units::m_per_s2(accel) },
        );
        let result = propagate_dp45(&start, &model, seconds(duration), &AdaptiveConfig::planetocentric()).unwrap();
        let e0 = specific_energy_raw(&start, mu::EARTH);
        let e1 = specific_energy_raw(result.final_state(), mu::EARTH);
        prop_assert!(e1 > e0);
    }

    /// Fixed-step runs are bit-for-bit repeatable.
    #[test]
    fn prop_rk4_deterministic(step in 1.0f64..60.0, duration in 100.0f64..5_000.0) {
        let start = circular_orbit_state(mu::EARTH, km(radius::LEO), Epoch::J2000, earth_frame()).unwrap();
        let config = FixedStepConfig::with_step(seconds(step));
        let model = ForceModel::coast(mu::EARTH);
        let a = propagate_rk4(&start, &model, seconds(duration), &config).unwrap();
        let b = propagate_rk4(&start, &model, seconds(duration), &config).unwrap();
        prop_assert_eq!(a.final_state(), b.final_state());
        prop_assert_eq!(a.diagnostics().accepted_steps, integrator::step_count(duration, step));
        prop_assert!(a.diagnostics().min_step.get::<second>() > 0.0);
    }

    /// Whole multiples of the step never gain a trailing zero-length step.
    #[test]
    fn prop_rk4_whole_multiples(step in 0.01f64..60.0, n in 1u64..200) {
        let start = circular_orbit_state(mu::EARTH, km(radius::LEO), Epoch::J2000, earth_frame()).unwrap();
        let config = FixedStepConfig { step: seconds(step), sample_every: 1, ..FixedStepConfig::default() };
        let result = propagate_rk4(&start, &ForceModel::coast(mu::EARTH), seconds(n as f64 * step), &config).unwrap();
        prop_assert_eq!(result.diagnostics().accepted_steps, n);
        prop_assert_eq!(result.samples().len() as u64, n + 1);
    }
}
