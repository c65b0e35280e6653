//! Test utilities for orbital mechanics tests.
//!
//! Provides fixtures for creating test orbits and assertions for verifying
//! physical invariants like energy and angular momentum conservation.

use crate::elements::OrbitalElements;
use crate::ephemeris::Planet;
use crate::state::{Frame, StateVector};
use crate::time::Epoch;
use crate::types::{AU_KM, mu, radius};
use crate::units::{Eccentricity, GravParam, km, radians};
use crate::vector::{Position, VelocityVector};

/// Fixtures for creating test orbital states.
pub mod fixtures {
    use super::*;

    /// Body in a circular heliocentric orbit at `distance_au`.
    ///
    /// Placed on +x with velocity along +y.
    pub fn circular_orbit(distance_au: f64) -> StateVector {
        let r = distance_au * AU_KM;
        let v = (mu::SUN.km3_s2() / r).sqrt();
        StateVector::new(
            Position::new(r, 0.0, 0.0),
            VelocityVector::new(0.0, v, 0.0),
            Epoch::J2000,
            Frame::Heliocentric,
        )
    }

    /// Circular low Earth orbit at r = 6 578 km.
    pub fn leo() -> StateVector {
        let r = radius::LEO;
        let v = (mu::EARTH.km3_s2() / r).sqrt();
        StateVector::new(
            Position::new(r, 0.0, 0.0),
            VelocityVector::new(0.0, v, 0.0),
            Epoch::J2000,
            Frame::BodyCentric(Planet::Earth),
        )
    }

    /// Heliocentric ellipse starting at perihelion on +x.
    pub fn elliptical_orbit(perihelion_au: f64, eccentricity: f64) -> StateVector {
        assert!(
            (0.0..1.0).contains(&eccentricity),
            "Eccentricity must be in [0, 1) for elliptical orbit"
        );
        let r_p = perihelion_au * AU_KM;
        let a = r_p / (1.0 - eccentricity);
        // Vis-viva at perihelion
        let v = (mu::SUN.km3_s2() * (2.0 / r_p - 1.0 / a)).sqrt();
        StateVector::new(
            Position::new(r_p, 0.0, 0.0),
            VelocityVector::new(0.0, v, 0.0),
            Epoch::J2000,
            Frame::Heliocentric,
        )
    }

    /// Escape trajectory at 1.1× the local escape speed.
    pub fn escape_trajectory(distance_au: f64) -> StateVector {
        let r = distance_au * AU_KM;
        let v = 1.1 * (2.0 * mu::SUN.km3_s2() / r).sqrt();
        StateVector::new(
            Position::new(r, 0.0, 0.0),
            VelocityVector::new(0.0, v, 0.0),
            Epoch::J2000,
            Frame::Heliocentric,
        )
    }

    /// Inclined, eccentric element set with no degenerate angles.
    pub fn inclined_elements(a_km: f64, e: f64, gm: GravParam) -> OrbitalElements {
        OrbitalElements::from_semi_major_axis(
            km(a_km),
            Eccentricity::new(e).expect("valid eccentricity"),
            radians(0.5),
            radians(1.2),
            radians(2.1),
            radians(0.7),
            Epoch::J2000,
            gm,
        )
        .expect("valid elements")
    }
}

/// Assertions for verifying physical invariants.
pub mod assertions {
    use super::*;

    /// Relative change, falling back to absolute change near zero.
    pub fn relative_drift(initial: f64, current: f64) -> f64 {
        if initial.abs() > 1e-10 {
            ((current - initial) / initial).abs()
        } else {
            (current - initial).abs()
        }
    }

    /// Assert that specific energy is conserved within tolerance.
    ///
    /// # Panics
    /// Panics if relative energy drift exceeds tolerance.
    pub fn assert_energy_conserved(initial: &StateVector, current: &StateVector, gm: GravParam, tolerance: f64) {
        let e0 = initial.specific_energy(gm).value;
        let e1 = current.specific_energy(gm).value;
        let drift = relative_drift(e0, e1);
        assert!(
            drift <= tolerance,
            "Energy not conserved: initial={e0:.6e}, final={e1:.6e}, drift={drift:.6e}, tolerance={tolerance:.6e}"
        );
    }

    /// Assert that the angular momentum vector is conserved within tolerance.
    ///
    /// # Panics
    /// Panics if |Δh|/|h₀| exceeds tolerance.
    pub fn assert_angular_momentum_conserved(initial: &StateVector, current: &StateVector, tolerance: f64) {
        let h0 = initial.angular_momentum();
        let h1 = current.angular_momentum();
        let drift = (h1 - h0).norm() / h0.norm();
        assert!(
            drift <= tolerance,
            "Angular momentum not conserved: |h0|={:.6e}, |h1|={:.6e}, drift={drift:.6e}, tolerance={tolerance:.6e}",
            h0.norm(),
            h1.norm()
        );
    }

    /// Distance between two positions in km.
    pub fn separation_km(a: &StateVector, b: &StateVector) -> f64 {
        (a.position - b.position).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::kilometer;
    use approx::assert_relative_eq;

    #[test]
    fn test_circular_orbit_has_correct_velocity() {
        let state = fixtures::circular_orbit(1.0);
        let expected_v = (mu::SUN.km3_s2() / AU_KM).sqrt();
        assert_relative_eq!(state.velocity.norm(), expected_v, max_relative = 1e-14);
    }

    #[test]
    fn test_bound_and_unbound_fixtures() {
        assert!(fixtures::circular_orbit(1.0).specific_energy(mu::SUN).value < 0.0);
        assert!(fixtures::elliptical_orbit(1.0, 0.5).specific_energy(mu::SUN).value < 0.0);
        assert!(fixtures::escape_trajectory(1.0).specific_energy(mu::SUN).value > 0.0);
    }

    #[test]
    fn test_leo_radius() {
        assert_relative_eq!(fixtures::leo().radius().get::<kilometer>(), radius::LEO);
    }

    #[test]
    fn test_assertions_accept_identical_states() {
        let s = fixtures::leo();
        assertions::assert_energy_conserved(&s, &s, mu::EARTH, 0.0);
        assertions::assert_angular_momentum_conserved(&s, &s, 0.0);
        assert_eq!(assertions::separation_km(&s, &s), 0.0);
    }
}
