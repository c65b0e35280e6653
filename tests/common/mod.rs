//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::process::Command;

use voyage_physics::ephemeris::Planet;
use voyage_physics::state::{Frame, StateVector};
use voyage_physics::time::Epoch;
use voyage_physics::types::{mu, radius};
use voyage_physics::units::GravParam;
use voyage_physics::vector::{Position, VelocityVector};

/// Circular LEO at r = 6 578 km, position on +x.
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

/// Planar Earth orbit at periapsis r_p with eccentricity e.
pub fn eccentric_earth_orbit(r_p: f64, e: f64) -> StateVector {
    let a = r_p / (1.0 - e);
    let v = (mu::EARTH.km3_s2() * (2.0 / r_p - 1.0 / a)).sqrt();
    StateVector::new(
        Position::new(r_p, 0.0, 0.0),
        VelocityVector::new(0.0, v, 0.0),
        Epoch::J2000,
        Frame::BodyCentric(Planet::Earth),
    )
}

/// Kepler's third law, seconds.
pub fn orbital_period(semi_major_axis_km: f64, gm: GravParam) -> f64 {
    TAU * (semi_major_axis_km.powi(3) / gm.km3_s2()).sqrt()
}

/// Specific energy in km²/s².
pub fn orbital_energy(state: &StateVector, gm: GravParam) -> f64 {
    0.5 * state.velocity.norm().powi(2) - gm.km3_s2() / state.position.norm()
}

/// Path of the independent Python reference.
pub fn reference_script() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("cross_validation/reference.py")
}

/// Whether `python3` can be spawned on this machine.
pub fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
