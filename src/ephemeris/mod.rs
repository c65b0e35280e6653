//! Approximate planetary ephemeris.
//!
//! Runtime behavior:
//! - Mean Keplerian elements with linear secular drift per Julian century
//!   (see [`data`]), evaluated through [`elements_to_state`] so positions share
//!   the Kepler solver with every other orbit in the crate.
//! - Accuracy is of order [`STATED_ACCURACY_DEG`] in heliocentric longitude
//!   near the reference epoch; good enough for phase angles and launch windows,
//!   not for navigation.
//!
//! Coordinate frame:
//! - 3D heliocentric (Sun at origin), J2000 ecliptic and equinox.
//! - Out-of-plane checks (heights, node crossings, ring planes) live in
//!   [`planes`].

pub mod data;
pub mod planes;

#[cfg(test)]
mod proptest_ephemeris;

pub use data::{MeanElements, Planet, Secular, mean_elements, warm_up};
pub use planes::{
    NodeCrossing, PlaneChange, RingPlaneCrossing, RingSystem, ecliptic_height, max_ecliptic_height,
    next_node_crossing, out_of_plane_distance, relative_inclination, transfer_inclination_penalty,
};

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::elements::{OrbitalElements, elements_to_state};
use crate::error::{PhysicsError, PhysicsResult};
use crate::state::{Frame, StateVector};
use crate::time::Epoch;
use crate::types::{AU_KM, DEG_TO_RAD, SECONDS_PER_DAY, mu};
use crate::units::{
    Angle, Eccentricity, Length, Time, degrees, kilometer, km, normalize_angle_positive, normalize_radians,
    radian, radians, second, seconds,
};

/// Stated accuracy of the mean-element model, in degrees of heliocentric longitude.
pub const STATED_ACCURACY_DEG: f64 = 1.0;

/// Step used to bracket a transfer window.
const WINDOW_SCAN_STEP_DAYS: f64 = 0.5;

/// Bisection iterations after bracketing.
const WINDOW_BISECTIONS: u32 = 60;

/// A window is accepted once the phase error is below this (deg).
const WINDOW_ACCEPT_DEG: f64 = 0.1;

/// Stated accuracy of the model as an angle.
pub fn stated_accuracy() -> Angle {
    degrees(STATED_ACCURACY_DEG)
}

impl MeanElements {
    /// Osculating-equivalent heliocentric elements at `epoch`.
    ///
    /// The published table carries a tiny negative inclination for Earth;
    /// negative inclinations are folded into [0, π] by flipping the node by π,
    /// which describes the same orbit plane.
    pub fn at(&self, epoch: Epoch) -> PhysicsResult<OrbitalElements> {
        let t = epoch.julian_centuries();
        let a = self.semi_major_axis_au.at(t) * AU_KM;
        let e = Eccentricity::new(self.eccentricity.at(t))?;
        let mut i = self.inclination_deg.at(t) * DEG_TO_RAD;
        let l = self.mean_longitude_deg.at(t) * DEG_TO_RAD;
        let w_bar = self.longitude_of_perihelion_deg.at(t) * DEG_TO_RAD;
        let mut node = self.ascending_node_deg.at(t) * DEG_TO_RAD;
        if i < 0.0 {
            i = -i;
            node += PI;
        }
        let argp = w_bar - node;
        let mean_anomaly = normalize_radians(l - w_bar);

        OrbitalElements::from_semi_major_axis(
            km(a),
            e,
            radians(i),
            normalize_angle_positive(radians(node)),
            normalize_angle_positive(radians(argp)),
            radians(mean_anomaly),
            epoch,
            mu::SUN,
        )
    }
}

/// Heliocentric state of a planet at an epoch.
pub fn planet_position(planet: Planet, epoch: Epoch) -> PhysicsResult<StateVector> {
    let elements = mean_elements(planet).at(epoch)?;
    elements_to_state(&elements, epoch, Frame::Heliocentric)
}

/// Heliocentric ecliptic longitude of a planet, in [0, 2π).
pub fn planet_longitude(planet: Planet, epoch: Epoch) -> PhysicsResult<Angle> {
    let state = planet_position(planet, epoch)?;
    Ok(normalize_angle_positive(radians(state.position.y().atan2(state.position.x()))))
}

/// Longitude of `to` minus longitude of `from`, in (−π, π].
///
/// Positive when `to` leads `from` in the direction of orbital motion.
pub fn phase_angle(from: Planet, to: Planet, epoch: Epoch) -> PhysicsResult<Angle> {
    let lead = planet_longitude(to, epoch)?.get::<radian>() - planet_longitude(from, epoch)?.get::<radian>();
    Ok(radians(normalize_radians(lead)))
}

/// Circular period at a planet's mean distance, in seconds.
fn mean_period_s(planet: Planet) -> f64 {
    let a = planet.mean_distance().get::<kilometer>();
    2.0 * PI * (a * a * a / mu::SUN.km3_s2()).sqrt()
}

/// Time between successive identical configurations of two planets.
pub fn synodic_period(a: Planet, b: Planet) -> PhysicsResult<Time> {
    if a == b {
        return Err(PhysicsError::invalid("planets", format!("synodic period of {a} with itself is unbounded")));
    }
    let rate = (1.0 / mean_period_s(a) - 1.0 / mean_period_s(b)).abs();
    Ok(seconds(1.0 / rate))
}

/// Half-period of the Hohmann ellipse between the mean orbits of two planets.
pub fn hohmann_transfer_time(departure: Planet, arrival: Planet) -> Time {
    let r1 = departure.mean_distance().get::<kilometer>();
    let r2 = arrival.mean_distance().get::<kilometer>();
    let a = 0.5 * (r1 + r2);
    seconds(PI * (a * a * a / mu::SUN.km3_s2()).sqrt())
}

/// Required lead of the arrival planet over the departure planet at launch,
/// in (−π, π].
///
/// The arrival planet must reach the point opposite the departure point in
/// exactly the transfer time: θ = π − n₂·t_transfer.
pub fn hohmann_phase_angle(departure: Planet, arrival: Planet) -> Angle {
    let n2 = 2.0 * PI / mean_period_s(arrival);
    let t = hohmann_transfer_time(departure, arrival).get::<second>();
    radians(normalize_radians(PI - n2 * t))
}

/// First epoch at or after `after` where the actual phase angle matches the
/// Hohmann phase angle.
///
/// Scans 1.2 synodic periods at a half-day step for a bracketing sign change,
/// then bisects. `Ok(None)` if no crossing converges within 0.1°.
pub fn next_hohmann_window(departure: Planet, arrival: Planet, after: Epoch) -> PhysicsResult<Option<Epoch>> {
    let target = hohmann_phase_angle(departure, arrival).get::<radian>();
    let residual = |t: Epoch| -> PhysicsResult<f64> {
        Ok(normalize_radians(phase_angle(departure, arrival, t)?.get::<radian>() - target))
    };

    let span = 1.2 * synodic_period(departure, arrival)?.get::<second>();
    let step = WINDOW_SCAN_STEP_DAYS * SECONDS_PER_DAY;
    let steps = (span / step).ceil() as u64;

    let mut t_lo = after;
    let mut f_lo = residual(t_lo)?;
    if f_lo == 0.0 {
        return Ok(Some(t_lo));
    }
    for _ in 0..steps {
        let t_hi = t_lo + seconds(step);
        let f_hi = residual(t_hi)?;
        // A sign change across ±π is the wrap, not a root
        if f_lo.signum() != f_hi.signum() && f_lo.abs() < PI / 2.0 && f_hi.abs() < PI / 2.0 {
            return refine_window(residual, t_lo, f_lo, t_hi);
        }
        t_lo = t_hi;
        f_lo = f_hi;
    }
    Ok(None)
}

fn refine_window(
    residual: impl Fn(Epoch) -> PhysicsResult<f64>,
    mut lo: Epoch,
    mut f_lo: f64,
    mut hi: Epoch,
) -> PhysicsResult<Option<Epoch>> {
    for _ in 0..WINDOW_BISECTIONS {
        let mid = Epoch::from_j2000_seconds(0.5 * (lo.j2000_seconds() + hi.j2000_seconds()));
        let f_mid = residual(mid)?;
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    let best = Epoch::from_j2000_seconds(0.5 * (lo.j2000_seconds() + hi.j2000_seconds()));
    if residual(best)?.abs() < WINDOW_ACCEPT_DEG * DEG_TO_RAD {
        Ok(Some(best))
    } else {
        Ok(None)
    }
}

/// How closely a trajectory end point meets a planet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrivalAlignment {
    pub planet: Planet,
    pub epoch: Epoch,
    /// Straight-line miss distance
    pub distance: Length,
    /// Angle between the two heliocentric position vectors
    pub angular_miss: Angle,
}

/// Compare a heliocentric arrival state with the planet's ephemeris position
/// at the same epoch.
pub fn arrival_alignment(planet: Planet, arrival: &StateVector) -> PhysicsResult<ArrivalAlignment> {
    let body = planet_position(planet, arrival.epoch)?;
    let distance = arrival.distance_to(&body)?;
    let angular_miss = arrival.position.angle_between(body.position)?;
    Ok(ArrivalAlignment {
        planet,
        epoch: arrival.epoch,
        distance,
        angular_miss: radians(angular_miss),
    })
}
