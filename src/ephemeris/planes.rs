//! Out-of-plane geometry: heights above the ecliptic, node crossings,
//! orbit-plane tilts between planets and ring-plane crossings.
//!
//! Everything here uses the same mean-element positions as the rest of the
//! ephemeris, so heights inherit its accuracy. A planet's orbit plane is
//! taken from its osculating-equivalent angular momentum at the epoch.

use serde::{Deserialize, Serialize};

use super::{Planet, mean_elements, mean_period_s, planet_position};
use crate::error::{PhysicsError, PhysicsResult};
use crate::state::{Frame, StateVector};
use crate::time::Epoch;
use crate::transfer;
use crate::types::DEG_TO_RAD;
use crate::units::{Angle, Length, Time, Velocity, degrees, kilometer, km, radian, radians, seconds};
use crate::vector::Direction;

/// Obliquity of the ecliptic at J2000, degrees (IAU 2006).
pub const OBLIQUITY_J2000_DEG: f64 = 23.439_291;

/// Samples per orbit when bracketing a node crossing.
const NODE_SCAN_SAMPLES: u32 = 72;

/// Bisection iterations after bracketing.
const NODE_BISECTIONS: u32 = 60;

/// Height of a planet above (positive) or below the ecliptic plane.
pub fn ecliptic_height(planet: Planet, epoch: Epoch) -> PhysicsResult<Length> {
    Ok(km(planet_position(planet, epoch)?.position.z()))
}

/// Upper bound on a planet's distance from the ecliptic: aphelion distance times sin i.
pub fn max_ecliptic_height(planet: Planet, epoch: Epoch) -> PhysicsResult<Length> {
    let elements = mean_elements(planet).at(epoch)?;
    let a = elements
        .semi_major_axis()
        .ok_or_else(|| PhysicsError::invalid("semi-major axis", format!("{planet} orbit is not bound")))?;
    let aphelion = a.get::<kilometer>() * (1.0 + elements.eccentricity().value());
    Ok(km(aphelion * elements.inclination().get::<radian>().sin()))
}

/// Vertical separation |z_a − z_b| of two planets at the same epoch.
pub fn out_of_plane_distance(a: Planet, b: Planet, epoch: Epoch) -> PhysicsResult<Length> {
    Ok(km((ecliptic_height(a, epoch)? - ecliptic_height(b, epoch)?).get::<kilometer>().abs()))
}

/// Angle between two planets' orbit planes, in [0, π].
pub fn relative_inclination(a: Planet, b: Planet, epoch: Epoch) -> PhysicsResult<Angle> {
    let ha = planet_position(a, epoch)?.angular_momentum();
    let hb = planet_position(b, epoch)?.angular_momentum();
    Ok(radians(ha.angle_between(hb)?))
}

/// Cost of tilting a transfer from one planet's orbit plane into another's.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneChange {
    pub departure: Planet,
    pub arrival: Planet,
    pub relative_inclination: Angle,
    /// Single impulsive rotation at the given speed
    pub delta_v: Velocity,
}

/// Δv to rotate a transfer orbit from the departure planet's plane into the
/// arrival planet's, performed at `speed`.
pub fn transfer_inclination_penalty(
    departure: Planet,
    arrival: Planet,
    epoch: Epoch,
    speed: Velocity,
) -> PhysicsResult<PlaneChange> {
    let tilt = relative_inclination(departure, arrival, epoch)?;
    Ok(PlaneChange {
        departure,
        arrival,
        relative_inclination: tilt,
        delta_v: transfer::plane_change_dv(speed, tilt)?,
    })
}

/// A planet passing through the ecliptic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeCrossing {
    pub planet: Planet,
    pub epoch: Epoch,
    /// Moving from south to north of the ecliptic
    pub ascending: bool,
}

/// First ecliptic crossing of `planet` at or after `after`.
///
/// Scans one orbit plus a margin, then bisects the sign change of the
/// ecliptic height. `None` when the orbit lies in the ecliptic to within the
/// scan resolution.
pub fn next_node_crossing(planet: Planet, after: Epoch) -> PhysicsResult<Option<NodeCrossing>> {
    let step = mean_period_s(planet) / f64::from(NODE_SCAN_SAMPLES);
    let height = |t: Epoch| -> PhysicsResult<f64> { Ok(ecliptic_height(planet, t)?.get::<kilometer>()) };

    let mut lo = after;
    let mut z_lo = height(lo)?;
    for _ in 0..(NODE_SCAN_SAMPLES + NODE_SCAN_SAMPLES / 10) {
        let hi = lo + seconds(step);
        let z_hi = height(hi)?;
        if z_lo == 0.0 || z_lo.signum() != z_hi.signum() {
            let ascending = z_hi > z_lo;
            let epoch = bisect_height(lo, hi, z_lo, &height)?;
            return Ok(Some(NodeCrossing { planet, epoch, ascending }));
        }
        lo = hi;
        z_lo = z_hi;
    }
    Ok(None)
}

fn bisect_height(
    mut lo: Epoch,
    mut hi: Epoch,
    mut z_lo: f64,
    height: &impl Fn(Epoch) -> PhysicsResult<f64>,
) -> PhysicsResult<Epoch> {
    if z_lo == 0.0 {
        return Ok(lo);
    }
    for _ in 0..NODE_BISECTIONS {
        let mid = Epoch::from_j2000_seconds(0.5 * (lo.j2000_seconds() + hi.j2000_seconds()));
        let z_mid = height(mid)?;
        if z_mid.signum() == z_lo.signum() {
            lo = mid;
            z_lo = z_mid;
        } else {
            hi = mid;
        }
    }
    Ok(Epoch::from_j2000_seconds(0.5 * (lo.j2000_seconds() + hi.j2000_seconds())))
}

/// Unit vector in ecliptic coordinates for an equatorial (ICRF) direction.
pub fn equatorial_to_ecliptic(right_ascension: Angle, declination: Angle) -> Direction {
    let (ra, dec) = (right_ascension.get::<radian>(), declination.get::<radian>());
    let (sin_e, cos_e) = (OBLIQUITY_J2000_DEG * DEG_TO_RAD).sin_cos();
    let (x, y, z) = (dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin());
    Direction::new(x, y * cos_e + z * sin_e, -y * sin_e + z * cos_e)
}

/// A planet's equatorial ring plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingSystem {
    pub planet: Planet,
    /// North pole of the ring plane, ecliptic J2000
    pub pole: Direction,
    pub inner_radius: Length,
    pub outer_radius: Length,
}

impl RingSystem {
    /// Saturn's main rings, inner C ring to outer A ring.
    pub fn saturn() -> Self {
        Self {
            planet: Planet::Saturn,
            pole: equatorial_to_ecliptic(degrees(40.589), degrees(83.537)),
            inner_radius: km(66_900.0),
            outer_radius: km(140_180.0),
        }
    }

    /// Uranus' narrow rings, ring 6 to the epsilon ring.
    pub fn uranus() -> Self {
        Self {
            planet: Planet::Uranus,
            pole: equatorial_to_ecliptic(degrees(257.311), degrees(-15.175)),
            inner_radius: km(41_837.0),
            outer_radius: km(51_149.0),
        }
    }

    /// Where a planetocentric approach meets the ring plane.
    ///
    /// The path is extrapolated in a straight line, which holds for the last
    /// hours of a fast approach; the state must be centred on this planet.
    pub fn crossing(&self, state: &StateVector) -> PhysicsResult<RingPlaneCrossing> {
        let frame = Frame::BodyCentric(self.planet);
        if state.frame != frame {
            return Err(PhysicsError::FrameMismatch {
                left: state.frame,
                right: frame,
            });
        }
        let pole = self.pole.raw();
        let height = state.position.raw().dot(pole);
        let v = state.velocity.raw();
        let closing = v.dot(pole);

        let pierce = if closing == 0.0 || height * closing > 0.0 {
            None
        } else {
            let t = -height / closing;
            let radius = (state.position.raw() + v * t).length();
            Some(RingPlanePierce {
                time_to_crossing: seconds(t),
                radius: km(radius),
                within_rings: (self.inner_radius.get::<kilometer>()..=self.outer_radius.get::<kilometer>())
                    .contains(&radius),
                approach_angle: radians((closing.abs() / v.length()).asin()),
            })
        };
        Ok(RingPlaneCrossing {
            planet: self.planet,
            height: km(height),
            pierce,
        })
    }
}

/// Ring-plane geometry of a single approach state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingPlaneCrossing {
    pub planet: Planet,
    /// Signed distance from the ring plane, north positive
    pub height: Length,
    /// `None` when the craft is moving away from or parallel to the plane
    pub pierce: Option<RingPlanePierce>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingPlanePierce {
    pub time_to_crossing: Time,
    /// Distance from the planet centre where the path meets the plane
    pub radius: Length,
    pub within_rings: bool,
    /// Angle between the path and the ring plane
    pub approach_angle: Angle,
}
