//! Classical orbital elements and their conversion to and from state vectors.
//!
//! Elements are stored with the periapsis distance q rather than the
//! semi-major axis so that the near-parabolic branch stays finite
//! (a → ∞ as e → 1). The semi-major axis is derived on demand.

use std::f64::consts::{PI, TAU};

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PhysicsError, PhysicsResult};
use crate::kepler;
use crate::state::{Frame, StateVector};
use crate::time::Epoch;
use crate::units::{
    Angle, Conic, Eccentricity, GravParam, Length, Time, kilometer, km, normalize_radians, radian,
    radians, seconds,
};
use crate::vector::{Direction, Position, VelocityVector};

/// Eccentricity below which an orbit is treated as circular when fitting elements.
pub const CIRCULAR_THRESHOLD: f64 = 1e-10;

/// Inclination (rad) within which an orbit is treated as equatorial when fitting elements.
pub const EQUATORIAL_THRESHOLD: f64 = 1e-10;

/// Keplerian elements of a two-body orbit.
///
/// On the near-parabolic branch `mean_anomaly` is the parabolic mean anomaly
/// (see [`crate::kepler`]).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    periapsis: Length,
    eccentricity: Eccentricity,
    inclination: Angle,
    raan: Angle,
    argument_of_periapsis: Angle,
    mean_anomaly: Angle,
    epoch: Epoch,
    mu: GravParam,
}

/// Which angles [`state_to_elements_detailed`] had to substitute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degeneracy {
    /// e ≈ 0: ω is set to 0 and the anomaly is the argument of latitude u
    pub circular: bool,
    /// i ≈ 0 or π: Ω is set to 0 and ω is the longitude of periapsis ϖ
    pub equatorial: bool,
}

impl Degeneracy {
    pub fn any(&self) -> bool {
        self.circular || self.equatorial
    }
}

fn validate_angles(inclination: Angle, raan: Angle, argp: Angle, anomaly: Angle) -> PhysicsResult<()> {
    let i = inclination.get::<radian>();
    if !(0.0..=PI).contains(&i) {
        return Err(PhysicsError::invalid("inclination", format!("must lie in [0, π], got {i} rad")));
    }
    for (name, value) in [
        ("longitude of ascending node", raan),
        ("argument of periapsis", argp),
        ("mean anomaly", anomaly),
    ] {
        crate::error::ensure_finite(name, value.get::<radian>())?;
    }
    Ok(())
}

impl OrbitalElements {
    /// Build elements from the semi-major axis.
    ///
    /// Elliptic orbits need a > 0 and hyperbolic orbits a < 0. Near-parabolic
    /// eccentricities have no usable semi-major axis; use
    /// [`OrbitalElements::from_periapsis`] for those.
    pub fn from_semi_major_axis(
        semi_major_axis: Length,
        eccentricity: Eccentricity,
        inclination: Angle,
        raan: Angle,
        argument_of_periapsis: Angle,
        mean_anomaly: Angle,
        epoch: Epoch,
        mu: GravParam,
    ) -> PhysicsResult<Self> {
        let a = crate::error::ensure_finite("semi-major axis", semi_major_axis.get::<kilometer>())?;
        let e = eccentricity.value();
        match eccentricity.conic() {
            Conic::NearParabolic => {
                return Err(PhysicsError::invalid(
                    "semi-major axis",
                    format!("undefined for near-parabolic {eccentricity}; build from periapsis distance"),
                ));
            }
            Conic::Circular | Conic::Elliptic if a <= 0.0 => {
                return Err(PhysicsError::invalid("semi-major axis", format!("must be positive for {eccentricity}, got {a} km")));
            }
            Conic::Hyperbolic if a >= 0.0 => {
                return Err(PhysicsError::invalid("semi-major axis", format!("must be negative for {eccentricity}, got {a} km")));
            }
            _ => {}
        }
        Self::from_periapsis(
            km(a * (1.0 - e)),
            eccentricity,
            inclination,
            raan,
            argument_of_periapsis,
            mean_anomaly,
            epoch,
            mu,
        )
    }

    /// Build elements from the periapsis distance q; valid on every branch.
    pub fn from_periapsis(
        periapsis: Length,
        eccentricity: Eccentricity,
        inclination: Angle,
        raan: Angle,
        argument_of_periapsis: Angle,
        mean_anomaly: Angle,
        epoch: Epoch,
        mu: GravParam,
    ) -> PhysicsResult<Self> {
        crate::error::ensure_positive("periapsis distance", periapsis.get::<kilometer>())?;
        validate_angles(inclination, raan, argument_of_periapsis, mean_anomaly)?;
        Ok(Self {
            periapsis,
            eccentricity,
            inclination,
            raan,
            argument_of_periapsis,
            mean_anomaly,
            epoch,
            mu,
        })
    }

    /// Semi-major axis; `None` on the near-parabolic branch.
    pub fn semi_major_axis(&self) -> Option<Length> {
        let e = self.eccentricity.value();
        match self.eccentricity.conic() {
            Conic::NearParabolic => None,
            _ => Some(self.periapsis / (1.0 - e)),
        }
    }

    pub fn periapsis_distance(&self) -> Length {
        self.periapsis
    }

    pub fn eccentricity(&self) -> Eccentricity {
        self.eccentricity
    }

    pub fn inclination(&self) -> Angle {
        self.inclination
    }

    /// Longitude of the ascending node Ω.
    pub fn raan(&self) -> Angle {
        self.raan
    }

    pub fn argument_of_periapsis(&self) -> Angle {
        self.argument_of_periapsis
    }

    /// Mean anomaly at [`OrbitalElements::epoch`].
    pub fn mean_anomaly(&self) -> Angle {
        self.mean_anomaly
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn mu(&self) -> GravParam {
        self.mu
    }

    /// Semi-latus rectum p = q(1 + e).
    pub fn semi_latus_rectum(&self) -> Length {
        self.periapsis * (1.0 + self.eccentricity.value())
    }

    /// Orbital period; `None` for open orbits.
    pub fn period(&self) -> Option<Time> {
        match self.eccentricity.conic() {
            Conic::Circular | Conic::Elliptic => {
                let n = self.mean_motion_rad_s().ok()?;
                Some(seconds(TAU / n))
            }
            Conic::NearParabolic | Conic::Hyperbolic => None,
        }
    }

    /// Rate of the mean anomaly in rad/s on whichever branch applies.
    pub fn mean_motion_rad_s(&self) -> PhysicsResult<f64> {
        match self.semi_major_axis() {
            Some(a) => kepler::mean_motion(self.mu, a),
            None => kepler::parabolic_mean_motion(self.mu, self.periapsis),
        }
    }

    /// Mean anomaly advanced to `t`.
    pub fn mean_anomaly_at(&self, t: Epoch) -> PhysicsResult<Angle> {
        let n = self.mean_motion_rad_s()?;
        Ok(kepler::propagate_mean_anomaly(self.mean_anomaly, n, t - self.epoch, self.eccentricity))
    }

    /// True anomaly at `t`.
    pub fn true_anomaly_at(&self, t: Epoch) -> PhysicsResult<Angle> {
        kepler::mean_to_true(self.mean_anomaly_at(t)?, self.eccentricity)
    }
}

/// Rotate a perifocal vector into the reference frame: Rz(Ω)·Rx(i)·Rz(ω).
fn perifocal_to_frame<U: crate::vector::VectorUnit>(
    v: crate::vector::Vector3<U>,
    raan: f64,
    inclination: f64,
    argp: f64,
) -> crate::vector::Vector3<U> {
    v.rotate_about_unit(Direction::Z, argp)
        .rotate_about_unit(Direction::X, inclination)
        .rotate_about_unit(Direction::Z, raan)
}

/// Position and velocity at epoch `t` from orbital elements.
pub fn elements_to_state(elements: &OrbitalElements, t: Epoch, frame: Frame) -> PhysicsResult<StateVector> {
    let nu = elements.true_anomaly_at(t)?.get::<radian>();
    let e = elements.eccentricity.value();
    let mu = elements.mu.km3_s2();
    let p = elements.semi_latus_rectum().get::<kilometer>();

    let (sin_nu, cos_nu) = nu.sin_cos();
    let r = p / (1.0 + e * cos_nu);
    let vf = (mu / p).sqrt();

    let r_pf = Position::new(r * cos_nu, r * sin_nu, 0.0);
    let v_pf = VelocityVector::new(-vf * sin_nu, vf * (e + cos_nu), 0.0);

    let raan = elements.raan.get::<radian>();
    let inc = elements.inclination.get::<radian>();
    let argp = elements.argument_of_periapsis.get::<radian>();

    let state = StateVector::new(
        perifocal_to_frame(r_pf, raan, inc, argp),
        perifocal_to_frame(v_pf, raan, inc, argp),
        t,
        frame,
    );
    if !state.is_finite() {
        return Err(PhysicsError::PropagationNumerical {
            time: t.j2000_seconds(),
        });
    }
    Ok(state)
}

/// Orbital elements from a state vector.
///
/// Degenerate angles are substituted as described on [`Degeneracy`]; use
/// [`state_to_elements_detailed`] to learn which substitution applied.
pub fn state_to_elements(state: &StateVector, mu: GravParam) -> PhysicsResult<OrbitalElements> {
    state_to_elements_detailed(state, mu).map(|(elements, _)| elements)
}

/// Orbital elements plus the degeneracy report.
pub fn state_to_elements_detailed(
    state: &StateVector,
    mu: GravParam,
) -> PhysicsResult<(OrbitalElements, Degeneracy)> {
    if !state.is_finite() {
        return Err(PhysicsError::invalid("state vector", "contains non-finite components"));
    }
    let mu_v = mu.km3_s2();
    let r = state.position.raw();
    let v = state.velocity.raw();
    let r_mag = r.length();
    let v_mag = v.length();
    if r_mag == 0.0 {
        return Err(PhysicsError::DegenerateVector {
            context: "state position is at the central body",
        });
    }

    let h = r.cross(v);
    let h_mag = h.length();
    if h_mag <= 1e-12 * r_mag * v_mag.max(f64::MIN_POSITIVE) {
        return Err(PhysicsError::DegenerateVector {
            context: "zero angular momentum (rectilinear motion)",
        });
    }
    let h_hat = h / h_mag;

    let e_vec = ((v_mag * v_mag - mu_v / r_mag) * r - r.dot(v) * v) / mu_v;
    let e = e_vec.length();
    let p = h_mag * h_mag / mu_v;
    let q = p / (1.0 + e);
    // atan2 keeps full precision near 0 and π, where acos loses half the digits
    let inclination = (h.x * h.x + h.y * h.y).sqrt().atan2(h.z);

    let degeneracy = Degeneracy {
        circular: e < CIRCULAR_THRESHOLD,
        equatorial: inclination < EQUATORIAL_THRESHOLD || PI - inclination < EQUATORIAL_THRESHOLD,
    };
    // Retrograde equatorial orbits measure longitudes the other way round
    let retro = if h.z < 0.0 { -1.0 } else { 1.0 };

    // Signed angle from a to b about the orbit normal
    let plane_angle = |a: DVec3, b: DVec3| h_hat.dot(a.cross(b)).atan2(a.dot(b));

    let node = DVec3::Z.cross(h);
    let raan = if degeneracy.equatorial {
        0.0
    } else {
        node.y.atan2(node.x).rem_euclid(TAU)
    };

    let (argp, nu) = match (degeneracy.circular, degeneracy.equatorial) {
        (false, false) => (plane_angle(node, e_vec), plane_angle(e_vec, r)),
        (false, true) => ((retro * e_vec.y).atan2(e_vec.x), plane_angle(e_vec, r)),
        // argument of latitude u
        (true, false) => (0.0, plane_angle(node, r)),
        // true longitude λ
        (true, true) => (0.0, (retro * r.y).atan2(r.x)),
    };
    if degeneracy.any() {
        debug!(
            circular = degeneracy.circular,
            equatorial = degeneracy.equatorial,
            "substituting alternate angles for degenerate orbit geometry"
        );
    }

    let eccentricity = Eccentricity::new(if degeneracy.circular { 0.0 } else { e })?;
    let mean_anomaly = kepler::true_to_mean(radians(normalize_radians(nu)), eccentricity)?;

    let elements = OrbitalElements::from_periapsis(
        km(q),
        eccentricity,
        radians(inclination),
        radians(raan),
        radians(argp.rem_euclid(TAU)),
        mean_anomaly,
        state.epoch,
        mu,
    )?;
    Ok((elements, degeneracy))
}
