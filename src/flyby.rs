//! Patched-conic planetary flybys.
//!
//! Inside a planet's sphere of influence the craft follows a hyperbola; the
//! flyby turns the hyperbolic excess velocity v∞ without changing its size,
//! unless a burn is made at periapsis (the Oberth manoeuvre). The heliocentric
//! exit velocity is the planet's velocity plus the turned v∞.

use serde::{Deserialize, Serialize};

use crate::ephemeris::Planet;
use crate::error::{PhysicsError, PhysicsResult, ensure_finite, ensure_positive};
use crate::types::mu;
use crate::units::{Angle, GravParam, Length, Velocity, kilometer, kilometer_per_second, km, km_per_s, radians};
use crate::vector::{Direction, VelocityVector};

/// Laplace sphere of influence: r = a·(μ_body/μ_primary)^(2/5).
pub fn soi_radius(orbit_radius: Length, mu_body: GravParam, mu_primary: GravParam) -> PhysicsResult<Length> {
    let a = ensure_positive("orbit radius", orbit_radius.get::<kilometer>())?;
    let ratio = ensure_positive("mass ratio", mu_body.km3_s2() / mu_primary.km3_s2())?;
    Ok(km(a * ratio.powf(0.4)))
}

/// Hill sphere: r = a·(μ_body/3μ_primary)^(1/3).
pub fn hill_radius(orbit_radius: Length, mu_body: GravParam, mu_primary: GravParam) -> PhysicsResult<Length> {
    let a = ensure_positive("orbit radius", orbit_radius.get::<kilometer>())?;
    let ratio = ensure_positive("mass ratio", mu_body.km3_s2() / (3.0 * mu_primary.km3_s2()))?;
    Ok(km(a * ratio.cbrt()))
}

/// Sphere of influence of a planet at its mean distance from the Sun.
pub fn planet_soi_radius(planet: Planet) -> PhysicsResult<Length> {
    soi_radius(planet.mean_distance(), planet.mu(), mu::SUN)
}

/// Outcome of one hyperbolic pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlybyResult {
    /// Angle between incoming and outgoing v∞
    pub turn_angle: Angle,
    /// Speed at periapsis after any burn
    pub periapsis_speed: Velocity,
    /// Outgoing hyperbolic excess velocity, planet frame
    pub v_inf_out: VelocityVector,
    /// Eccentricity of the outgoing hyperbola
    pub eccentricity: f64,
}

impl FlybyResult {
    /// Change in |v∞| across the pass; zero without a burn.
    pub fn excess_speed_gain(&self, v_inf_in: VelocityVector) -> Velocity {
        self.v_inf_out.magnitude() - v_inf_in.magnitude()
    }
}

/// Hyperbola eccentricity for excess speed `v_inf` and periapsis `r_p`.
fn hyperbolic_eccentricity(mu: GravParam, v_inf: f64, r_p: f64) -> f64 {
    1.0 + r_p * v_inf * v_inf / mu.km3_s2()
}

/// Turn direction: `plane_normal` with its component along `v_inf_in` removed.
fn turn_axis(v_inf_in: VelocityVector, plane_normal: Direction) -> PhysicsResult<Direction> {
    let along = v_inf_in.normalize()?;
    let n = plane_normal.raw();
    let perpendicular = Direction::from_raw(n - along.raw() * n.dot(along.raw()));
    perpendicular.normalize().map_err(|_| PhysicsError::DegenerateVector {
        context: "flyby plane normal is parallel to the incoming velocity",
    })
}

/// Ballistic flyby: |v∞| is conserved and the turn is δ = 2·asin(1/e).
///
/// The trajectory plane is the one containing `v_inf_in` and perpendicular to
/// `plane_normal`; the turn follows the right-hand rule about the normal.
pub fn unpowered_flyby(
    mu: GravParam,
    v_inf_in: VelocityVector,
    periapsis: Length,
    plane_normal: Direction,
) -> PhysicsResult<FlybyResult> {
    powered_flyby(mu, v_inf_in, periapsis, km_per_s(0.0), plane_normal)
}

/// Flyby with a tangential burn `burn_dv` at periapsis (negative = retrograde).
///
/// The incoming and outgoing legs are separate hyperbolas that share the
/// periapsis, so the turn is asin(1/e_in) + asin(1/e_out). A burn that leaves
/// the craft bound to the planet is rejected.
pub fn powered_flyby(
    mu: GravParam,
    v_inf_in: VelocityVector,
    periapsis: Length,
    burn_dv: Velocity,
    plane_normal: Direction,
) -> PhysicsResult<FlybyResult> {
    let r_p = ensure_positive("periapsis radius", periapsis.get::<kilometer>())?;
    let dv = ensure_finite("burn delta-v", burn_dv.get::<kilometer_per_second>())?;
    let axis = turn_axis(v_inf_in, plane_normal)?;

    let v_inf = v_inf_in.norm();
    let escape_sq = 2.0 * mu.km3_s2() / r_p;
    let v_p_out = (v_inf * v_inf + escape_sq).sqrt() + dv;
    let v_inf_out_sq = v_p_out * v_p_out - escape_sq;
    if v_p_out <= 0.0 || v_inf_out_sq <= 0.0 {
        return Err(PhysicsError::invalid(
            "burn delta-v",
            format!("{dv} km/s at periapsis leaves the craft captured"),
        ));
    }
    let v_inf_out = v_inf_out_sq.sqrt();

    let e_in = hyperbolic_eccentricity(mu, v_inf, r_p);
    let e_out = hyperbolic_eccentricity(mu, v_inf_out, r_p);
    let turn = (1.0 / e_in).asin() + (1.0 / e_out).asin();
    let out_direction = v_inf_in.scale(v_inf_out / v_inf).rotate_about_unit(axis, turn);

    Ok(FlybyResult {
        turn_angle: radians(turn),
        periapsis_speed: km_per_s(v_p_out),
        v_inf_out: out_direction,
        eccentricity: e_out,
    })
}

/// Heliocentric velocity after the flyby: planet velocity plus outgoing v∞.
pub fn heliocentric_exit_velocity(planet_velocity: VelocityVector, flyby: &FlybyResult) -> VelocityVector {
    planet_velocity + flyby.v_inf_out
}

/// Largest turn a ballistic pass can give at the closest allowed periapsis.
pub fn max_turn_angle(mu: GravParam, v_inf: Velocity, min_periapsis: Length) -> PhysicsResult<Angle> {
    let v = ensure_positive("excess speed", v_inf.get::<kilometer_per_second>())?;
    let r_p = ensure_positive("periapsis radius", min_periapsis.get::<kilometer>())?;
    Ok(radians(2.0 * (1.0 / hyperbolic_eccentricity(mu, v, r_p)).asin()))
}
