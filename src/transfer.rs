//! Closed-form transfer budgets.
//!
//! Two-body impulsive transfers (vis-viva, Hohmann) and the straight-line,
//! gravity-free brachistochrone: accelerate for half the distance, flip,
//! decelerate for the rest, starting and ending at rest. These are the
//! numbers the propagators are checked against.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult, ensure_finite, ensure_positive};
use crate::types::G0_M_S2;
use crate::units::{
    Acceleration, Angle, Force, GravParam, Length, Mass, Time, Velocity, acceleration_km_s2, kilogram, kilograms,
    kilometer, kilometer_per_second, km, km_per_s, km_per_s2, newton, radian, second, seconds,
};

/// Orbital speed at radius `r` on an orbit of semi-major axis `a`: v² = μ(2/r − 1/a).
///
/// Negative `a` selects a hyperbola.
pub fn vis_viva(mu: GravParam, r: Length, a: Length) -> PhysicsResult<Velocity> {
    let r = ensure_positive("radius", r.get::<kilometer>())?;
    let a = ensure_finite("semi-major axis", a.get::<kilometer>())?;
    if a == 0.0 {
        return Err(PhysicsError::invalid("semi-major axis", "must be non-zero"));
    }
    let v2 = mu.km3_s2() * (2.0 / r - 1.0 / a);
    if v2 < 0.0 {
        return Err(PhysicsError::invalid(
            "radius",
            format!("{r} km lies beyond apoapsis of an orbit with a = {a} km"),
        ));
    }
    Ok(km_per_s(v2.sqrt()))
}

/// Circular orbital speed √(μ/r).
pub fn circular_velocity(mu: GravParam, r: Length) -> PhysicsResult<Velocity> {
    let r = ensure_positive("radius", r.get::<kilometer>())?;
    Ok(km_per_s((mu.km3_s2() / r).sqrt()))
}

/// Period of a bound orbit: T = 2π√(a³/μ).
pub fn orbital_period(mu: GravParam, a: Length) -> PhysicsResult<Time> {
    let a = ensure_positive("semi-major axis", a.get::<kilometer>())?;
    Ok(seconds(TAU * (a.powi(3) / mu.km3_s2()).sqrt()))
}

/// Specific orbital energy −μ/(2a) in km²/s².
pub fn specific_energy(mu: GravParam, a: Length) -> PhysicsResult<f64> {
    let a = ensure_finite("semi-major axis", a.get::<kilometer>())?;
    if a == 0.0 {
        return Err(PhysicsError::invalid("semi-major axis", "must be non-zero"));
    }
    Ok(-mu.km3_s2() / (2.0 * a))
}

/// Impulsive budget of a Hohmann transfer between coplanar circular orbits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HohmannTransfer {
    pub departure_dv: Velocity,
    pub arrival_dv: Velocity,
    /// Half the period of the transfer ellipse
    pub transfer_time: Time,
}

impl HohmannTransfer {
    pub fn total_dv(&self) -> Velocity {
        self.departure_dv + self.arrival_dv
    }
}

/// Δv at both ends of a Hohmann transfer from radius `r1` to `r2`.
pub fn hohmann_transfer_dv(mu: GravParam, r1: Length, r2: Length) -> PhysicsResult<HohmannTransfer> {
    let a_transfer = (r1 + r2) * 0.5;
    let dv1 = vis_viva(mu, r1, a_transfer)? - circular_velocity(mu, r1)?;
    let dv2 = circular_velocity(mu, r2)? - vis_viva(mu, r2, a_transfer)?;
    let transfer_time = seconds(PI * (a_transfer.get::<kilometer>().powi(3) / mu.km3_s2()).sqrt());
    Ok(HohmannTransfer {
        departure_dv: km_per_s(dv1.get::<kilometer_per_second>().abs()),
        arrival_dv: km_per_s(dv2.get::<kilometer_per_second>().abs()),
        transfer_time,
    })
}

/// Single-impulse plane change: Δv = 2v·sin(Δi/2).
pub fn plane_change_dv(speed: Velocity, angle: Angle) -> PhysicsResult<Velocity> {
    let v = ensure_finite("speed", speed.get::<kilometer_per_second>())?;
    if v < 0.0 {
        return Err(PhysicsError::invalid("speed", format!("must be non-negative, got {v} km/s")));
    }
    let di = ensure_finite("plane change angle", angle.get::<radian>())?;
    Ok(km_per_s(2.0 * v * (0.5 * di).sin().abs()))
}

// ============================================================================
// Brachistochrone
// ============================================================================

fn brachistochrone_inputs(distance: Length, time: Time) -> PhysicsResult<(f64, f64)> {
    Ok((
        ensure_positive("distance", distance.get::<kilometer>())?,
        ensure_positive("transfer time", time.get::<second>())?,
    ))
}

/// Constant acceleration needed to cover `distance` in `time`: a = 4d/t².
pub fn brachistochrone_acceleration(distance: Length, time: Time) -> PhysicsResult<Acceleration> {
    let (d, t) = brachistochrone_inputs(distance, time)?;
    Ok(km_per_s2(4.0 * d / (t * t)))
}

/// Transit time at constant acceleration `accel`: t = 2√(d/a).
pub fn brachistochrone_time(distance: Length, accel: Acceleration) -> PhysicsResult<Time> {
    let d = ensure_positive("distance", distance.get::<kilometer>())?;
    let a = ensure_positive("acceleration", acceleration_km_s2(accel))?;
    Ok(seconds(2.0 * (d / a).sqrt()))
}

/// Total velocity change of the burn: Δv = a·t = 4d/t.
pub fn brachistochrone_delta_v(distance: Length, time: Time) -> PhysicsResult<Velocity> {
    let (d, t) = brachistochrone_inputs(distance, time)?;
    Ok(km_per_s(4.0 * d / t))
}

/// Speed at the flip point: half the total Δv.
pub fn brachistochrone_peak_speed(distance: Length, accel: Acceleration) -> PhysicsResult<Velocity> {
    let t = brachistochrone_time(distance, accel)?;
    Ok(km_per_s(0.5 * acceleration_km_s2(accel) * t.get::<second>()))
}

/// Farthest reachable distance in `time` at `accel`: d = a·t²/4.
pub fn brachistochrone_max_distance(accel: Acceleration, time: Time) -> PhysicsResult<Length> {
    let a = ensure_positive("acceleration", acceleration_km_s2(accel))?;
    let t = ensure_positive("transfer time", time.get::<second>())?;
    Ok(km(a * t * t / 4.0))
}

// ============================================================================
// Rocket equation
// ============================================================================

/// a = F/m.
pub fn thrust_acceleration(thrust: Force, mass: Mass) -> PhysicsResult<Acceleration> {
    let f = ensure_positive("thrust", thrust.get::<newton>())?;
    let m = ensure_positive("mass", mass.get::<kilogram>())?;
    Ok(crate::units::m_per_s2(f / m))
}

/// Effective exhaust velocity vₑ = Isp·g₀.
pub fn exhaust_velocity_from_isp(isp: Time) -> PhysicsResult<Velocity> {
    let isp = ensure_positive("specific impulse", isp.get::<second>())?;
    Ok(km_per_s(isp * G0_M_S2 / 1000.0))
}

/// Mass ratio m₀/m_f needed for `delta_v`: exp(Δv/vₑ).
pub fn mass_ratio(delta_v: Velocity, exhaust_velocity: Velocity) -> PhysicsResult<f64> {
    let dv = ensure_finite("delta-v", delta_v.get::<kilometer_per_second>())?;
    if dv < 0.0 {
        return Err(PhysicsError::invalid("delta-v", format!("must be non-negative, got {dv} km/s")));
    }
    let ve = ensure_positive("exhaust velocity", exhaust_velocity.get::<kilometer_per_second>())?;
    Ok((dv / ve).exp())
}

/// Mass remaining after a burn of `delta_v`.
pub fn post_burn_mass(initial_mass: Mass, delta_v: Velocity, exhaust_velocity: Velocity) -> PhysicsResult<Mass> {
    let m0 = ensure_positive("initial mass", initial_mass.get::<kilogram>())?;
    Ok(kilograms(m0 / mass_ratio(delta_v, exhaust_velocity)?))
}

/// Propellant burned for `delta_v`: m₀(1 − e^(−Δv/vₑ)).
pub fn propellant_consumed(initial_mass: Mass, delta_v: Velocity, exhaust_velocity: Velocity) -> PhysicsResult<Mass> {
    Ok(initial_mass - post_burn_mass(initial_mass, delta_v, exhaust_velocity)?)
}
