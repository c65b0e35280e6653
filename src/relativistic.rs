//! Special-relativistic corrections at fast-transfer speeds.
//!
//! Brachistochrone transfers between planets peak at a few percent of light
//! speed. The functions here quantify how far the Newtonian numbers are off:
//! - Lorentz factor and time dilation
//! - relativistic velocity addition and stellar aberration
//! - the Ackeret rocket equation against Tsiolkovsky
//! - coordinate and proper time of a constant-proper-acceleration transfer
//!
//! Every function refuses speeds at or above c instead of returning NaN.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult, ensure_finite, ensure_positive};
use crate::types::C_KM_S;
use crate::units::{
    Acceleration, Angle, Length, Time, Velocity, acceleration_km_s2, kilometer, kilometer_per_second, km_per_s,
    normalize_radians, radian, radians, second, seconds,
};

/// Corrections above this fraction are material by default (100 ppm).
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 1e-4;

fn speed_km_s(v: Velocity) -> PhysicsResult<f64> {
    let s = ensure_finite("speed", v.get::<kilometer_per_second>())?;
    if s.abs() >= C_KM_S {
        return Err(PhysicsError::SuperluminalInput { speed_km_s: s });
    }
    Ok(s)
}

/// β = v/c.
pub fn beta(v: Velocity) -> f64 {
    v.get::<kilometer_per_second>() / C_KM_S
}

/// γ = 1/√(1 − β²); exactly 1 at rest.
pub fn lorentz_factor(v: Velocity) -> PhysicsResult<f64> {
    let b = speed_km_s(v)? / C_KM_S;
    Ok(1.0 / (1.0 - b * b).sqrt())
}

/// dτ/dt = 1/γ = √(1 − β²).
pub fn proper_time_ratio(v: Velocity) -> PhysicsResult<f64> {
    let b = speed_km_s(v)? / C_KM_S;
    Ok((1.0 - b * b).sqrt())
}

/// γ − 1 without cancellation at low speed.
fn gamma_minus_one(b: f64) -> f64 {
    let gamma = 1.0 / (1.0 - b * b).sqrt();
    b * b * gamma * gamma / (gamma + 1.0)
}

/// How much less time passes aboard at constant speed: t·(1 − 1/γ).
pub fn time_dilation_loss(coordinate_time: Time, v: Velocity) -> PhysicsResult<Time> {
    let b = speed_km_s(v)? / C_KM_S;
    // 1 − √(1 − β²) = β² / (1 + √(1 − β²))
    let fraction = b * b / (1.0 + (1.0 - b * b).sqrt());
    Ok(coordinate_time * fraction)
}

/// Relativistic composition of collinear velocities: (u + v)/(1 + uv/c²).
pub fn velocity_addition(u: Velocity, v: Velocity) -> PhysicsResult<Velocity> {
    let u = speed_km_s(u)?;
    let v = speed_km_s(v)?;
    Ok(km_per_s((u + v) / (1.0 + u * v / (C_KM_S * C_KM_S))))
}

/// Shift of a star's apparent direction for an observer moving at `v`.
///
/// `theta` is the true angle between the star and the direction of motion.
/// The result is apparent minus true angle in (−π, π]; it is negative
/// because the star appears displaced toward the direction of motion.
pub fn aberration_angle(v: Velocity, theta: Angle) -> PhysicsResult<Angle> {
    let b = speed_km_s(v)? / C_KM_S;
    let theta = ensure_finite("star angle", theta.get::<radian>())?;
    let gamma = 1.0 / (1.0 - b * b).sqrt();
    let apparent = theta.sin().atan2(gamma * (theta.cos() + b));
    Ok(radians(normalize_radians(apparent - theta)))
}

/// Ratio of relativistic to classical kinetic energy, (γ − 1)c² / (v²/2).
pub fn kinetic_energy_correction_factor(v: Velocity) -> PhysicsResult<f64> {
    let b = speed_km_s(v)? / C_KM_S;
    let gamma = 1.0 / (1.0 - b * b).sqrt();
    Ok(2.0 * gamma * gamma / (gamma + 1.0))
}

fn mass_ratio_log(mass_ratio: f64) -> PhysicsResult<f64> {
    let r = ensure_positive("mass ratio", mass_ratio)?;
    if r < 1.0 {
        return Err(PhysicsError::invalid("mass ratio", format!("must be >= 1, got {r}")));
    }
    Ok(r.ln())
}

/// Tsiolkovsky Δv = vₑ·ln(m₀/m_f).
pub fn classical_delta_v(exhaust_velocity: Velocity, mass_ratio: f64) -> PhysicsResult<Velocity> {
    let ve = ensure_positive("exhaust velocity", exhaust_velocity.get::<kilometer_per_second>())?;
    Ok(km_per_s(ve * mass_ratio_log(mass_ratio)?))
}

/// Ackeret's relativistic rocket: Δv = c·tanh(vₑ/c·ln(m₀/m_f)).
pub fn relativistic_delta_v(exhaust_velocity: Velocity, mass_ratio: f64) -> PhysicsResult<Velocity> {
    let ve = speed_km_s(exhaust_velocity)?;
    ensure_positive("exhaust velocity", ve)?;
    let x = ve / C_KM_S * mass_ratio_log(mass_ratio)?;
    Ok(km_per_s(C_KM_S * x.tanh()))
}

/// (classical − relativistic)/classical; how much Tsiolkovsky overstates Δv.
pub fn delta_v_correction_fraction(exhaust_velocity: Velocity, mass_ratio: f64) -> PhysicsResult<f64> {
    let classical = classical_delta_v(exhaust_velocity, mass_ratio)?.get::<kilometer_per_second>();
    let relativistic = relativistic_delta_v(exhaust_velocity, mass_ratio)?.get::<kilometer_per_second>();
    if classical == 0.0 {
        return Ok(0.0);
    }
    Ok((classical - relativistic) / classical)
}

/// Coordinate and proper durations of a flip-at-midpoint transfer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrachistochroneTimes {
    /// As measured by an observer at rest in the frame
    pub coordinate: Time,
    /// As measured aboard
    pub proper: Time,
}

/// Coordinate time of the accelerating half, in seconds.
///
/// d/2 = (c²/a)(√(1 + (at/c)²) − 1), solved for t.
fn half_coordinate_time(d: f64, a: f64) -> f64 {
    let eps = 0.5 * d * a / (C_KM_S * C_KM_S);
    (C_KM_S / a) * (eps * (2.0 + eps)).sqrt()
}

/// Durations of a constant-proper-acceleration brachistochrone from rest to rest.
pub fn brachistochrone_times(distance: Length, acceleration: Acceleration) -> PhysicsResult<BrachistochroneTimes> {
    let d = ensure_positive("distance", distance.get::<kilometer>())?;
    let a = ensure_positive("acceleration", acceleration_km_s2(acceleration))?;
    let t_half = half_coordinate_time(d, a);
    let tau_half = (C_KM_S / a) * (a * t_half / C_KM_S).asinh();
    Ok(BrachistochroneTimes {
        coordinate: seconds(2.0 * t_half),
        proper: seconds(2.0 * tau_half),
    })
}

/// Speed at the flip point of a relativistic brachistochrone.
pub fn brachistochrone_peak_velocity(distance: Length, acceleration: Acceleration) -> PhysicsResult<Velocity> {
    let d = ensure_positive("distance", distance.get::<kilometer>())?;
    let a = ensure_positive("acceleration", acceleration_km_s2(acceleration))?;
    let at_c = a * half_coordinate_time(d, a) / C_KM_S;
    Ok(km_per_s(C_KM_S * at_c / (1.0 + at_c * at_c).sqrt()))
}

/// How much a relativistic correction matters against a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// More than an order of magnitude below the threshold
    Negligible,
    /// Within one order of magnitude below the threshold
    Marginal,
    /// At or above the threshold
    Material,
}

impl Significance {
    pub fn classify(magnitude: f64, threshold: f64) -> Self {
        let m = magnitude.abs();
        if m >= threshold {
            Significance::Material
        } else if m >= threshold / 10.0 {
            Significance::Marginal
        } else {
            Significance::Negligible
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Significance::Negligible => "negligible",
            Significance::Marginal => "marginal",
            Significance::Material => "material",
        })
    }
}

/// Relativistic effects at one speed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativisticCorrection {
    pub speed: Velocity,
    pub beta: f64,
    pub lorentz_factor: f64,
    pub proper_time_ratio: f64,
    /// Present when a star angle was supplied
    pub aberration: Option<Angle>,
    /// γ − 1
    pub correction_magnitude: f64,
    pub significance: Significance,
}

impl RelativisticCorrection {
    /// Evaluate at the default 100 ppm threshold, without aberration.
    pub fn at(speed: Velocity) -> PhysicsResult<Self> {
        Self::evaluate(speed, None, DEFAULT_SIGNIFICANCE_THRESHOLD)
    }

    pub fn evaluate(speed: Velocity, star_angle: Option<Angle>, threshold: f64) -> PhysicsResult<Self> {
        let threshold = ensure_positive("significance threshold", threshold)?;
        let b = speed_km_s(speed)? / C_KM_S;
        let magnitude = gamma_minus_one(b);
        Ok(Self {
            speed,
            beta: b,
            lorentz_factor: lorentz_factor(speed)?,
            proper_time_ratio: proper_time_ratio(speed)?,
            aberration: star_angle.map(|theta| aberration_angle(speed, theta)).transpose()?,
            correction_magnitude: magnitude,
            significance: Significance::classify(magnitude, threshold),
        })
    }

    /// Time lost aboard over `coordinate_time` at this speed.
    pub fn time_lost(&self, coordinate_time: Time) -> Time {
        coordinate_time * (1.0 - self.proper_time_ratio)
    }
}

/// Proper time lost in seconds over a coordinate duration, for reports.
pub fn seconds_lost(coordinate_time: Time, v: Velocity) -> PhysicsResult<f64> {
    Ok(time_dilation_loss(coordinate_time, v)?.get::<second>())
}
