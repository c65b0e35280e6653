//! Thrust profiles and propellant mass decay.
//!
//! Every profile fires along the instantaneous velocity direction:
//! - Coast: no thrust
//! - Constant prograde: fixed acceleration along +v
//! - Brachistochrone: +v until the flip time, −v afterwards
//!
//! The profile magnitude is the acceleration at the initial mass. With a
//! [`MassModel`] the engine delivers a constant force, so the acceleration
//! grows as propellant burns off and stops at dry mass.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult, ensure_finite};
use crate::units::{
    Acceleration, Length, Mass, Time, Velocity, acceleration_km_s2, kilogram, kilometer, kilometer_per_second,
    meter_per_second_squared, second, seconds,
};
use crate::vector::{AccelerationVector, VelocityVector};

/// Below this speed (km/s) the thrust direction is undefined and thrust is zero.
const MIN_THRUST_SPEED: f64 = 1e-15;

/// Acceleration profile of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThrustProfile {
    Coast,
    ConstantPrograde {
        acceleration: Acceleration,
    },
    /// Accelerate prograde, then flip and decelerate
    Brachistochrone {
        acceleration: Acceleration,
        /// Elapsed time of the flip
        flip_time: Time,
    },
}

impl ThrustProfile {
    /// Symmetric brachistochrone covering `distance` from rest: flip at √(d/a).
    pub fn brachistochrone(distance: Length, acceleration: Acceleration) -> PhysicsResult<Self> {
        let d = crate::error::ensure_positive("distance", distance.get::<kilometer>())?;
        let a = crate::error::ensure_positive("acceleration", acceleration_km_s2(acceleration))?;
        Ok(ThrustProfile::Brachistochrone {
            acceleration,
            flip_time: seconds((d / a).sqrt()),
        })
    }

    /// True when the engine never fires.
    pub fn is_coast(&self) -> bool {
        match self {
            ThrustProfile::Coast => true,
            ThrustProfile::ConstantPrograde { acceleration } | ThrustProfile::Brachistochrone { acceleration, .. } => {
                acceleration.get::<meter_per_second_squared>() == 0.0
            }
        }
    }

    /// Acceleration magnitude at the initial mass, in km/s².
    pub(crate) fn magnitude_km_s2(&self) -> f64 {
        match self {
            ThrustProfile::Coast => 0.0,
            ThrustProfile::ConstantPrograde { acceleration } | ThrustProfile::Brachistochrone { acceleration, .. } => {
                acceleration_km_s2(*acceleration)
            }
        }
    }

    /// Elapsed time where the thrust direction jumps, if any.
    pub(crate) fn flip_time_s(&self) -> Option<f64> {
        match self {
            ThrustProfile::Brachistochrone { flip_time, .. } => Some(flip_time.get::<second>()),
            _ => None,
        }
    }

    pub(crate) fn validate(&self) -> PhysicsResult<()> {
        let a = ensure_finite("thrust acceleration", self.magnitude_km_s2())?;
        if a < 0.0 {
            return Err(PhysicsError::invalid("thrust acceleration", format!("must be non-negative, got {a} km/s²")));
        }
        if let Some(flip) = self.flip_time_s() {
            let flip = ensure_finite("flip time", flip)?;
            if flip < 0.0 {
                return Err(PhysicsError::invalid("flip time", format!("must be non-negative, got {flip} s")));
            }
        }
        Ok(())
    }

    /// Thrust acceleration at initial mass for a given elapsed time and velocity.
    pub fn acceleration(&self, elapsed: Time, velocity: VelocityVector) -> AccelerationVector {
        AccelerationVector::from_raw(self.acceleration_raw(elapsed.get::<second>(), velocity.raw()))
    }

    /// Raw thrust vector in km/s² at initial mass.
    #[inline]
    pub(crate) fn acceleration_raw(&self, t: f64, v: DVec3) -> DVec3 {
        let sign = match self {
            ThrustProfile::Coast => return DVec3::ZERO,
            ThrustProfile::ConstantPrograde { .. } => 1.0,
            ThrustProfile::Brachistochrone { flip_time, .. } => {
                if t < flip_time.get::<second>() {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        let speed = v.length();
        if speed <= MIN_THRUST_SPEED {
            return DVec3::ZERO;
        }
        v * (sign * self.magnitude_km_s2() / speed)
    }
}

/// Propellant budget for a constant-force engine.
///
/// Mass flow ṁ = F/vₑ with F = a₀·m₀, so m(t) = m₀ − ṁ·t until the dry
/// mass is reached (flameout). The thrust acceleration is a₀·m₀/m(t).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassModel {
    pub initial_mass: Mass,
    pub dry_mass: Mass,
    pub exhaust_velocity: Velocity,
}

impl MassModel {
    pub fn new(initial_mass: Mass, dry_mass: Mass, exhaust_velocity: Velocity) -> PhysicsResult<Self> {
        let model = Self {
            initial_mass,
            dry_mass,
            exhaust_velocity,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn validate(&self) -> PhysicsResult<()> {
        let m0 = crate::error::ensure_positive("initial mass", self.initial_mass.get::<kilogram>())?;
        let dry = crate::error::ensure_positive("dry mass", self.dry_mass.get::<kilogram>())?;
        crate::error::ensure_positive("exhaust velocity", self.exhaust_velocity.get::<kilometer_per_second>())?;
        if dry > m0 {
            return Err(PhysicsError::invalid(
                "dry mass",
                format!("{dry} kg exceeds initial mass {m0} kg"),
            ));
        }
        Ok(())
    }

    /// Propellant mass flow in kg/s for a profile magnitude a₀ (km/s²).
    fn mass_flow(&self, a0_km_s2: f64) -> f64 {
        a0_km_s2 * self.initial_mass.get::<kilogram>() / self.exhaust_velocity.get::<kilometer_per_second>()
    }

    /// Elapsed time at which the propellant runs out, in seconds.
    pub(crate) fn flameout_s(&self, a0_km_s2: f64) -> Option<f64> {
        let flow = self.mass_flow(a0_km_s2);
        (flow > 0.0).then(|| (self.initial_mass - self.dry_mass).get::<kilogram>() / flow)
    }

    /// Mass in kg after `t` seconds of firing.
    pub(crate) fn mass_kg(&self, a0_km_s2: f64, t: f64) -> f64 {
        let m = self.initial_mass.get::<kilogram>() - self.mass_flow(a0_km_s2) * t.max(0.0);
        m.max(self.dry_mass.get::<kilogram>())
    }

    /// Mass after firing for `elapsed` at profile magnitude `acceleration`.
    pub fn mass_at(&self, acceleration: Acceleration, elapsed: Time) -> Mass {
        Mass::new::<kilogram>(self.mass_kg(acceleration_km_s2(acceleration), elapsed.get::<second>()))
    }

    /// Ideal Δv of the full propellant load: vₑ·ln(m₀/m_dry).
    pub fn delta_v_capacity(&self) -> Velocity {
        let ratio = (self.initial_mass / self.dry_mass).value;
        self.exhaust_velocity * ratio.ln()
    }
}
