//! Typed physical quantities.
//!
//! Scalars crossing a public boundary are `uom` quantities so that a length
//! can never be passed where a time is expected. Internally the integrators
//! and solvers work on plain `f64` in km, s and rad; conversion happens once
//! at the edge through the helpers below.

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

pub use uom::si::f64::{Acceleration, Angle, Force, Length, Mass, Time, Velocity};
pub use uom::si::acceleration::meter_per_second_squared;
pub use uom::si::angle::{degree, radian};
pub use uom::si::force::newton;
pub use uom::si::length::kilometer;
pub use uom::si::mass::kilogram;
pub use uom::si::time::{day, second};
pub use uom::si::velocity::kilometer_per_second;

/// Length in kilometres.
#[inline]
#[must_use]
pub fn km(value: f64) -> Length {
    Length::new::<kilometer>(value)
}

/// Speed in km/s.
#[inline]
#[must_use]
pub fn km_per_s(value: f64) -> Velocity {
    Velocity::new::<kilometer_per_second>(value)
}

/// Acceleration in km/s².
#[inline]
#[must_use]
pub fn km_per_s2(value: f64) -> Acceleration {
    Acceleration::new::<meter_per_second_squared>(value * 1000.0)
}

/// Acceleration in m/s².
#[inline]
#[must_use]
pub fn m_per_s2(value: f64) -> Acceleration {
    Acceleration::new::<meter_per_second_squared>(value)
}

/// Duration in seconds.
#[inline]
#[must_use]
pub fn seconds(value: f64) -> Time {
    Time::new::<second>(value)
}

/// Angle in radians.
#[inline]
#[must_use]
pub fn radians(value: f64) -> Angle {
    Angle::new::<radian>(value)
}

/// Angle in degrees.
#[inline]
#[must_use]
pub fn degrees(value: f64) -> Angle {
    Angle::new::<degree>(value)
}

/// Mass in kilograms.
#[inline]
#[must_use]
pub fn kilograms(value: f64) -> Mass {
    Mass::new::<kilogram>(value)
}

/// Force in newtons.
#[inline]
#[must_use]
pub fn newtons(value: f64) -> Force {
    Force::new::<newton>(value)
}

/// Acceleration expressed in km/s², the working unit of the propagators.
#[inline]
pub fn acceleration_km_s2(value: Acceleration) -> f64 {
    value.get::<meter_per_second_squared>() / 1000.0
}

/// Wrap a raw angle in radians into (−π, π].
#[inline]
pub fn normalize_radians(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Wrap an angle into (−π, π].
#[must_use]
pub fn normalize_angle(angle: Angle) -> Angle {
    radians(normalize_radians(angle.get::<radian>()))
}

/// Wrap an angle into [0, 2π).
#[must_use]
pub fn normalize_angle_positive(angle: Angle) -> Angle {
    let wrapped = angle.get::<radian>().rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    radians(if wrapped >= TAU { 0.0 } else { wrapped })
}

/// Gravitational parameter μ = GM in km³/s².
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GravParam(f64);

impl GravParam {
    /// Construct from a trusted constant.
    pub const fn from_km3_s2(value: f64) -> Self {
        Self(value)
    }

    /// Construct from user input, rejecting non-positive or non-finite values.
    pub fn new(value: f64) -> PhysicsResult<Self> {
        crate::error::ensure_positive("gravitational parameter", value).map(Self)
    }

    /// Value in km³/s².
    #[inline]
    pub const fn km3_s2(self) -> f64 {
        self.0
    }
}

/// Conic section selected by an eccentricity value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conic {
    /// e == 0
    Circular,
    /// 0 < e < 1
    Elliptic,
    /// |e − 1| below [`crate::kepler::NEAR_PARABOLIC_THRESHOLD`]
    NearParabolic,
    /// e > 1
    Hyperbolic,
}

/// Orbital eccentricity, validated non-negative and finite.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Eccentricity(f64);

impl Eccentricity {
    /// Validate an eccentricity value.
    pub fn new(value: f64) -> PhysicsResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(PhysicsError::invalid(
                "eccentricity",
                format!("must be finite and non-negative, got {value}"),
            ));
        }
        Ok(Self(value))
    }

    /// Zero eccentricity.
    pub const CIRCULAR: Eccentricity = Eccentricity(0.0);

    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Classify which branch of the Kepler machinery applies.
    pub fn conic(self) -> Conic {
        let e = self.0;
        if (e - 1.0).abs() < crate::kepler::NEAR_PARABOLIC_THRESHOLD {
            Conic::NearParabolic
        } else if e == 0.0 {
            Conic::Circular
        } else if e < 1.0 {
            Conic::Elliptic
        } else {
            Conic::Hyperbolic
        }
    }
}

impl TryFrom<f64> for Eccentricity {
    type Error = PhysicsError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Eccentricity> for f64 {
    fn from(e: Eccentricity) -> Self {
        e.0
    }
}

impl fmt::Display for Eccentricity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e={}", self.0)
    }
}

/// Serde adapter for a [`Velocity`] stored as plain km/s.
///
/// `uom` would otherwise write m/s, its base unit.
pub mod km_s {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Velocity, kilometer_per_second, km_per_s};

    pub fn serialize<S: Serializer>(value: &Velocity, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.get::<kilometer_per_second>())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Velocity, D::Error> {
        Ok(km_per_s(f64::deserialize(deserializer)?))
    }
}
