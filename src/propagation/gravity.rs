//! Gravitational acceleration for the propagators.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::units::GravParam;
use crate::vector::{AccelerationVector, Position};

/// Gravity field the trajectory moves in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gravity {
    /// Point mass at the frame origin
    Central(GravParam),
    /// No gravity; straight-line thrust checks
    FieldFree,
}

impl Gravity {
    /// Gravitational parameter, zero when field-free.
    pub fn mu(&self) -> GravParam {
        match self {
            Gravity::Central(mu) => *mu,
            Gravity::FieldFree => GravParam::from_km3_s2(0.0),
        }
    }

    /// Acceleration at a position.
    ///
    /// At the origin of a central field the result is non-finite; the
    /// integrators report that as a numerical failure.
    pub fn acceleration(&self, position: Position) -> AccelerationVector {
        AccelerationVector::from_raw(self.acceleration_raw(position.raw()))
    }

    /// a = −μ·r/|r|³ in km/s².
    #[inline]
    pub(crate) fn acceleration_raw(&self, r: DVec3) -> DVec3 {
        match self {
            Gravity::Central(mu) => {
                let r_sq = r.length_squared();
                r * (-mu.km3_s2() / (r_sq * r_sq.sqrt()))
            }
            Gravity::FieldFree => DVec3::ZERO,
        }
    }
}
