//! Frame-tagged state vectors.

use std::fmt;

use serde::{Deserialize, Serialize};
use uom::si::available_energy::joule_per_kilogram;
use uom::si::f64::AvailableEnergy;

use crate::ephemeris::{self, Planet};
use crate::error::{PhysicsError, PhysicsResult};
use crate::time::Epoch;
use crate::units::{GravParam, Length, Velocity, km};
use crate::vector::{AngularMomentum, Position, VelocityVector, angular_momentum};

/// Reference frame a state vector is expressed in.
///
/// All frames share the J2000 ecliptic axes; they differ only in origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Origin at the Sun
    Heliocentric,
    /// Origin at the given planet
    BodyCentric(Planet),
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Heliocentric => write!(f, "heliocentric"),
            Frame::BodyCentric(planet) => write!(f, "{}-centric", planet.name()),
        }
    }
}

/// Position (km) and velocity (km/s) at an epoch, in an explicit frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Position,
    pub velocity: VelocityVector,
    pub epoch: Epoch,
    pub frame: Frame,
}

impl StateVector {
    pub fn new(position: Position, velocity: VelocityVector, epoch: Epoch, frame: Frame) -> Self {
        Self {
            position,
            velocity,
            epoch,
            frame,
        }
    }

    /// Distance from the frame origin.
    pub fn radius(&self) -> Length {
        self.position.magnitude()
    }

    pub fn speed(&self) -> Velocity {
        self.velocity.magnitude()
    }

    /// Specific orbital energy v²/2 − μ/r.
    pub fn specific_energy(&self, mu: GravParam) -> AvailableEnergy {
        // km²/s² → J/kg
        AvailableEnergy::new::<joule_per_kilogram>(specific_energy_raw(self, mu) * 1e6)
    }

    /// Specific angular momentum h = r × v.
    pub fn angular_momentum(&self) -> AngularMomentum {
        angular_momentum(self.position, self.velocity)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.epoch.j2000_seconds().is_finite()
    }

    fn require_same_frame(&self, other: &StateVector) -> PhysicsResult<()> {
        if self.frame == other.frame {
            Ok(())
        } else {
            Err(PhysicsError::FrameMismatch {
                left: self.frame,
                right: other.frame,
            })
        }
    }

    /// Position and velocity of `self` relative to `other`.
    ///
    /// Both states must share a frame; convert with [`StateVector::to_heliocentric`] first.
    pub fn relative_to(&self, other: &StateVector) -> PhysicsResult<(Position, VelocityVector)> {
        self.require_same_frame(other)?;
        Ok((self.position - other.position, self.velocity - other.velocity))
    }

    /// Straight-line distance between two states in the same frame.
    pub fn distance_to(&self, other: &StateVector) -> PhysicsResult<Length> {
        let (dr, _) = self.relative_to(other)?;
        Ok(km(dr.norm()))
    }

    /// Re-express this state with the Sun at the origin.
    ///
    /// Body-centric states are shifted by the planet's ephemeris state at the
    /// same epoch, so the result inherits the ephemeris accuracy.
    pub fn to_heliocentric(&self) -> PhysicsResult<StateVector> {
        match self.frame {
            Frame::Heliocentric => Ok(*self),
            Frame::BodyCentric(planet) => {
                let body = ephemeris::planet_position(planet, self.epoch)?;
                Ok(StateVector {
                    position: self.position + body.position,
                    velocity: self.velocity + body.velocity,
                    epoch: self.epoch,
                    frame: Frame::Heliocentric,
                })
            }
        }
    }
}

/// v²/2 − μ/r in km²/s².
#[inline]
pub(crate) fn specific_energy_raw(state: &StateVector, mu: GravParam) -> f64 {
    let v = state.velocity.norm();
    0.5 * v * v - mu.km3_s2() / state.position.norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mu;
    use approx::assert_relative_eq;

    fn leo() -> StateVector {
        let r = 6578.0;
        let v = (mu::EARTH.km3_s2() / r).sqrt();
        StateVector::new(
            Position::new(r, 0.0, 0.0),
            VelocityVector::new(0.0, v, 0.0),
            Epoch::J2000,
            Frame::BodyCentric(Planet::Earth),
        )
    }

    #[test]
    fn test_mismatched_frames_are_rejected() {
        let a = leo();
        let mut b = leo();
        b.frame = Frame::Heliocentric;
        assert!(matches!(
            a.relative_to(&b),
            Err(PhysicsError::FrameMismatch {
                left: Frame::BodyCentric(Planet::Earth),
                right: Frame::Heliocentric
            })
        ));
        assert!(a.distance_to(&b).is_err());
    }

    #[test]
    fn test_same_frame_distance() {
        let a = leo();
        let mut b = leo();
        b.position = Position::new(6578.0, 100.0, 0.0);
        let d = a.distance_to(&b).unwrap();
        assert_relative_eq!(d.get::<crate::units::kilometer>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_circular_energy() {
        let s = leo();
        let e = specific_energy_raw(&s, mu::EARTH);
        assert_relative_eq!(e, -mu::EARTH.km3_s2() / (2.0 * 6578.0), epsilon = 1e-9);
        let typed = s.specific_energy(mu::EARTH).get::<joule_per_kilogram>();
        assert_relative_eq!(typed, e * 1e6, max_relative = 1e-12);
    }

    #[test]
    fn test_to_heliocentric_adds_planet_state() {
        let s = leo();
        let helio = s.to_heliocentric().unwrap();
        assert_eq!(helio.frame, Frame::Heliocentric);
        let earth = ephemeris::planet_position(Planet::Earth, Epoch::J2000).unwrap();
        let offset = helio.position - earth.position;
        assert_relative_eq!(offset.x(), 6578.0, epsilon = 1e-6);
        // Already heliocentric states pass through unchanged
        assert_eq!(helio.to_heliocentric().unwrap(), helio);
    }

    #[test]
    fn test_frame_display() {
        assert_eq!(Frame::Heliocentric.to_string(), "heliocentric");
        assert_eq!(Frame::BodyCentric(Planet::Jupiter).to_string(), "Jupiter-centric");
    }
}
