//! Light-time delays between ships and planets.
//!
//! Delays are straight-line distance over c, with planet positions from the
//! mean-element ephemeris. Refraction, Shapiro delay and relay geometry are
//! ignored; at the distances involved they change nothing a reader could
//! notice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ephemeris::{Planet, planet_position};
use crate::error::{PhysicsError, PhysicsResult, ensure_positive};
use crate::state::StateVector;
use crate::time::Epoch;
use crate::types::C_KM_S;
use crate::units::{Length, Time, kilometer, km, second, seconds};

/// One-way light time over `distance`.
pub fn light_time(distance: Length) -> Time {
    seconds(distance.get::<kilometer>() / C_KM_S)
}

/// Out-and-back light time over `distance`.
pub fn round_trip_light_time(distance: Length) -> Time {
    light_time(distance) * 2.0
}

/// One-way delay between two planets at `epoch`.
pub fn planet_light_delay(a: Planet, b: Planet, epoch: Epoch) -> PhysicsResult<Time> {
    let distance = planet_position(a, epoch)?.distance_to(&planet_position(b, epoch)?)?;
    Ok(light_time(distance))
}

/// One-way delay from a ship to a planet at the ship's epoch.
///
/// Planet-centred states are moved to the heliocentric frame first.
pub fn ship_light_delay(ship: &StateVector, planet: Planet) -> PhysicsResult<Time> {
    let ship = ship.to_heliocentric()?;
    let body = planet_position(planet, ship.epoch)?;
    Ok(light_time(ship.distance_to(&body)?))
}

/// Closest and farthest separation of two planets on circular orbits at
/// their mean distances.
pub fn planet_distance_range(a: Planet, b: Planet) -> (Length, Length) {
    let (ra, rb) = (a.mean_distance().get::<kilometer>(), b.mean_distance().get::<kilometer>());
    (km((ra - rb).abs()), km(ra + rb))
}

/// Shortest and longest one-way delay between two planets.
pub fn planet_light_delay_range(a: Planet, b: Planet) -> (Time, Time) {
    let (near, far) = planet_distance_range(a, b);
    (light_time(near), light_time(far))
}

/// Free-space path loss in dB at `frequency_hz`.
pub fn free_space_path_loss_db(distance: Length, frequency_hz: f64) -> PhysicsResult<f64> {
    let d_m = ensure_positive("distance", distance.get::<kilometer>())? * 1000.0;
    let f = ensure_positive("frequency", frequency_hz)?;
    let c_m_s = C_KM_S * 1000.0;
    Ok(20.0 * d_m.log10() + 20.0 * f.log10() + 20.0 * (4.0 * std::f64::consts::PI / c_m_s).log10())
}

/// What kind of conversation a one-way delay allows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommFeasibility {
    /// Under 3 s
    RealTime,
    /// 3 s to 30 s
    NearRealTime,
    /// 30 s to 30 min; store-and-forward
    Delayed,
    /// Over 30 min
    DeepSpace,
}

impl CommFeasibility {
    pub fn classify(one_way: Time) -> Self {
        let s = one_way.get::<second>();
        if s < 3.0 {
            Self::RealTime
        } else if s < 30.0 {
            Self::NearRealTime
        } else if s < 1800.0 {
            Self::Delayed
        } else {
            Self::DeepSpace
        }
    }
}

impl fmt::Display for CommFeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RealTime => "real-time",
            Self::NearRealTime => "near-real-time",
            Self::Delayed => "delayed",
            Self::DeepSpace => "deep-space",
        })
    }
}

/// Delay to a planet at one point of a trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommTimelineEntry {
    pub epoch: Epoch,
    pub elapsed_s: f64,
    pub delay_s: f64,
    pub feasibility: CommFeasibility,
}

/// Light delay to `planet` at each trajectory sample.
pub fn comm_timeline(samples: &[StateVector], planet: Planet) -> PhysicsResult<Vec<CommTimelineEntry>> {
    let first = samples
        .first()
        .ok_or_else(|| PhysicsError::invalid("samples", "trajectory is empty"))?;
    samples
        .iter()
        .map(|state| {
            let delay = ship_light_delay(state, planet)?;
            Ok(CommTimelineEntry {
                epoch: state.epoch,
                elapsed_s: state.epoch.since(first.epoch).get::<second>(),
                delay_s: delay.get::<second>(),
                feasibility: CommFeasibility::classify(delay),
            })
        })
        .collect()
}
