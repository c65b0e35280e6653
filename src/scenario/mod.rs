//! Scenario analysis: one voyage from parameters to a citable report.
//!
//! A [`Scenario`] names a ship (mass, thrust, optional propellant budget), a
//! route (explicit distance and/or departure and arrival planets) and a start
//! epoch. [`Scenario::analyze`] runs the whole chain:
//! - closed-form brachistochrone budget
//! - numerical propagation of the same transfer
//! - relativistic corrections at the propagated peak speed
//! - arrival alignment against the ephemeris
//! - out-of-plane geometry of the route
//! - light delay to Earth along the way
//! - ship mass timeline when a dry mass is given
//! - Hohmann comparison and next launch window
//!
//! The propagated transfer is a straight-line, gravity-free burn so that it
//! can be checked against the closed form. Solar gravity over a few days of
//! high-thrust flight shifts the end point by far less than the ephemeris
//! error bound.

pub mod presets;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::comms::{self, CommFeasibility};
use crate::ephemeris::{self, Planet};
use crate::error::{PhysicsError, PhysicsResult, ensure_positive};
use crate::mass_timeline::{self, MassEvent, MassTimeline};
use crate::propagation::{
    ForceModel, Gravity, Integrator, IntegratorKind, PropagationResult, ThrustProfile, propagate,
};
use crate::relativistic::{self, DEFAULT_SIGNIFICANCE_THRESHOLD, RelativisticCorrection, Significance};
use crate::state::{Frame, StateVector};
use crate::time::Epoch;
use crate::transfer;
use crate::types::{G0_M_S2, SECONDS_PER_DAY, mu};
use crate::units::{
    Acceleration, Force, Length, Mass, Time, Velocity, degree, degrees, kilogram, kilometer, kilometer_per_second,
    meter_per_second_squared, newton, second,
};
use crate::vector::{Direction, Position, VelocityVector};

/// Initial drift speed along the route, km/s; gives the prograde thrust a direction.
const DRIFT_SPEED_KM_S: f64 = 1e-3;

/// Fixed-point passes when aiming at where the arrival planet will be.
const AIM_ITERATIONS: usize = 8;

fn default_threshold() -> f64 {
    DEFAULT_SIGNIFICANCE_THRESHOLD
}

/// One voyage to analyse.
///
/// Scalar fields carry their unit in the JSON key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "mass_kg")]
    pub mass: Mass,
    #[serde(rename = "thrust_n")]
    pub thrust: Force,
    /// Overrides the planet-to-planet distance when set
    #[serde(rename = "distance_km", default, with = "optional_km", skip_serializing_if = "Option::is_none")]
    pub distance: Option<Length>,
    /// Start of the transfer (RFC 3339)
    pub epoch: DateTime<Utc>,
    /// Stated transit time, checked against the closed form
    #[serde(rename = "duration_s", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Time>,
    #[serde(
        rename = "exhaust_velocity_km_s",
        default,
        with = "optional_km_s",
        skip_serializing_if = "Option::is_none"
    )]
    pub exhaust_velocity: Option<Velocity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<Planet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<Planet>,
    /// Structure without propellant; enables the mass timeline
    #[serde(rename = "dry_mass_kg", default, skip_serializing_if = "Option::is_none")]
    pub dry_mass: Option<Mass>,
    /// Replaces the two brachistochrone burns in the mass timeline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mass_events: Vec<MassEvent>,
    #[serde(default)]
    pub integrator: Integrator,
    #[serde(default = "default_threshold")]
    pub significance_threshold: f64,
}

impl Scenario {
    /// Read and validate a scenario file.
    pub fn load(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> PhysicsResult<Self> {
        let scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn to_json(&self) -> PhysicsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_positive("mass", self.mass.get::<kilogram>())?;
        ensure_positive("thrust", self.thrust.get::<newton>())?;
        if let Some(distance) = self.distance {
            ensure_positive("distance", distance.get::<kilometer>())?;
        }
        if let Some(duration) = self.duration {
            ensure_positive("duration", duration.get::<second>())?;
        }
        if let Some(ve) = self.exhaust_velocity {
            ensure_positive("exhaust velocity", ve.get::<kilometer_per_second>())?;
        }
        match (self.departure, self.arrival) {
            (Some(a), Some(b)) if a == b => {
                return Err(PhysicsError::invalid("arrival", format!("same planet as departure ({a})")));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(PhysicsError::invalid("route", "departure and arrival must be given together"));
            }
            (None, None) if self.distance.is_none() => {
                return Err(PhysicsError::invalid("route", "needs a distance or a departure/arrival pair"));
            }
            _ => {}
        }
        if let Some(dry) = self.dry_mass {
            let dry = ensure_positive("dry mass", dry.get::<kilogram>())?;
            if dry > self.mass.get::<kilogram>() {
                return Err(PhysicsError::invalid("dry mass", "exceeds the ship mass"));
            }
        }
        if !self.mass_events.is_empty() && self.dry_mass.is_none() {
            return Err(PhysicsError::invalid("mass events", "need a dry mass"));
        }
        ensure_positive("significance threshold", self.significance_threshold)?;
        Ok(())
    }

    /// Constant thrust acceleration at the initial mass.
    pub fn acceleration(&self) -> PhysicsResult<Acceleration> {
        transfer::thrust_acceleration(self.thrust, self.mass)
    }

    pub fn start_epoch(&self) -> Epoch {
        Epoch::from_datetime(self.epoch)
    }

    fn route(&self, accel: Acceleration) -> PhysicsResult<Route> {
        let epoch = self.start_epoch();
        let (Some(departure), Some(arrival)) = (self.departure, self.arrival) else {
            let distance = self.distance.ok_or_else(|| PhysicsError::invalid("distance", "missing"))?;
            return Ok(Route {
                start: Position::ZERO,
                direction: Direction::X,
                distance,
            });
        };

        let start = ephemeris::planet_position(departure, epoch)?.position;
        let mut target = ephemeris::planet_position(arrival, epoch)?.position;
        // Aim at the arrival planet's position at the arrival time
        for _ in 0..AIM_ITERATIONS {
            let transit = transfer::brachistochrone_time((target - start).magnitude(), accel)?;
            target = ephemeris::planet_position(arrival, epoch + transit)?.position;
        }
        Ok(Route {
            start,
            direction: (target - start).normalize()?,
            distance: self.distance.unwrap_or((target - start).magnitude()),
        })
    }

    /// Run the full analysis chain.
    pub fn analyze(&self) -> PhysicsResult<ScenarioReport> {
        self.validate()?;
        let accel = self.acceleration()?;
        let epoch = self.start_epoch();
        let route = self.route(accel)?;
        let distance = route.distance;

        // Propagating past the rest-to-rest point would drive the speed
        // through zero, so the burn always runs for the closed-form time.
        let transit = transfer::brachistochrone_time(distance, accel)?;
        let transit_s = transit.get::<second>();
        let closed_form = ClosedFormTransit {
            transit_time_s: transit_s,
            transit_days: transit_s / SECONDS_PER_DAY,
            peak_speed_km_s: transfer::brachistochrone_peak_speed(distance, accel)?.get::<kilometer_per_second>(),
            delta_v_km_s: transfer::brachistochrone_delta_v(distance, transit)?.get::<kilometer_per_second>(),
            stated_duration_s: self.duration.map(|t| t.get::<second>()),
            timing_error_fraction: self.duration.map(|t| (t.get::<second>() - transit_s).abs() / transit_s),
        };

        let model = ForceModel::new(Gravity::FieldFree, ThrustProfile::brachistochrone(distance, accel)?);
        let initial = StateVector::new(
            route.start,
            VelocityVector::from_raw(route.direction.raw() * DRIFT_SPEED_KM_S),
            epoch,
            Frame::Heliocentric,
        );
        let result = propagate(&initial, &model, transit, &self.integrator)?;
        let propagated = PropagatedTransit::from_result(&result, &initial, distance)?;

        let peak = result.peak_speed();
        let correction = RelativisticCorrection::evaluate(peak, Some(degrees(90.0)), self.significance_threshold)?;
        let times = relativistic::brachistochrone_times(distance, accel)?;
        let relativistic = RelativisticSummary {
            beta: correction.beta,
            lorentz_factor: correction.lorentz_factor,
            correction_magnitude: correction.correction_magnitude,
            significance: correction.significance,
            coordinate_time_s: times.coordinate.get::<second>(),
            proper_time_s: times.proper.get::<second>(),
            aberration_at_90_deg: correction.aberration.map(|a| a.get::<degree>()).unwrap_or(0.0),
        };

        let propellant = self
            .exhaust_velocity
            .map(|ve| PropellantBudget::new(self.mass, ve, distance, transit))
            .transpose()?;

        let arrival = match self.arrival {
            Some(planet) => Some(ArrivalReport::new(planet, result.final_state())?),
            None => None,
        };

        let (planes, comms, hohmann) = match (self.departure, self.arrival) {
            (Some(dep), Some(arr)) => (
                Some(PlaneReport::new(dep, arr, epoch, result.final_state().epoch, &route)?),
                Some(CommsReport::new(&result)?),
                Some(HohmannComparison::new(dep, arr, epoch)?),
            ),
            _ => (None, None, None),
        };

        let mass_timeline = self.mass_timeline(distance, transit)?;

        debug!(
            scenario = %self.name,
            distance_km = distance.get::<kilometer>(),
            transit_days = closed_form.transit_days,
            distance_error = propagated.distance_error_fraction,
            significance = %relativistic.significance,
            "scenario analysed"
        );

        Ok(ScenarioReport {
            name: self.name.clone(),
            epoch: self.epoch,
            acceleration_m_s2: accel.get::<meter_per_second_squared>(),
            acceleration_g: accel.get::<meter_per_second_squared>() / G0_M_S2,
            distance_km: distance.get::<kilometer>(),
            closed_form,
            propagated,
            relativistic,
            propellant,
            arrival,
            planes,
            comms,
            mass_timeline,
            hohmann,
        })
    }

    /// Timeline from the stated events, or from the two brachistochrone burns
    /// when only a dry mass and exhaust velocity are given.
    fn mass_timeline(&self, distance: Length, transit: Time) -> PhysicsResult<Option<MassTimeline>> {
        let Some(dry) = self.dry_mass else {
            return Ok(None);
        };
        let events = match (self.mass_events.is_empty(), self.exhaust_velocity) {
            (false, _) => self.mass_events.clone(),
            (true, Some(ve)) => {
                let dv = transfer::brachistochrone_delta_v(distance, transit)?;
                MassEvent::brachistochrone(transit, dv, ve).to_vec()
            }
            (true, None) => return Ok(None),
        };
        mass_timeline::compute_timeline(self.mass, dry, &events).map(Some)
    }
}

struct Route {
    start: Position,
    direction: Direction,
    distance: Length,
}

/// Everything [`Scenario::analyze`] derives, in unit-suffixed plain numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub epoch: DateTime<Utc>,
    pub acceleration_m_s2: f64,
    pub acceleration_g: f64,
    pub distance_km: f64,
    pub closed_form: ClosedFormTransit,
    pub propagated: PropagatedTransit,
    pub relativistic: RelativisticSummary,
    pub propellant: Option<PropellantBudget>,
    pub arrival: Option<ArrivalReport>,
    pub planes: Option<PlaneReport>,
    pub comms: Option<CommsReport>,
    pub mass_timeline: Option<MassTimeline>,
    pub hohmann: Option<HohmannComparison>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosedFormTransit {
    pub transit_time_s: f64,
    pub transit_days: f64,
    pub peak_speed_km_s: f64,
    pub delta_v_km_s: f64,
    pub stated_duration_s: Option<f64>,
    /// |stated − closed form| / closed form
    pub timing_error_fraction: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropagatedTransit {
    pub integrator: IntegratorKind,
    pub duration_s: f64,
    /// Straight-line distance from start to end point
    pub distance_km: f64,
    /// |propagated − closed form| / closed form
    pub distance_error_fraction: f64,
    pub peak_speed_km_s: f64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

impl PropagatedTransit {
    fn from_result(result: &PropagationResult, initial: &StateVector, expected: Length) -> PhysicsResult<Self> {
        let diagnostics = result.diagnostics();
        let covered = result.final_state().distance_to(initial)?.get::<kilometer>();
        let expected = expected.get::<kilometer>();
        Ok(Self {
            integrator: diagnostics.integrator,
            duration_s: result.duration().get::<second>(),
            distance_km: covered,
            distance_error_fraction: (covered - expected).abs() / expected,
            peak_speed_km_s: result.peak_speed().get::<kilometer_per_second>(),
            accepted_steps: diagnostics.accepted_steps,
            rejected_steps: diagnostics.rejected_steps,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativisticSummary {
    pub beta: f64,
    pub lorentz_factor: f64,
    /// γ − 1 at peak speed
    pub correction_magnitude: f64,
    pub significance: Significance,
    pub coordinate_time_s: f64,
    pub proper_time_s: f64,
    /// Apparent shift of a star abeam at peak speed
    pub aberration_at_90_deg: f64,
}

/// Rocket-equation budget for the closed-form Δv.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropellantBudget {
    pub exhaust_velocity_km_s: f64,
    pub delta_v_km_s: f64,
    pub mass_ratio: f64,
    pub propellant_kg: f64,
    /// How much Tsiolkovsky overstates the Δv at this mass ratio
    pub relativistic_delta_v_correction: f64,
}

impl PropellantBudget {
    fn new(mass: Mass, ve: Velocity, distance: Length, transit: Time) -> PhysicsResult<Self> {
        let dv = transfer::brachistochrone_delta_v(distance, transit)?;
        let ratio = transfer::mass_ratio(dv, ve)?;
        Ok(Self {
            exhaust_velocity_km_s: ve.get::<kilometer_per_second>(),
            delta_v_km_s: dv.get::<kilometer_per_second>(),
            mass_ratio: ratio,
            propellant_kg: transfer::propellant_consumed(mass, dv, ve)?.get::<kilogram>(),
            relativistic_delta_v_correction: relativistic::delta_v_correction_fraction(ve, ratio)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrivalReport {
    pub planet: Planet,
    pub epoch: Epoch,
    pub miss_distance_km: f64,
    pub angular_miss_deg: f64,
    /// The miss is inside the ephemeris error bound
    pub within_ephemeris_accuracy: bool,
}

impl ArrivalReport {
    fn new(planet: Planet, arrival: &StateVector) -> PhysicsResult<Self> {
        let alignment = ephemeris::arrival_alignment(planet, arrival)?;
        let miss = alignment.angular_miss.get::<degree>();
        Ok(Self {
            planet,
            epoch: alignment.epoch,
            miss_distance_km: alignment.distance.get::<kilometer>(),
            angular_miss_deg: miss,
            within_ephemeris_accuracy: miss <= ephemeris::stated_accuracy().get::<degree>(),
        })
    }
}

/// How far the route leaves the ecliptic, and what a flat reading misses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneReport {
    /// Departure planet at the start epoch
    pub departure_height_km: f64,
    /// Arrival planet at the arrival epoch
    pub arrival_height_km: f64,
    pub climb_km: f64,
    /// Angle between the route and the ecliptic
    pub route_elevation_deg: f64,
    /// Route length projected onto the ecliptic
    pub planar_distance_km: f64,
    /// (3D − planar) / 3D
    pub planar_error_fraction: f64,
    /// Vertical separation of the two planets at departure
    pub out_of_plane_km: f64,
    pub relative_inclination_deg: f64,
    /// Tilting the departure orbit into the arrival plane at departure speed
    pub plane_change_dv_km_s: f64,
}

impl PlaneReport {
    fn new(departure: Planet, arrival: Planet, start: Epoch, end: Epoch, route: &Route) -> PhysicsResult<Self> {
        let departure_height = ephemeris::ecliptic_height(departure, start)?.get::<kilometer>();
        let arrival_height = ephemeris::ecliptic_height(arrival, end)?.get::<kilometer>();
        let elevation = route.direction.z().clamp(-1.0, 1.0).asin();
        let distance = route.distance.get::<kilometer>();
        let planar = distance * elevation.cos();
        let speed = ephemeris::planet_position(departure, start)?.speed();
        let change = ephemeris::transfer_inclination_penalty(departure, arrival, start, speed)?;
        Ok(Self {
            departure_height_km: departure_height,
            arrival_height_km: arrival_height,
            climb_km: arrival_height - departure_height,
            route_elevation_deg: elevation.to_degrees(),
            planar_distance_km: planar,
            planar_error_fraction: (distance - planar) / distance,
            out_of_plane_km: ephemeris::out_of_plane_distance(departure, arrival, start)?.get::<kilometer>(),
            relative_inclination_deg: change.relative_inclination.get::<degree>(),
            plane_change_dv_km_s: change.delta_v.get::<kilometer_per_second>(),
        })
    }
}

/// One-way light delay to Earth over the propagated transfer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommsReport {
    pub departure_delay_s: f64,
    pub arrival_delay_s: f64,
    pub max_delay_s: f64,
    pub arrival_feasibility: CommFeasibility,
}

impl CommsReport {
    fn new(result: &PropagationResult) -> PhysicsResult<Self> {
        let timeline = comms::comm_timeline(result.samples(), Planet::Earth)?;
        let (Some(first), Some(last)) = (timeline.first(), timeline.last()) else {
            return Err(PhysicsError::invalid("trajectory", "no samples"));
        };
        Ok(Self {
            departure_delay_s: first.delay_s,
            arrival_delay_s: last.delay_s,
            max_delay_s: timeline.iter().map(|e| e.delay_s).fold(0.0, f64::max),
            arrival_feasibility: last.feasibility,
        })
    }
}

/// The slow way for comparison.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HohmannComparison {
    pub transfer_days: f64,
    pub departure_dv_km_s: f64,
    pub arrival_dv_km_s: f64,
    pub phase_angle_deg: f64,
    pub next_window: Option<DateTime<Utc>>,
}

impl HohmannComparison {
    fn new(departure: Planet, arrival: Planet, after: Epoch) -> PhysicsResult<Self> {
        let budget = transfer::hohmann_transfer_dv(mu::SUN, departure.mean_distance(), arrival.mean_distance())?;
        let window = ephemeris::next_hohmann_window(departure, arrival, after)?;
        Ok(Self {
            transfer_days: budget.transfer_time.get::<second>() / SECONDS_PER_DAY,
            departure_dv_km_s: budget.departure_dv.get::<kilometer_per_second>(),
            arrival_dv_km_s: budget.arrival_dv.get::<kilometer_per_second>(),
            phase_angle_deg: ephemeris::hohmann_phase_angle(departure, arrival).get::<degree>(),
            next_window: window.and_then(Epoch::to_datetime),
        })
    }
}

mod optional_km {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::units::{Length, kilometer, km};

    pub fn serialize<S: Serializer>(value: &Option<Length>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.get::<kilometer>()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Length>, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.map(km))
    }
}

mod optional_km_s {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::units::{Velocity, km_per_s, kilometer_per_second};

    pub fn serialize<S: Serializer>(value: &Option<Velocity>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.get::<kilometer_per_second>()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Velocity>, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.map(km_per_s))
    }
}
