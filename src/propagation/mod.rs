//! Trajectory propagation under central gravity and engine thrust.
//!
//! Equations of motion:
//! - r′ = v
//! - v′ = −μ·r/|r|³ + thrust(t, v)·m₀/m(t)
//!
//! Both integrators return a [`PropagationResult`] carrying the sampled
//! trajectory and [`Diagnostics`]. Conserved-quantity drift is only
//! meaningful for unpowered coasts and is reported only for them.

mod gravity;
mod integrator;
mod thrust;

#[cfg(test)]
mod proptest_propagation;

pub use gravity::Gravity;
pub use integrator::{AdaptiveConfig, FixedStepConfig};
pub use thrust::{MassModel, ThrustProfile};

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::elements::{OrbitalElements, elements_to_state};
use crate::error::{PhysicsError, PhysicsResult};
use crate::state::{Frame, StateVector, specific_energy_raw};
use crate::time::Epoch;
use crate::units::{
    Eccentricity, GravParam, Length, Mass, Time, Velocity, kilogram, kilometer, km, km_per_s, radians, second,
    seconds,
};
use crate::vector::{Position, VelocityVector};

use integrator::{Phase, StepStats};

/// Coast energy drift above this is logged as suspicious.
const ENERGY_DRIFT_WARNING: f64 = 1e-6;

/// Everything that accelerates the spacecraft.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceModel {
    pub gravity: Gravity,
    pub thrust: ThrustProfile,
    /// Without a mass model the thrust acceleration stays constant
    #[serde(default)]
    pub mass: Option<MassModel>,
}

impl ForceModel {
    /// Unpowered motion around a central body.
    pub fn coast(mu: GravParam) -> Self {
        Self::new(Gravity::Central(mu), ThrustProfile::Coast)
    }

    pub fn new(gravity: Gravity, thrust: ThrustProfile) -> Self {
        Self {
            gravity,
            thrust,
            mass: None,
        }
    }

    /// Attach a propellant budget.
    pub fn with_mass(mut self, mass: MassModel) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn is_coast(&self) -> bool {
        self.thrust.is_coast()
    }

    /// Elapsed time at which the propellant runs out.
    pub fn flameout_time(&self) -> Option<Time> {
        self.flameout_s().map(seconds)
    }

    /// Spacecraft mass after `elapsed`, when a mass model is attached.
    pub fn mass_at(&self, elapsed: Time) -> Option<Mass> {
        let a0 = self.thrust.magnitude_km_s2();
        self.mass
            .map(|m| Mass::new::<kilogram>(m.mass_kg(a0, elapsed.get::<second>())))
    }

    fn flameout_s(&self) -> Option<f64> {
        if self.is_coast() {
            return None;
        }
        self.mass.and_then(|m| m.flameout_s(self.thrust.magnitude_km_s2()))
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if let Gravity::Central(mu) = self.gravity {
            crate::error::ensure_positive("gravitational parameter", mu.km3_s2())?;
        }
        self.thrust.validate()?;
        if let Some(mass) = &self.mass {
            mass.validate()?;
        }
        Ok(())
    }

    /// Elapsed times where the right-hand side jumps.
    fn breakpoints(&self, duration: f64) -> Vec<f64> {
        [self.thrust.flip_time_s(), self.flameout_s()]
            .into_iter()
            .flatten()
            .filter(|&t| t > 0.0 && t < duration)
            .collect()
    }

    /// Right-hand side over the packed state.
    ///
    /// `regime_t` decides flip and flameout; `t` drives the mass decay.
    fn rhs(&self) -> impl Fn(f64, f64, &Phase) -> Phase + '_ {
        let a0 = self.thrust.magnitude_km_s2();
        let flameout = self.flameout_s();
        move |t, regime_t, y| {
            let r = DVec3::new(y[0], y[1], y[2]);
            let v = DVec3::new(y[3], y[4], y[5]);
            let mut a = self.gravity.acceleration_raw(r);
            let burning = a0 > 0.0 && flameout.is_none_or(|tf| regime_t < tf);
            if burning {
                let scale = match &self.mass {
                    Some(m) => m.initial_mass.get::<kilogram>() / m.mass_kg(a0, t),
                    None => 1.0,
                };
                a += self.thrust.acceleration_raw(regime_t, v) * scale;
            }
            [v.x, v.y, v.z, a.x, a.y, a.z]
        }
    }
}

/// Which scheme produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Rk4,
    Dp45,
}

/// Integrator choice with its configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Integrator {
    Rk4(FixedStepConfig),
    Dp45(AdaptiveConfig),
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::Dp45(AdaptiveConfig::heliocentric())
    }
}

/// Integrator health report returned with every successful propagation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub integrator: IntegratorKind,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
    /// Right-hand-side evaluations
    pub evaluations: u64,
    pub min_step: Time,
    pub max_step: Time,
    /// Largest |ΔE/E₀| seen over the run; coasts only
    pub energy_drift: Option<f64>,
    /// Largest |Δh|/|h₀| seen over the run; coasts only
    pub angular_momentum_drift: Option<f64>,
    /// Elapsed time of propellant exhaustion, if it happened
    pub flameout: Option<Time>,
    pub final_mass: Option<Mass>,
}

/// Sampled trajectory plus diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropagationResult {
    samples: Vec<StateVector>,
    diagnostics: Diagnostics,
}

impl PropagationResult {
    /// Samples in time order; the first is the initial state, the last the final state.
    pub fn samples(&self) -> &[StateVector] {
        &self.samples
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn initial_state(&self) -> &StateVector {
        &self.samples[0]
    }

    pub fn final_state(&self) -> &StateVector {
        &self.samples[self.samples.len() - 1]
    }

    /// Sample closest in time to `epoch`.
    pub fn sample_at(&self, epoch: Epoch) -> &StateVector {
        let target = epoch.j2000_seconds();
        let idx = self
            .samples
            .partition_point(|s| s.epoch.j2000_seconds() < target)
            .min(self.samples.len() - 1);
        if idx > 0 {
            let before = &self.samples[idx - 1];
            let after = &self.samples[idx];
            if target - before.epoch.j2000_seconds() <= after.epoch.j2000_seconds() - target {
                return before;
            }
        }
        &self.samples[idx]
    }

    /// Highest sampled speed.
    pub fn peak_speed(&self) -> Velocity {
        self.samples
            .iter()
            .map(StateVector::speed)
            .fold(km_per_s(0.0), |a, b| if b > a { b } else { a })
    }

    /// Largest sampled distance from the frame origin.
    pub fn max_radius(&self) -> Length {
        self.samples
            .iter()
            .map(StateVector::radius)
            .fold(km(0.0), |a, b| if b > a { b } else { a })
    }

    /// Elapsed time from the first to the last sample.
    pub fn duration(&self) -> Time {
        self.final_state().epoch - self.initial_state().epoch
    }
}

fn pack(state: &StateVector) -> Phase {
    let r = state.position.raw();
    let v = state.velocity.raw();
    [r.x, r.y, r.z, v.x, v.y, v.z]
}

fn unpack(y: &Phase, epoch: Epoch, frame: Frame) -> StateVector {
    StateVector::new(
        Position::new(y[0], y[1], y[2]),
        VelocityVector::new(y[3], y[4], y[5]),
        epoch,
        frame,
    )
}

/// Records samples and tracks conserved quantities for one run.
struct Recorder {
    initial: StateVector,
    mu: GravParam,
    duration: f64,
    sample_every: u64,
    track_invariants: bool,
    energy0: f64,
    h0: DVec3,
    energy_drift: f64,
    h_drift: f64,
    samples: Vec<StateVector>,
}

impl Recorder {
    fn new(initial: &StateVector, model: &ForceModel, duration: f64, sample_every: u32) -> Self {
        let mu = model.gravity.mu();
        Self {
            initial: *initial,
            mu,
            duration,
            sample_every: u64::from(sample_every),
            track_invariants: model.is_coast(),
            energy0: specific_energy_raw(initial, mu),
            h0: initial.position.raw().cross(initial.velocity.raw()),
            energy_drift: 0.0,
            h_drift: 0.0,
            samples: vec![*initial],
        }
    }

    fn on_step(&mut self, index: u64, t: f64, y: &Phase) -> PhysicsResult<()> {
        let state = unpack(y, self.initial.epoch + seconds(t), self.initial.frame);
        if !state.is_finite() {
            return Err(PhysicsError::PropagationNumerical { time: t });
        }
        if self.track_invariants {
            let e = specific_energy_raw(&state, self.mu);
            self.energy_drift = self.energy_drift.max(relative_change(self.energy0, e));
            let h = state.position.raw().cross(state.velocity.raw());
            let dh = (h - self.h0).length();
            let h0 = self.h0.length();
            self.h_drift = self.h_drift.max(if h0 > 0.0 { dh / h0 } else { dh });
        }
        if index % self.sample_every == 0 || t >= self.duration {
            self.samples.push(state);
        }
        Ok(())
    }

    fn finish(self, kind: IntegratorKind, stats: StepStats, model: &ForceModel) -> PropagationResult {
        let flameout = model.flameout_s().filter(|&tf| tf <= self.duration);
        let diagnostics = Diagnostics {
            integrator: kind,
            accepted_steps: stats.accepted,
            rejected_steps: stats.rejected,
            evaluations: stats.evaluations,
            min_step: seconds(stats.min_step),
            max_step: seconds(stats.max_step),
            energy_drift: self.track_invariants.then_some(self.energy_drift),
            angular_momentum_drift: self.track_invariants.then_some(self.h_drift),
            flameout: flameout.map(seconds),
            final_mass: model.mass_at(seconds(self.duration)),
        };
        if let Some(drift) = diagnostics.energy_drift.filter(|&d| d > ENERGY_DRIFT_WARNING) {
            warn!(?kind, drift, "coast energy drift exceeds {ENERGY_DRIFT_WARNING:e}");
        }
        debug!(
            ?kind,
            accepted = stats.accepted,
            rejected = stats.rejected,
            evaluations = stats.evaluations,
            duration_s = self.duration,
            "propagation finished"
        );
        PropagationResult {
            samples: self.samples,
            diagnostics,
        }
    }
}

fn relative_change(reference: f64, value: f64) -> f64 {
    if reference.abs() > 1e-30 {
        ((value - reference) / reference).abs()
    } else {
        (value - reference).abs()
    }
}

fn validate_inputs(initial: &StateVector, model: &ForceModel, duration: Time) -> PhysicsResult<f64> {
    if !initial.is_finite() {
        return Err(PhysicsError::invalid("initial state", "contains non-finite components"));
    }
    model.validate()?;
    crate::error::ensure_positive("duration", duration.get::<second>())
}

/// Fixed-step RK4 propagation.
pub fn propagate_rk4(
    initial: &StateVector,
    model: &ForceModel,
    duration: Time,
    config: &FixedStepConfig,
) -> PhysicsResult<PropagationResult> {
    let duration = validate_inputs(initial, model, duration)?;
    config.validate()?;
    let mut recorder = Recorder::new(initial, model, duration, config.sample_every);
    let stats = integrator::rk4(model.rhs(), pack(initial), duration, config, |i, t, y| {
        recorder.on_step(i, t, y)
    })?;
    Ok(recorder.finish(IntegratorKind::Rk4, stats, model))
}

/// Adaptive Dormand–Prince propagation.
///
/// Steps never straddle a brachistochrone flip or a flameout.
pub fn propagate_dp45(
    initial: &StateVector,
    model: &ForceModel,
    duration: Time,
    config: &AdaptiveConfig,
) -> PhysicsResult<PropagationResult> {
    let duration = validate_inputs(initial, model, duration)?;
    config.validate()?;
    let breakpoints = model.breakpoints(duration);
    let mut recorder = Recorder::new(initial, model, duration, config.sample_every);
    let stats = integrator::dp45(model.rhs(), pack(initial), duration, &breakpoints, config, |i, t, y| {
        recorder.on_step(i, t, y)
    })?;
    Ok(recorder.finish(IntegratorKind::Dp45, stats, model))
}

/// Propagate with whichever integrator `integrator` selects.
pub fn propagate(
    initial: &StateVector,
    model: &ForceModel,
    duration: Time,
    integrator: &Integrator,
) -> PhysicsResult<PropagationResult> {
    match integrator {
        Integrator::Rk4(config) => propagate_rk4(initial, model, duration, config),
        Integrator::Dp45(config) => propagate_dp45(initial, model, duration, config),
    }
}

/// Circular orbit in the reference plane: position on +x, velocity on +y.
pub fn circular_orbit_state(mu: GravParam, radius: Length, epoch: Epoch, frame: Frame) -> PhysicsResult<StateVector> {
    let r = crate::error::ensure_positive("radius", radius.get::<kilometer>())?;
    let v = (mu.km3_s2() / r).sqrt();
    Ok(StateVector::new(
        Position::new(r, 0.0, 0.0),
        VelocityVector::new(0.0, v, 0.0),
        epoch,
        frame,
    ))
}

/// State at periapsis of a planar orbit with periapsis on +x.
pub fn periapsis_state(
    mu: GravParam,
    semi_major_axis: Length,
    eccentricity: Eccentricity,
    epoch: Epoch,
    frame: Frame,
) -> PhysicsResult<StateVector> {
    let zero = radians(0.0);
    let elements =
        OrbitalElements::from_semi_major_axis(semi_major_axis, eccentricity, zero, zero, zero, zero, epoch, mu)?;
    elements_to_state(&elements, epoch, frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::Planet;
    use crate::test_utils::{assertions, fixtures};
    use crate::types::mu;
    use crate::units::{kilograms, kilometer_per_second, m_per_s2};
    use approx::assert_relative_eq;

    const EARTH: Frame = Frame::BodyCentric(Planet::Earth);

    fn leo() -> StateVector {
        fixtures::leo()
    }

    #[test]
    fn test_circular_orbit_state_matches_fixture() {
        let built = circular_orbit_state(mu::EARTH, km(6578.0), Epoch::J2000, EARTH).unwrap();
        assert_eq!(built, leo());
    }

    fn period(r: f64) -> f64 {
        std::f64::consts::TAU * (r.powi(3) / mu::EARTH.km3_s2()).sqrt()
    }

    #[test]
    fn test_result_keeps_frame_and_epochs() {
        let result =
            propagate_rk4(&leo(), &ForceModel::coast(mu::EARTH), seconds(100.0), &FixedStepConfig::default())
                .unwrap();
        assert_eq!(result.samples().len(), 11);
        assert!(result.samples().iter().all(|s| s.frame == EARTH));
        assert_relative_eq!(result.duration().get::<second>(), 100.0);
        assert_eq!(result.final_state().epoch, Epoch::from_j2000_seconds(100.0));
    }

    #[test]
    fn test_sampling_keeps_final_state() {
        let config = FixedStepConfig {
            sample_every: 3,
            ..FixedStepConfig::default()
        };
        let result = propagate_rk4(&leo(), &ForceModel::coast(mu::EARTH), seconds(100.0), &config).unwrap();
        // initial, steps 3 6 9, and the final step 10
        assert_eq!(result.samples().len(), 5);
        assert_eq!(result.final_state().epoch.j2000_seconds(), 100.0);
    }

    #[test]
    fn test_rk4_rounding_excess_adds_no_step() {
        let config = FixedStepConfig {
            step: seconds(0.1),
            sample_every: 1,
            ..FixedStepConfig::default()
        };
        let result = propagate_rk4(&leo(), &ForceModel::coast(mu::EARTH), seconds(3.0 * 0.1), &config).unwrap();
        let diagnostics = result.diagnostics();
        assert_eq!(diagnostics.accepted_steps, 3);
        assert!(diagnostics.min_step.get::<second>() > 0.0);
        // initial state plus one sample per step, no repeated end point
        assert_eq!(result.samples().len(), 4);
        let epochs: Vec<f64> = result.samples().iter().map(|s| s.epoch.j2000_seconds()).collect();
        assert!(epochs.windows(2).all(|w| w[1] > w[0]), "{epochs:?}");
    }

    #[test]
    fn test_sample_at_picks_nearest() {
        let result =
            propagate_rk4(&leo(), &ForceModel::coast(mu::EARTH), seconds(100.0), &FixedStepConfig::default())
                .unwrap();
        assert_eq!(result.sample_at(Epoch::from_j2000_seconds(34.0)).epoch.j2000_seconds(), 30.0);
        assert_eq!(result.sample_at(Epoch::from_j2000_seconds(36.0)).epoch.j2000_seconds(), 40.0);
        assert_eq!(result.sample_at(Epoch::from_j2000_seconds(-5.0)).epoch.j2000_seconds(), 0.0);
        assert_eq!(result.sample_at(Epoch::from_j2000_seconds(1e9)).epoch.j2000_seconds(), 100.0);
    }

    #[test]
    fn test_coast_reports_drift_thrust_does_not() {
        let coast = propagate_dp45(&leo(), &ForceModel::coast(mu::EARTH), seconds(1000.0), &AdaptiveConfig::planetocentric())
            .unwrap();
        assert!(coast.diagnostics().energy_drift.unwrap() < 1e-9);
        assert!(coast.diagnostics().angular_momentum_drift.unwrap() < 1e-9);

        let model = ForceModel::new(
            Gravity::Central(mu::EARTH),
            ThrustProfile::ConstantPrograde {
                acceleration: m_per_s2(0.01),
            },
        );
        let powered = propagate_dp45(&leo(), &model, seconds(1000.0), &AdaptiveConfig::planetocentric()).unwrap();
        assert_eq!(powered.diagnostics().energy_drift, None);
        let e0 = specific_energy_raw(&leo(), mu::EARTH);
        let e1 = specific_energy_raw(powered.final_state(), mu::EARTH);
        assert!(e1 > e0, "prograde thrust must raise orbital energy");
    }

    #[test]
    fn test_circular_orbit_returns_to_start() {
        let r = 6578.0;
        let result = propagate_dp45(
            &leo(),
            &ForceModel::coast(mu::EARTH),
            seconds(period(r)),
            &AdaptiveConfig::planetocentric(),
        )
        .unwrap();
        let end = result.final_state();
        assert!(assertions::separation_km(end, &leo()) / r < 1e-7);
        assertions::assert_energy_conserved(&leo(), end, mu::EARTH, 1e-9);
        assertions::assert_angular_momentum_conserved(&leo(), end, 1e-9);
        assert_relative_eq!(result.max_radius().get::<kilometer>(), r, max_relative = 1e-8);
    }

    #[test]
    fn test_mass_decay_raises_acceleration_and_flags_flameout() {
        // Field-free from a slow drift so thrust has a direction
        let start = StateVector::new(
            Position::ZERO,
            VelocityVector::new(1e-3, 0.0, 0.0),
            Epoch::J2000,
            Frame::Heliocentric,
        );
        let a0 = m_per_s2(1.0);
        // ṁ = 1 m/s² · 1000 kg / 10 km/s = 0.1 kg/s; 500 kg of propellant lasts 5000 s
        let mass = MassModel::new(kilograms(1000.0), kilograms(500.0), km_per_s(10.0)).unwrap();
        let constant = ForceModel::new(Gravity::FieldFree, ThrustProfile::ConstantPrograde { acceleration: a0 });
        let decaying = constant.with_mass(mass);

        let config = AdaptiveConfig::heliocentric();
        let fixed = propagate_dp45(&start, &constant, seconds(6000.0), &config).unwrap();
        let burned = propagate_dp45(&start, &decaying, seconds(6000.0), &config).unwrap();

        let flameout = burned.diagnostics().flameout.unwrap().get::<second>();
        assert_relative_eq!(flameout, 5000.0, max_relative = 1e-12);
        assert!(fixed.diagnostics().flameout.is_none());
        assert_relative_eq!(burned.diagnostics().final_mass.unwrap().get::<kilogram>(), 500.0);

        // Rocket equation: Δv = vₑ ln(m₀/m_dry) over the burn
        let dv = burned.final_state().speed().get::<kilometer_per_second>() - 1e-3;
        assert_relative_eq!(dv, 10.0 * 2.0_f64.ln(), max_relative = 1e-7);
        let dv_fixed = fixed.final_state().speed().get::<kilometer_per_second>() - 1e-3;
        assert_relative_eq!(dv_fixed, 6.0, max_relative = 1e-9);
        assert!(dv > dv_fixed * 5000.0 / 6000.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let model = ForceModel::coast(mu::EARTH);
        let config = FixedStepConfig::default();
        assert!(matches!(
            propagate_rk4(&leo(), &model, seconds(0.0), &config),
            Err(PhysicsError::InputValidation { .. })
        ));
        assert!(propagate_rk4(&leo(), &model, seconds(10.0), &FixedStepConfig::with_step(seconds(0.0))).is_err());
        let mut bad = leo();
        bad.position = Position::new(f64::NAN, 0.0, 0.0);
        assert!(propagate_rk4(&bad, &model, seconds(10.0), &config).is_err());
        let negative = ForceModel::new(
            Gravity::Central(mu::EARTH),
            ThrustProfile::ConstantPrograde {
                acceleration: m_per_s2(-1.0),
            },
        );
        assert!(propagate_rk4(&leo(), &negative, seconds(10.0), &config).is_err());
    }

    #[test]
    fn test_singular_start_is_numerical_failure() {
        let start = StateVector::new(Position::ZERO, VelocityVector::new(1.0, 0.0, 0.0), Epoch::J2000, EARTH);
        let model = ForceModel::coast(mu::EARTH);
        let rk4 = propagate_rk4(&start, &model, seconds(10.0), &FixedStepConfig::default());
        assert!(matches!(rk4, Err(PhysicsError::PropagationNumerical { time }) if time == 0.0));
        let dp45 = propagate_dp45(&start, &model, seconds(10.0), &AdaptiveConfig::default());
        assert!(matches!(dp45, Err(PhysicsError::PropagationNumerical { .. })));
    }

    #[test]
    fn test_periapsis_state_matches_vis_viva() {
        let s = periapsis_state(mu::EARTH, km(20_000.0), Eccentricity::new(0.5).unwrap(), Epoch::J2000, EARTH).unwrap();
        assert_relative_eq!(s.position.x(), 10_000.0, epsilon = 1e-8);
        let v = (mu::EARTH.km3_s2() * (2.0 / 10_000.0 - 1.0 / 20_000.0)).sqrt();
        assert_relative_eq!(s.velocity.y(), v, max_relative = 1e-12);
    }

    #[test]
    fn test_integrator_serde_defaults() {
        let parsed: Integrator = serde_json::from_str(r#"{"method":"rk4","step":5.0}"#).unwrap();
        assert_eq!(parsed, Integrator::Rk4(FixedStepConfig::with_step(seconds(5.0))));
        let parsed: Integrator = serde_json::from_str(r#"{"method":"dp45"}"#).unwrap();
        assert_eq!(parsed, Integrator::Dp45(AdaptiveConfig::default()));
    }
}
