//! Numerical integrators for the two-body equations of motion.
//!
//! Two schemes share one right-hand-side closure:
//! - Classic RK4 with a fixed step, the auditable baseline
//! - Dormand–Prince 5(4) with local-extrapolation, FSAL and RMS error control
//!
//! The state is a flat `[x, y, z, vx, vy, vz]` array in km and km/s. Typed
//! conversion happens one level up in [`super`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PhysicsError, PhysicsResult};
use crate::units::{Time, second, seconds};

/// Position and velocity packed for the integrators.
pub(crate) type Phase = [f64; 6];

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the fixed-step RK4 integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedStepConfig {
    /// Step size. Default: 10 s.
    pub step: Time,
    /// Record every n-th step; the final state is always recorded. Default: 1.
    pub sample_every: u32,
    /// Step budget. Default: 1 000 000.
    pub max_steps: u64,
}

impl Default for FixedStepConfig {
    fn default() -> Self {
        Self {
            step: seconds(10.0),
            sample_every: 1,
            max_steps: 1_000_000,
        }
    }
}

impl FixedStepConfig {
    /// Default budget with the given step size.
    pub fn with_step(step: Time) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> PhysicsResult<()> {
        crate::error::ensure_positive("step size", self.step.get::<second>())?;
        if self.sample_every == 0 {
            return Err(PhysicsError::invalid("sample_every", "must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for the adaptive Dormand–Prince integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// First trial step. Default: 60 s.
    pub initial_step: Time,
    /// Smallest step before giving up. Default: 1 µs.
    pub min_step: Time,
    /// Largest step. Default: 1 day.
    pub max_step: Time,
    /// Relative tolerance. Default: 1e-9.
    pub rtol: f64,
    /// Absolute tolerance, shared by km and km/s components. Default: 1e-12.
    pub atol: f64,
    /// Safety factor on the optimal step. Default: 0.9.
    pub safety: f64,
    /// Largest growth factor per accepted step. Default: 5.
    pub max_growth: f64,
    /// Budget of attempted (accepted + rejected) steps. Default: 1 000 000.
    pub max_steps: u64,
    /// Record every n-th accepted step; the final state is always recorded. Default: 1.
    pub sample_every: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            initial_step: seconds(60.0),
            min_step: seconds(1e-6),
            max_step: seconds(86_400.0),
            rtol: 1e-9,
            atol: 1e-12,
            safety: 0.9,
            max_growth: 5.0,
            max_steps: 1_000_000,
            sample_every: 1,
        }
    }
}

impl AdaptiveConfig {
    /// Interplanetary cruise around the Sun.
    pub fn heliocentric() -> Self {
        Self {
            initial_step: seconds(3_600.0), // 1 hour
            min_step: seconds(1e-3),
            max_step: seconds(5.0 * 86_400.0), // 5 days
            ..Self::default()
        }
    }

    /// Low orbits around a planet.
    pub fn planetocentric() -> Self {
        Self {
            initial_step: seconds(10.0),
            min_step: seconds(1e-6),
            max_step: seconds(30.0),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> PhysicsResult<()> {
        let min = crate::error::ensure_positive("min step", self.min_step.get::<second>())?;
        let max = crate::error::ensure_positive("max step", self.max_step.get::<second>())?;
        crate::error::ensure_positive("initial step", self.initial_step.get::<second>())?;
        crate::error::ensure_positive("rtol", self.rtol)?;
        crate::error::ensure_positive("atol", self.atol)?;
        crate::error::ensure_positive("safety", self.safety)?;
        if min > max {
            return Err(PhysicsError::invalid("min step", format!("{min} s exceeds max step {max} s")));
        }
        if self.max_growth.is_nan() || self.max_growth < 1.0 {
            return Err(PhysicsError::invalid("max growth", format!("must be >= 1, got {}", self.max_growth)));
        }
        if self.sample_every == 0 {
            return Err(PhysicsError::invalid("sample_every", "must be at least 1"));
        }
        Ok(())
    }
}

// =============================================================================
// Shared bookkeeping
// =============================================================================

/// Step statistics gathered by either integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct StepStats {
    pub accepted: u64,
    pub rejected: u64,
    pub evaluations: u64,
    pub min_step: f64,
    pub max_step: f64,
}

impl StepStats {
    fn new() -> Self {
        Self {
            accepted: 0,
            rejected: 0,
            evaluations: 0,
            min_step: f64::INFINITY,
            max_step: 0.0,
        }
    }

    fn accept(&mut self, h: f64) {
        self.accepted += 1;
        self.min_step = self.min_step.min(h);
        self.max_step = self.max_step.max(h);
    }
}

/// Evaluate the right-hand side and refuse non-finite derivatives.
///
/// `regime_t` selects the thrust regime (before/after a flip or flameout);
/// `t` is the physical stage time.
#[inline]
fn evaluate<F>(rhs: &F, t: f64, regime_t: f64, y: &Phase, stats: &mut StepStats) -> PhysicsResult<Phase>
where
    F: Fn(f64, f64, &Phase) -> Phase,
{
    stats.evaluations += 1;
    let k = rhs(t, regime_t, y);
    if k.iter().all(|c| c.is_finite()) {
        Ok(k)
    } else {
        Err(PhysicsError::PropagationNumerical { time: t })
    }
}

/// y + h·Σ cᵢ·kᵢ
#[inline]
fn combine(y: &Phase, h: f64, terms: &[(f64, &Phase)]) -> Phase {
    let mut out = *y;
    for &(c, k) in terms {
        if c == 0.0 {
            continue;
        }
        for (o, ki) in out.iter_mut().zip(k.iter()) {
            *o += h * c * ki;
        }
    }
    out
}

// =============================================================================
// RK4
// =============================================================================

/// Remainders shorter than this fraction of a step are rounding, not a step.
const SLIVER: f64 = 1e-9;

/// Number of fixed steps covering `duration`.
///
/// ⌈duration/h⌉, except that a trailing sliver left by floating-point excess
/// (0.1 + 0.1 + 0.1 > 0.3) is folded into the last full step.
pub(crate) fn step_count(duration: f64, h: f64) -> u64 {
    ((duration / h - SLIVER).ceil() as u64).max(1)
}

/// Classic fourth-order Runge–Kutta over `duration` seconds.
///
/// Takes [`step_count`] steps; the last one is shortened (or stretched by a
/// sliver) to land on the end. `on_step(index, t, y)` sees every completed
/// step, starting at index 1.
pub(crate) fn rk4<F, O>(rhs: F, y0: Phase, duration: f64, config: &FixedStepConfig, mut on_step: O) -> PhysicsResult<StepStats>
where
    F: Fn(f64, f64, &Phase) -> Phase,
    O: FnMut(u64, f64, &Phase) -> PhysicsResult<()>,
{
    let h = config.step.get::<second>();
    let n_steps = step_count(duration, h);
    if n_steps > config.max_steps {
        return Err(PhysicsError::PropagationDivergence {
            steps: config.max_steps,
            time: 0.0,
        });
    }

    let mut stats = StepStats::new();
    let mut y = y0;
    let mut t = 0.0;
    for i in 1..=n_steps {
        let dt = if i == n_steps { duration - t } else { h };

        let k1 = evaluate(&rhs, t, t, &y, &mut stats)?;
        let y2 = combine(&y, 0.5 * dt, &[(1.0, &k1)]);
        let k2 = evaluate(&rhs, t + 0.5 * dt, t + 0.5 * dt, &y2, &mut stats)?;
        let y3 = combine(&y, 0.5 * dt, &[(1.0, &k2)]);
        let k3 = evaluate(&rhs, t + 0.5 * dt, t + 0.5 * dt, &y3, &mut stats)?;
        let y4 = combine(&y, dt, &[(1.0, &k3)]);
        let k4 = evaluate(&rhs, t + dt, t + dt, &y4, &mut stats)?;

        y = combine(&y, dt / 6.0, &[(1.0, &k1), (2.0, &k2), (2.0, &k3), (1.0, &k4)]);
        t = if i == n_steps { duration } else { t + dt };
        stats.accept(dt);
        on_step(i, t, &y)?;
    }
    Ok(stats)
}

// =============================================================================
// Dormand–Prince 5(4)
// =============================================================================

// Butcher tableau (Dormand & Prince 1980)
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights, also the last stage row (FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Fifth minus fourth order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Adaptive Dormand–Prince integration over `duration` seconds.
///
/// Steps are clipped so they never cross an entry of `breakpoints`
/// (elapsed seconds where the right-hand side is discontinuous).
/// `on_step(index, t, y)` sees every accepted step, starting at index 1.
pub(crate) fn dp45<F, O>(
    rhs: F,
    y0: Phase,
    duration: f64,
    breakpoints: &[f64],
    config: &AdaptiveConfig,
    mut on_step: O,
) -> PhysicsResult<StepStats>
where
    F: Fn(f64, f64, &Phase) -> Phase,
    O: FnMut(u64, f64, &Phase) -> PhysicsResult<()>,
{
    let min_step = config.min_step.get::<second>();
    let max_step = config.max_step.get::<second>();

    let mut stats = StepStats::new();
    let mut y = y0;
    let mut t = 0.0;
    let mut h = config.initial_step.get::<second>().clamp(min_step, max_step);
    let mut k1: Option<Phase> = None;

    while t < duration {
        if stats.accepted + stats.rejected >= config.max_steps {
            return Err(PhysicsError::PropagationDivergence {
                steps: stats.accepted + stats.rejected,
                time: t,
            });
        }

        // Land exactly on the end or on the next discontinuity
        let mut target = duration;
        for &bp in breakpoints {
            if bp > t && bp < target {
                target = bp;
            }
        }
        let (h_try, hits_target) = if t + h >= target { (target - t, true) } else { (h, false) };

        let k1v = match k1 {
            Some(k) => k,
            None => evaluate(&rhs, t, t, &y, &mut stats)?,
        };
        let k2 = evaluate(&rhs, t + C2 * h_try, t, &combine(&y, h_try, &[(A21, &k1v)]), &mut stats)?;
        let k3 = evaluate(&rhs, t + C3 * h_try, t, &combine(&y, h_try, &[(A31, &k1v), (A32, &k2)]), &mut stats)?;
        let k4 = evaluate(
            &rhs,
            t + C4 * h_try,
            t,
            &combine(&y, h_try, &[(A41, &k1v), (A42, &k2), (A43, &k3)]),
            &mut stats,
        )?;
        let k5 = evaluate(
            &rhs,
            t + C5 * h_try,
            t,
            &combine(&y, h_try, &[(A51, &k1v), (A52, &k2), (A53, &k3), (A54, &k4)]),
            &mut stats,
        )?;
        let k6 = evaluate(
            &rhs,
            t + h_try,
            t,
            &combine(&y, h_try, &[(A61, &k1v), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)]),
            &mut stats,
        )?;
        let y_new = combine(&y, h_try, &[(B1, &k1v), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)]);
        let k7 = evaluate(&rhs, t + h_try, t, &y_new, &mut stats)?;

        let err = combine(&[0.0; 6], h_try, &[(E1, &k1v), (E3, &k3), (E4, &k4), (E5, &k5), (E6, &k6), (E7, &k7)]);
        let sum: f64 = err
            .iter()
            .zip(y.iter().zip(y_new.iter()))
            .map(|(e, (a, b))| (e / (config.atol + config.rtol * a.abs().max(b.abs()))).powi(2))
            .sum();
        let err_norm = (sum / 6.0).sqrt();

        if err_norm <= 1.0 {
            stats.accept(h_try);
            t = if hits_target { target } else { t + h_try };
            y = y_new;
            // k7 was evaluated in the old thrust regime; a discontinuity invalidates it
            k1 = if hits_target { None } else { Some(k7) };
            on_step(stats.accepted, t, &y)?;

            let factor = if err_norm == 0.0 {
                config.max_growth
            } else {
                (config.safety * err_norm.powf(-0.2)).clamp(1.0, config.max_growth)
            };
            // A step shortened to hit a target should not shrink the next one
            let base = if hits_target { h.max(h_try) } else { h_try };
            h = (base * factor).clamp(min_step, max_step);
        } else {
            stats.rejected += 1;
            trace!(t, h = h_try, err_norm, "rejected step");
            if h_try <= min_step {
                return Err(PhysicsError::PropagationDivergence {
                    steps: stats.accepted + stats.rejected,
                    time: t,
                });
            }
            k1 = Some(k1v);
            h = (h_try * 0.5).max(min_step);
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// y'' = −y as a phase-space oscillator on the x axis.
    fn oscillator(_t: f64, _regime: f64, y: &Phase) -> Phase {
        [y[3], 0.0, 0.0, -y[0], 0.0, 0.0]
    }

    #[test]
    fn test_rk4_step_count_and_last_step() {
        let config = FixedStepConfig::with_step(seconds(0.3));
        let mut times = Vec::new();
        let stats = rk4(oscillator, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0, &config, |_, t, _| {
            times.push(t);
            Ok(())
        })
        .unwrap();
        assert_eq!(stats.accepted, 4);
        assert_eq!(stats.evaluations, 16);
        assert_eq!(*times.last().unwrap(), 1.0);
        assert_relative_eq!(stats.min_step, 0.1, epsilon = 1e-12);
        assert_relative_eq!(stats.max_step, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_rk4_no_zero_length_trailing_step() {
        // 3 × 0.1 rounds to 0.30000000000000004, just past three steps
        let duration = 3.0 * 0.1;
        let config = FixedStepConfig::with_step(seconds(0.1));
        let mut times = Vec::new();
        let stats = rk4(oscillator, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0], duration, &config, |_, t, _| {
            times.push(t);
            Ok(())
        })
        .unwrap();
        assert_eq!(stats.accepted, 3);
        assert!(stats.min_step > 0.099, "min step {}", stats.min_step);
        assert_eq!(*times.last().unwrap(), duration);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(1.0, 0.3), 4);
        assert_eq!(step_count(0.9, 0.3), 3);
        assert_eq!(step_count(3.0 * 0.1, 0.1), 3);
        assert_eq!(step_count(1e-12, 1.0), 1);
        assert_eq!(step_count(100.0, 10.0), 10);
    }

    #[test]
    fn test_rk4_fourth_order_convergence() {
        let run = |h: f64| {
            let mut last = [0.0; 6];
            rk4(oscillator, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0, &FixedStepConfig::with_step(seconds(h)), |_, _, y| {
                last = *y;
                Ok(())
            })
            .unwrap();
            (last[0] - 1.0_f64.cos()).abs()
        };
        let ratio = run(0.1) / run(0.05);
        // Error should fall by ~2⁴
        assert!(ratio > 12.0 && ratio < 20.0, "ratio = {ratio}");
    }

    #[test]
    fn test_rk4_budget() {
        let config = FixedStepConfig {
            step: seconds(1.0),
            max_steps: 10,
            ..FixedStepConfig::default()
        };
        let result = rk4(oscillator, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 100.0, &config, |_, _, _| Ok(()));
        assert!(matches!(result, Err(PhysicsError::PropagationDivergence { .. })));
    }

    #[test]
    fn test_dp45_accuracy() {
        let mut last = [0.0; 6];
        let stats = dp45(
            oscillator,
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            10.0,
            &[],
            &AdaptiveConfig {
                initial_step: seconds(0.1),
                ..AdaptiveConfig::default()
            },
            |_, _, y| {
                last = *y;
                Ok(())
            },
        )
        .unwrap();
        assert_relative_eq!(last[0], 10.0_f64.cos(), epsilon = 1e-7);
        assert_relative_eq!(last[3], -10.0_f64.sin(), epsilon = 1e-7);
        assert!(stats.accepted > 0);
    }

    #[test]
    fn test_dp45_lands_on_breakpoints() {
        let mut times = Vec::new();
        dp45(
            oscillator,
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            2.0,
            &[0.7, 1.3],
            &AdaptiveConfig {
                initial_step: seconds(1.0),
                ..AdaptiveConfig::default()
            },
            |_, t, _| {
                times.push(t);
                Ok(())
            },
        )
        .unwrap();
        assert!(times.contains(&0.7));
        assert!(times.contains(&1.3));
        assert_eq!(*times.last().unwrap(), 2.0);
    }

    #[test]
    fn test_dp45_reports_nan_immediately() {
        let bad = |t: f64, _r: f64, _y: &Phase| -> Phase { if t > 0.5 { [f64::NAN; 6] } else { [0.0; 6] } };
        let result = dp45(bad, [0.0; 6], 1.0, &[], &AdaptiveConfig::default(), |_, _, _| Ok(()));
        assert!(matches!(result, Err(PhysicsError::PropagationNumerical { .. })));
    }

    #[test]
    fn test_config_validation() {
        assert!(AdaptiveConfig::default().validate().is_ok());
        assert!(AdaptiveConfig { rtol: 0.0, ..AdaptiveConfig::default() }.validate().is_err());
        assert!(
            AdaptiveConfig {
                min_step: seconds(10.0),
                max_step: seconds(1.0),
                ..AdaptiveConfig::default()
            }
            .validate()
            .is_err()
        );
        assert!(FixedStepConfig { sample_every: 0, ..FixedStepConfig::default() }.validate().is_err());
        assert!(FixedStepConfig::with_step(seconds(-1.0)).validate().is_err());
    }

    #[test]
    fn test_presets() {
        let helio = AdaptiveConfig::heliocentric();
        let planet = AdaptiveConfig::planetocentric();
        assert!(helio.max_step.get::<second>() > planet.max_step.get::<second>());
        assert_eq!(helio.rtol, 1e-9);
        assert_eq!(planet.safety, 0.9);
        assert_eq!(planet.max_growth, 5.0);
    }
}
