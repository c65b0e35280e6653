//! Kepler equation solver and anomaly conversions.
//!
//! Three branches, selected by [`Eccentricity::conic`]:
//!
//! - elliptic (0 ≤ e < 1): M = E − e·sin E, Newton–Raphson on E
//! - hyperbolic (e > 1): M = e·sinh H − H, Newton–Raphson on H
//! - near-parabolic (|e − 1| < [`NEAR_PARABOLIC_THRESHOLD`]): Barker's
//!   equation M = D + D³/3 with D = tan(ν/2), solved in closed form
//!
//! On the near-parabolic branch "mean anomaly" means the parabolic mean
//! anomaly √(μ/(2q³))·(t − T), where q is the periapsis distance. Every
//! function in this module uses that convention consistently, so the
//! mean→true→mean round trip holds on all three branches.

use tracing::debug;

use crate::error::{PhysicsError, PhysicsResult};
use crate::units::{
    Angle, Conic, Eccentricity, GravParam, Length, Time, kilometer, normalize_radians, radian,
    radians, second,
};

/// Newton step size below which the solve is considered converged (rad).
pub const TOLERANCE: f64 = 1e-10;

/// Iteration budget for both Newton branches.
pub const MAX_ITERATIONS: u32 = 50;

/// Half-width of the band around e = 1 routed to Barker's equation.
pub const NEAR_PARABOLIC_THRESHOLD: f64 = 1e-6;

/// Which auxiliary anomaly a [`KeplerSolution`] carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnomalyKind {
    /// Eccentric anomaly E (elliptic and circular orbits)
    Eccentric,
    /// Hyperbolic anomaly H
    Hyperbolic,
    /// Parabolic anomaly D = tan(ν/2), stored as an angle-valued number
    Parabolic,
}

/// Result of solving Kepler's equation.
#[derive(Clone, Copy, Debug)]
pub struct KeplerSolution {
    /// E, H or D depending on `kind`
    pub anomaly: Angle,
    pub kind: AnomalyKind,
    /// Newton iterations used (0 for circular and near-parabolic inputs)
    pub iterations: u32,
    /// |f(x)| of the Kepler function at the returned anomaly
    pub residual: f64,
    eccentricity: Eccentricity,
}

impl KeplerSolution {
    /// True anomaly ν corresponding to this solution, in (−π, π].
    pub fn true_anomaly(&self) -> Angle {
        let x = self.anomaly.get::<radian>();
        let e = self.eccentricity.value();
        radians(match self.kind {
            AnomalyKind::Eccentric => eccentric_to_true_raw(x, e),
            AnomalyKind::Hyperbolic => hyperbolic_to_true_raw(x, e),
            AnomalyKind::Parabolic => 2.0 * x.atan(),
        })
    }
}

/// Solve Kepler's equation for the auxiliary anomaly on whichever branch `e` selects.
pub fn solve(mean_anomaly: Angle, e: Eccentricity) -> PhysicsResult<KeplerSolution> {
    let m = mean_anomaly.get::<radian>();
    if !m.is_finite() {
        return Err(PhysicsError::invalid("mean anomaly", format!("must be finite, got {m}")));
    }

    match e.conic() {
        Conic::Circular | Conic::Elliptic => solve_elliptic(m, e),
        Conic::Hyperbolic => solve_hyperbolic(m, e),
        Conic::NearParabolic => {
            debug!(eccentricity = e.value(), "near-parabolic input, using Barker's equation");
            Ok(KeplerSolution {
                anomaly: radians(solve_barker(m)),
                kind: AnomalyKind::Parabolic,
                iterations: 0,
                residual: 0.0,
                eccentricity: e,
            })
        }
    }
}

/// Elliptic branch: M = E − e·sin E.
fn solve_elliptic(m: f64, e: Eccentricity) -> PhysicsResult<KeplerSolution> {
    let ecc = e.value();
    let m = normalize_radians(m);

    if ecc == 0.0 {
        return Ok(KeplerSolution {
            anomaly: radians(m),
            kind: AnomalyKind::Eccentric,
            iterations: 0,
            residual: 0.0,
            eccentricity: e,
        });
    }

    // Danby's starter keeps Newton inside the basin as e → 1
    let mut big_e = if ecc < 0.8 {
        m
    } else {
        m + 0.85 * ecc * if m.sin() >= 0.0 { 1.0 } else { -1.0 }
    };

    let mut residual = f64::INFINITY;
    for iteration in 1..=MAX_ITERATIONS {
        let (sin_e, cos_e) = big_e.sin_cos();
        let f = big_e - ecc * sin_e - m;
        let f_prime = 1.0 - ecc * cos_e;
        let delta = f / f_prime;
        big_e -= delta;
        residual = (big_e - ecc * big_e.sin() - m).abs();

        if delta.abs() < TOLERANCE {
            return Ok(KeplerSolution {
                anomaly: radians(big_e),
                kind: AnomalyKind::Eccentric,
                iterations: iteration,
                residual,
                eccentricity: e,
            });
        }
    }

    Err(PhysicsError::KeplerNonConvergence {
        residual,
        iterations: MAX_ITERATIONS,
    })
}

/// Hyperbolic branch: M = e·sinh H − H.
fn solve_hyperbolic(m: f64, e: Eccentricity) -> PhysicsResult<KeplerSolution> {
    let ecc = e.value();
    let sign = if m < 0.0 { -1.0 } else { 1.0 };
    let mut h = sign * (2.0 * m.abs() / ecc + 1.8).ln();

    let mut residual = f64::INFINITY;
    for iteration in 1..=MAX_ITERATIONS {
        let f = ecc * h.sinh() - h - m;
        let f_prime = ecc * h.cosh() - 1.0;
        let delta = f / f_prime;
        h -= delta;
        residual = (ecc * h.sinh() - h - m).abs();

        if !h.is_finite() {
            break;
        }
        if delta.abs() < TOLERANCE {
            return Ok(KeplerSolution {
                anomaly: radians(h),
                kind: AnomalyKind::Hyperbolic,
                iterations: iteration,
                residual,
                eccentricity: e,
            });
        }
    }

    Err(PhysicsError::KeplerNonConvergence {
        residual,
        iterations: MAX_ITERATIONS,
    })
}

/// Closed-form solution of Barker's equation M = D + D³/3.
fn solve_barker(m: f64) -> f64 {
    // Solve for |M| and restore the sign: B + √(B²+1) cancels badly for B ≪ 0
    let b = 1.5 * m.abs();
    let y = (b + (b * b + 1.0).sqrt()).cbrt();
    let d = y - 1.0 / y;
    d.copysign(m)
}

#[inline]
fn eccentric_to_true_raw(big_e: f64, e: f64) -> f64 {
    let half = big_e / 2.0;
    let y = (1.0 + e).sqrt() * half.sin();
    let x = (1.0 - e).sqrt() * half.cos();
    normalize_radians(2.0 * y.atan2(x))
}

#[inline]
fn hyperbolic_to_true_raw(h: f64, e: f64) -> f64 {
    2.0 * (((e + 1.0) / (e - 1.0)).sqrt() * (h / 2.0).tanh()).atan()
}

fn require_branch(e: Eccentricity, wanted: &[Conic], what: &'static str) -> PhysicsResult<()> {
    if wanted.contains(&e.conic()) {
        Ok(())
    } else {
        Err(PhysicsError::invalid(
            "eccentricity",
            format!("{what} is undefined for {e} ({:?} branch)", e.conic()),
        ))
    }
}

/// M = E − e·sin E, wrapped into (−π, π].
pub fn eccentric_to_mean(eccentric_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Circular, Conic::Elliptic], "eccentric anomaly")?;
    let big_e = eccentric_anomaly.get::<radian>();
    Ok(radians(normalize_radians(big_e - e.value() * big_e.sin())))
}

/// Eccentric anomaly E from mean anomaly M (elliptic branch only).
pub fn mean_to_eccentric(mean_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Circular, Conic::Elliptic], "eccentric anomaly")?;
    solve(mean_anomaly, e).map(|s| s.anomaly)
}

/// True anomaly ν from eccentric anomaly E.
pub fn eccentric_to_true(eccentric_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Circular, Conic::Elliptic], "eccentric anomaly")?;
    Ok(radians(eccentric_to_true_raw(eccentric_anomaly.get::<radian>(), e.value())))
}

/// Eccentric anomaly E from true anomaly ν.
pub fn true_to_eccentric(true_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Circular, Conic::Elliptic], "eccentric anomaly")?;
    let ecc = e.value();
    let half = true_anomaly.get::<radian>() / 2.0;
    let y = (1.0 - ecc).sqrt() * half.sin();
    let x = (1.0 + ecc).sqrt() * half.cos();
    Ok(radians(normalize_radians(2.0 * y.atan2(x))))
}

/// M = e·sinh H − H.
pub fn hyperbolic_to_mean(hyperbolic_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Hyperbolic], "hyperbolic anomaly")?;
    let h = hyperbolic_anomaly.get::<radian>();
    Ok(radians(e.value() * h.sinh() - h))
}

/// Hyperbolic anomaly H from mean anomaly M.
pub fn mean_to_hyperbolic(mean_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Hyperbolic], "hyperbolic anomaly")?;
    solve(mean_anomaly, e).map(|s| s.anomaly)
}

/// True anomaly ν from hyperbolic anomaly H.
pub fn hyperbolic_to_true(hyperbolic_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Hyperbolic], "hyperbolic anomaly")?;
    Ok(radians(hyperbolic_to_true_raw(hyperbolic_anomaly.get::<radian>(), e.value())))
}

/// Hyperbolic anomaly H from true anomaly ν.
///
/// Fails when ν lies beyond the asymptote, |ν| ≥ acos(−1/e).
pub fn true_to_hyperbolic(true_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    require_branch(e, &[Conic::Hyperbolic], "hyperbolic anomaly")?;
    let ecc = e.value();
    let nu = normalize_radians(true_anomaly.get::<radian>());
    let limit = (-1.0 / ecc).acos();
    if nu.abs() >= limit {
        return Err(PhysicsError::invalid(
            "true anomaly",
            format!("{nu:.6} rad lies beyond the hyperbolic asymptote ±{limit:.6} rad"),
        ));
    }
    Ok(radians(2.0 * (((ecc - 1.0) / (ecc + 1.0)).sqrt() * (nu / 2.0).tan()).atanh()))
}

/// Parabolic mean anomaly from D = tan(ν/2): M = D + D³/3.
pub fn parabolic_to_mean(d: f64) -> Angle {
    radians(d + d * d * d / 3.0)
}

/// D = tan(ν/2) from the parabolic mean anomaly.
pub fn mean_to_parabolic(mean_anomaly: Angle) -> f64 {
    solve_barker(mean_anomaly.get::<radian>())
}

/// True anomaly from D = tan(ν/2).
pub fn parabolic_to_true(d: f64) -> Angle {
    radians(2.0 * d.atan())
}

/// D = tan(ν/2) from true anomaly.
pub fn true_to_parabolic(true_anomaly: Angle) -> f64 {
    (normalize_radians(true_anomaly.get::<radian>()) / 2.0).tan()
}

/// True anomaly from mean anomaly on any branch.
pub fn mean_to_true(mean_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    solve(mean_anomaly, e).map(|s| s.true_anomaly())
}

/// Mean anomaly from true anomaly on any branch.
pub fn true_to_mean(true_anomaly: Angle, e: Eccentricity) -> PhysicsResult<Angle> {
    match e.conic() {
        Conic::Circular | Conic::Elliptic => {
            eccentric_to_mean(true_to_eccentric(true_anomaly, e)?, e)
        }
        Conic::Hyperbolic => hyperbolic_to_mean(true_to_hyperbolic(true_anomaly, e)?, e),
        Conic::NearParabolic => Ok(parabolic_to_mean(true_to_parabolic(true_anomaly))),
    }
}

/// Mean motion n = √(μ/|a|³) in rad/s.
///
/// For the near-parabolic branch pass the periapsis distance as `distance`
/// and use [`parabolic_mean_motion`] instead.
pub fn mean_motion(mu: GravParam, semi_major_axis: Length) -> PhysicsResult<f64> {
    let a = semi_major_axis.get::<kilometer>().abs();
    if !(a.is_finite() && a > 0.0) {
        return Err(PhysicsError::invalid("semi-major axis", format!("must be non-zero and finite, got {a} km")));
    }
    Ok((mu.km3_s2() / (a * a * a)).sqrt())
}

/// Rate of the parabolic mean anomaly, √(μ/(2q³)) in rad/s.
pub fn parabolic_mean_motion(mu: GravParam, periapsis: Length) -> PhysicsResult<f64> {
    let q = crate::error::ensure_positive("periapsis distance", periapsis.get::<kilometer>())?;
    Ok((mu.km3_s2() / (2.0 * q * q * q)).sqrt())
}

/// Advance a mean anomaly by n·Δt. Elliptic results are wrapped into (−π, π].
pub fn propagate_mean_anomaly(m0: Angle, mean_motion_rad_s: f64, dt: Time, e: Eccentricity) -> Angle {
    let m = m0.get::<radian>() + mean_motion_rad_s * dt.get::<second>();
    match e.conic() {
        Conic::Circular | Conic::Elliptic => radians(normalize_radians(m)),
        Conic::Hyperbolic | Conic::NearParabolic => radians(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::degrees;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn ecc(e: f64) -> Eccentricity {
        Eccentricity::new(e).unwrap()
    }

    #[test]
    fn test_circular_returns_mean_anomaly_without_iterating() {
        let sol = solve(radians(1.234), Eccentricity::CIRCULAR).unwrap();
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.anomaly.get::<radian>(), 1.234);
        assert_eq!(sol.kind, AnomalyKind::Eccentric);
    }

    #[test]
    fn test_known_elliptic_solution() {
        // Vallado example 2-1: M = 235.4°, e = 0.4 → E = 220.512074°
        let sol = solve(degrees(235.4), ecc(0.4)).unwrap();
        let e_deg = sol.anomaly.get::<radian>().to_degrees().rem_euclid(360.0);
        assert_relative_eq!(e_deg, 220.512_074, epsilon = 1e-5);
        assert!(sol.iterations <= 6);
        assert!(sol.residual < 1e-12);
    }

    #[test]
    fn test_high_eccentricity_converges() {
        for &m in &[1e-6, 0.01, 0.5, 3.0, -2.5] {
            let sol = solve(radians(m), ecc(0.99)).unwrap();
            let back = eccentric_to_mean(sol.anomaly, ecc(0.99)).unwrap();
            assert_relative_eq!(back.get::<radian>(), m, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_elliptic_round_trip_grid() {
        // 100 eccentricities in [0, 0.99] × 1000 mean anomalies in [0, 2π)
        let mut worst = 0.0_f64;
        for i in 0..100 {
            let e = ecc(0.99 * i as f64 / 99.0);
            for j in 0..1000 {
                let m = std::f64::consts::TAU * j as f64 / 1000.0;
                let big_e = mean_to_eccentric(radians(m), e).unwrap();
                let back = eccentric_to_mean(big_e, e).unwrap().get::<radian>();
                worst = worst.max(normalize_radians(back - m).abs());
            }
        }
        assert!(worst < 1e-9, "worst round-trip error {worst:e} rad");
    }

    #[test]
    fn test_hyperbolic_just_outside_parabolic_band() {
        // Small |M| with e barely above the Barker band: f'(H) ≈ e − 1 near H = 0
        let e = ecc(1.0 + 2.0 * NEAR_PARABOLIC_THRESHOLD);
        for &m in &[1e-4, -1e-4, 1e-3, 0.05, 2.0] {
            let sol = solve(radians(m), e).unwrap();
            assert_eq!(sol.kind, AnomalyKind::Hyperbolic);
            assert!(sol.iterations < MAX_ITERATIONS / 2, "M = {m}: {} iterations", sol.iterations);
            let back = hyperbolic_to_mean(sol.anomaly, e).unwrap();
            assert_relative_eq!(back.get::<radian>(), m, epsilon = 1e-12, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_hyperbolic_round_trip() {
        for &e in &[1.001, 1.5, 3.0, 10.0] {
            for &m in &[-50.0, -1.0, 0.0, 0.3, 7.0, 200.0] {
                let sol = solve(radians(m), ecc(e)).unwrap();
                assert_eq!(sol.kind, AnomalyKind::Hyperbolic);
                let back = hyperbolic_to_mean(sol.anomaly, ecc(e)).unwrap();
                assert_relative_eq!(back.get::<radian>(), m, epsilon = 1e-8, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn test_barker_solution() {
        // ν = 90° → D = 1 → M = 4/3
        let sol = solve(radians(4.0 / 3.0), ecc(1.0)).unwrap();
        assert_eq!(sol.kind, AnomalyKind::Parabolic);
        assert_eq!(sol.iterations, 0);
        assert_relative_eq!(sol.anomaly.get::<radian>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(sol.true_anomaly().get::<radian>(), FRAC_PI_2, epsilon = 1e-12);

        let neg = mean_to_parabolic(radians(-4.0 / 3.0));
        assert_relative_eq!(neg, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_true_anomaly_conversions_round_trip() {
        for &e in &[0.0, 0.1, 0.7, 0.95] {
            for &nu in &[-3.0, -1.0, 0.0, 0.5, 2.9] {
                let m = true_to_mean(radians(nu), ecc(e)).unwrap();
                let back = mean_to_true(m, ecc(e)).unwrap();
                assert_relative_eq!(back.get::<radian>(), nu, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_eccentric_true_quadrants() {
        let e = ecc(0.5);
        let nu = eccentric_to_true(radians(PI), e).unwrap();
        assert_relative_eq!(nu.get::<radian>().abs(), PI, epsilon = 1e-12);
        let nu = eccentric_to_true(radians(0.0), e).unwrap();
        assert_eq!(nu.get::<radian>(), 0.0);
    }

    #[test]
    fn test_true_to_hyperbolic_rejects_beyond_asymptote() {
        // e = 2: asymptote at 120°
        let result = true_to_hyperbolic(degrees(130.0), ecc(2.0));
        assert!(matches!(result, Err(PhysicsError::InputValidation { .. })));
        assert!(true_to_hyperbolic(degrees(110.0), ecc(2.0)).is_ok());
    }

    #[test]
    fn test_branch_mismatch_is_an_error() {
        assert!(eccentric_to_mean(radians(1.0), ecc(1.5)).is_err());
        assert!(hyperbolic_to_mean(radians(1.0), ecc(0.5)).is_err());
    }

    #[test]
    fn test_non_finite_mean_anomaly_rejected() {
        assert!(matches!(
            solve(radians(f64::NAN), ecc(0.3)),
            Err(PhysicsError::InputValidation { .. })
        ));
    }

    #[test]
    fn test_mean_motion_leo() {
        let n = mean_motion(crate::types::mu::EARTH, crate::units::km(6578.0)).unwrap();
        let period = std::f64::consts::TAU / n;
        assert_relative_eq!(period, 5309.6, epsilon = 1.0);
    }

    #[test]
    fn test_propagate_mean_anomaly_wraps_elliptic_only() {
        let m = propagate_mean_anomaly(radians(3.0), 1.0, crate::units::seconds(1.0), ecc(0.1));
        assert_relative_eq!(m.get::<radian>(), 4.0 - std::f64::consts::TAU, epsilon = 1e-12);
        let h = propagate_mean_anomaly(radians(3.0), 1.0, crate::units::seconds(1.0), ecc(1.5));
        assert_relative_eq!(h.get::<radian>(), 4.0, epsilon = 1e-12);
    }
}
