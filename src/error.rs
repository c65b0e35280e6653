//! Error taxonomy shared by every physics component.

use crate::state::Frame;

/// Failure values returned by the physics core.
///
/// All variants are recoverable: nothing in the library panics on bad input.
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    #[error("invalid {parameter}: {reason}")]
    InputValidation {
        parameter: &'static str,
        reason: String,
    },

    #[error("Kepler solver did not converge after {iterations} iterations (residual {residual:.3e} rad)")]
    KeplerNonConvergence { residual: f64, iterations: u32 },

    #[error("propagation diverged after {steps} steps at t = {time:.3} s")]
    PropagationDivergence { steps: u64, time: f64 },

    #[error("non-finite derivative or state at t = {time:.3} s")]
    PropagationNumerical { time: f64 },

    #[error("degenerate vector: {context}")]
    DegenerateVector { context: &'static str },

    #[error("speed {speed_km_s} km/s is not below the speed of light")]
    SuperluminalInput { speed_km_s: f64 },

    #[error(
        "case {case}: {key} differs beyond tolerance (core {expected:.12e}, reference {actual:.12e}, tolerance {tolerance})"
    )]
    ToleranceExceeded {
        case: String,
        key: String,
        expected: f64,
        actual: f64,
        tolerance: String,
    },

    #[error("frame mismatch: {left} vs {right}")]
    FrameMismatch { left: Frame, right: Frame },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PhysicsError {
    /// Build an [`PhysicsError::InputValidation`] value.
    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InputValidation {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Reject NaN and infinities with an [`PhysicsError::InputValidation`].
pub(crate) fn ensure_finite(parameter: &'static str, value: f64) -> PhysicsResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PhysicsError::invalid(parameter, format!("must be finite, got {value}")))
    }
}

/// Reject values that are not strictly positive and finite.
pub(crate) fn ensure_positive(parameter: &'static str, value: f64) -> PhysicsResult<f64> {
    ensure_finite(parameter, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::invalid(parameter, format!("must be positive, got {value}")))
    }
}
