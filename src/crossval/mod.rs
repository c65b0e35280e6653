//! Cross-validation export contract.
//!
//! The core serializes representative input batches together with its own
//! outputs into an [`ExportBundle`]. An independently written reference
//! (`cross_validation/reference.py`) recomputes every case from the inputs
//! alone and answers with a [`ReferenceBundle`]. [`compare`] diffs the two
//! within each case's [`Tolerance`].
//!
//! All keys carry their unit as a suffix (`_km`, `_km_s`, `_rad`, ...), so
//! the JSON is readable without this crate.

pub mod cases;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PhysicsError, PhysicsResult};

/// Version of the bundle layout. Bump on any incompatible change.
pub const SCHEMA_VERSION: &str = "1";

/// Unit-suffixed name → value.
pub type Values = BTreeMap<String, f64>;

/// Allowed disagreement between core and reference for one case.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tolerance {
    Absolute { value: f64 },
    Relative { value: f64 },
}

impl Tolerance {
    pub const fn absolute(value: f64) -> Self {
        Tolerance::Absolute { value }
    }

    pub const fn relative(value: f64) -> Self {
        Tolerance::Relative { value }
    }

    /// Disagreement as a fraction of the allowed bound; ≤ 1 passes.
    pub fn normalized_error(&self, expected: f64, actual: f64) -> f64 {
        let diff = (actual - expected).abs();
        if diff.is_nan() {
            return f64::INFINITY;
        }
        match *self {
            Tolerance::Absolute { value } => diff / value,
            Tolerance::Relative { value } => diff / (value * expected.abs().max(f64::MIN_POSITIVE)),
        }
    }

    pub fn accepts(&self, expected: f64, actual: f64) -> bool {
        self.normalized_error(expected, actual) <= 1.0
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tolerance::Absolute { value } => write!(f, "absolute {value:e}"),
            Tolerance::Relative { value } => write!(f, "relative {value:e}"),
        }
    }
}

/// One function evaluation to be reproduced by the reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationCase {
    pub id: String,
    /// Stable snake_case name the reference dispatches on
    pub function: String,
    pub inputs: Values,
    /// The core's results
    pub outputs: Values,
    pub tolerance: Tolerance,
}

impl CrossValidationCase {
    pub fn new(function: &str, index: usize, tolerance: Tolerance) -> Self {
        Self {
            id: format!("{function}/{index:02}"),
            function: function.to_owned(),
            inputs: Values::new(),
            outputs: Values::new(),
            tolerance,
        }
    }

    pub fn input(mut self, key: &str, value: f64) -> Self {
        self.inputs.insert(key.to_owned(), value);
        self
    }

    pub fn output(mut self, key: &str, value: f64) -> Self {
        self.outputs.insert(key.to_owned(), value);
        self
    }
}

/// Everything the core exports for one validation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub schema_version: String,
    /// Crate name and version that produced the outputs
    pub generator: String,
    pub cases: Vec<CrossValidationCase>,
}

/// Outputs recomputed by the reference, keyed by case id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBundle {
    pub schema_version: String,
    pub generator: String,
    pub outputs: BTreeMap<String, Values>,
}

fn check_schema(found: &str) -> PhysicsResult<()> {
    if found == SCHEMA_VERSION {
        Ok(())
    } else {
        Err(PhysicsError::invalid(
            "schema version",
            format!("expected {SCHEMA_VERSION:?}, found {found:?}"),
        ))
    }
}

impl ExportBundle {
    pub fn new(cases: Vec<CrossValidationCase>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_owned(),
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            cases,
        }
    }

    pub fn to_json(&self) -> PhysicsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> PhysicsResult<Self> {
        let bundle: Self = serde_json::from_str(text)?;
        check_schema(&bundle.schema_version)?;
        Ok(bundle)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> PhysicsResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Distinct function names, in first-seen order.
    pub fn functions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for case in &self.cases {
            if !seen.contains(&case.function.as_str()) {
                seen.push(&case.function);
            }
        }
        seen
    }
}

impl ReferenceBundle {
    pub fn from_json(text: &str) -> PhysicsResult<Self> {
        let bundle: Self = serde_json::from_str(text)?;
        check_schema(&bundle.schema_version)?;
        Ok(bundle)
    }

    pub fn read(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Author every case and evaluate the core on it.
pub fn export_bundle() -> PhysicsResult<ExportBundle> {
    let cases = cases::all()?;
    info!(cases = cases.len(), "cross-validation bundle exported");
    Ok(ExportBundle::new(cases))
}

/// A single value outside its tolerance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub case: String,
    pub function: String,
    pub key: String,
    pub expected: f64,
    /// NaN when the reference produced no value
    pub actual: f64,
    pub tolerance: Tolerance,
}

impl Mismatch {
    fn into_error(self) -> PhysicsError {
        PhysicsError::ToleranceExceeded {
            case: self.case,
            key: self.key,
            expected: self.expected,
            actual: self.actual,
            tolerance: self.tolerance.to_string(),
        }
    }
}

/// Outcome of diffing a bundle against reference outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub cases: usize,
    pub values: usize,
    /// Largest error/tolerance ratio per function
    pub worst_by_function: BTreeMap<String, f64>,
    pub mismatches: Vec<Mismatch>,
}

impl ComparisonReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Fail with the first mismatch, if any.
    pub fn ensure_agreement(&self) -> PhysicsResult<()> {
        match self.mismatches.first() {
            Some(m) => Err(m.clone().into_error()),
            None => Ok(()),
        }
    }
}

/// Diff every output value and collect all disagreements.
pub fn diff(bundle: &ExportBundle, reference: &ReferenceBundle) -> ComparisonReport {
    let mut report = ComparisonReport::default();
    let empty = Values::new();
    for case in &bundle.cases {
        let theirs = reference.outputs.get(&case.id).unwrap_or(&empty);
        report.cases += 1;
        for (key, &expected) in &case.outputs {
            report.values += 1;
            let actual = theirs.get(key).copied().unwrap_or(f64::NAN);
            let error = case.tolerance.normalized_error(expected, actual);
            let worst = report.worst_by_function.entry(case.function.clone()).or_insert(0.0);
            *worst = worst.max(error);
            if error > 1.0 {
                warn!(case = %case.id, key, expected, actual, tolerance = %case.tolerance, "reference disagrees");
                report.mismatches.push(Mismatch {
                    case: case.id.clone(),
                    function: case.function.clone(),
                    key: key.clone(),
                    expected,
                    actual,
                    tolerance: case.tolerance,
                });
            }
        }
    }
    for id in reference.outputs.keys() {
        if !bundle.cases.iter().any(|c| &c.id == id) {
            warn!(case = %id, "reference output for a case not in the export, ignored");
        }
    }
    debug!(
        cases = report.cases,
        values = report.values,
        mismatches = report.mismatches.len(),
        "comparison finished"
    );
    report
}

/// Diff and fail with [`PhysicsError::ToleranceExceeded`] on any disagreement.
pub fn compare(bundle: &ExportBundle, reference: &ReferenceBundle) -> PhysicsResult<ComparisonReport> {
    check_schema(&reference.schema_version)?;
    let report = diff(bundle, reference);
    report.ensure_agreement()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> ExportBundle {
        ExportBundle::new(vec![
            CrossValidationCase::new("lorentz_factor", 0, Tolerance::relative(1e-12))
                .input("speed_km_s", 0.0)
                .output("gamma", 1.0),
            CrossValidationCase::new("aberration", 0, Tolerance::absolute(1e-9))
                .input("speed_km_s", 3000.0)
                .input("star_angle_rad", std::f64::consts::FRAC_PI_2)
                .output("aberration_rad", -0.010_007),
        ])
    }

    fn reference_from(bundle: &ExportBundle) -> ReferenceBundle {
        ReferenceBundle {
            schema_version: SCHEMA_VERSION.into(),
            generator: "test".into(),
            outputs: bundle.cases.iter().map(|c| (c.id.clone(), c.outputs.clone())).collect(),
        }
    }

    #[test]
    fn test_tolerance_kinds() {
        assert!(Tolerance::absolute(1e-3).accepts(1.0, 1.0009));
        assert!(!Tolerance::absolute(1e-3).accepts(1.0, 1.0011));
        assert!(Tolerance::relative(1e-3).accepts(1000.0, 1000.9));
        assert!(!Tolerance::relative(1e-3).accepts(1000.0, 1001.1));
        assert!(!Tolerance::relative(1.0).accepts(1.0, f64::NAN));
        assert_eq!(Tolerance::relative(1e-12).to_string(), "relative 1e-12");
    }

    #[test]
    fn test_case_ids_and_functions() {
        let b = bundle();
        assert_eq!(b.cases[0].id, "lorentz_factor/00");
        assert_eq!(b.functions(), vec!["lorentz_factor", "aberration"]);
        assert_eq!(b.schema_version, SCHEMA_VERSION);
        assert!(b.generator.starts_with(env!("CARGO_PKG_NAME")));
    }

    #[test]
    fn test_identical_outputs_agree() {
        let b = bundle();
        let report = compare(&b, &reference_from(&b)).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.cases, 2);
        assert_eq!(report.values, 2);
        assert_eq!(report.worst_by_function["aberration"], 0.0);
    }

    #[test]
    fn test_disagreement_fails_and_is_listed() {
        let b = bundle();
        let mut reference = reference_from(&b);
        reference.outputs.get_mut("lorentz_factor/00").unwrap().insert("gamma".into(), 1.001);
        reference.outputs.remove("aberration/00");

        let report = diff(&b, &reference);
        assert_eq!(report.mismatches.len(), 2);
        assert!(report.mismatches[1].actual.is_nan());

        match compare(&b, &reference) {
            Err(PhysicsError::ToleranceExceeded { case, key, .. }) => {
                assert_eq!(case, "lorentz_factor/00");
                assert_eq!(key, "gamma");
            }
            other => panic!("expected ToleranceExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_version_checked() {
        let mut text = bundle().to_json().unwrap();
        text = text.replace("\"schema_version\": \"1\"", "\"schema_version\": \"0\"");
        assert!(matches!(
            ExportBundle::from_json(&text),
            Err(PhysicsError::InputValidation { .. })
        ));
    }

    #[test]
    fn test_bundle_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let b = bundle();
        b.write(&path).unwrap();
        assert_eq!(ExportBundle::read(&path).unwrap(), b);
    }
}
