//! Field-level scoring of agent results against expected values.
//!
//! Used for offline evaluation of prompt versions: feed a labelled sample
//! through an agent, then compare the result to a hand-written JSON object of
//! expected values. Only the keys present in the expected object are scored.
//!
//! Matching rules:
//! - numbers match within an absolute tolerance of [`AMOUNT_TOLERANCE`];
//! - strings in fields ending in `_name` match when either side contains the
//!   other, ignoring case (`"Smith Concreting"` vs `"Smith Concreting Pty Ltd"`);
//! - anything else must be equal.

use crate::error::TriageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Absolute tolerance for numeric fields.
pub const AMOUNT_TOLERANCE: f64 = 1.0;

/// Minimum accuracy for a report to pass.
pub const PASS_THRESHOLD: f64 = 0.75;

/// Outcome for one expected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub field: String,
    pub expected: Value,
    /// `null` when the result has no such key.
    pub actual: Value,
    pub matched: bool,
}

/// Scores for every expected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub fields: Vec<FieldScore>,
    /// Matched fields / scored fields; `0.0` when nothing was scored.
    pub accuracy: f64,
    pub passed: bool,
}

impl EvaluationReport {
    pub fn matched(&self) -> usize {
        self.fields.iter().filter(|f| f.matched).count()
    }
}

/// Score `actual` (any serialisable result) against `expected`.
///
/// # Errors
/// [`TriageError::Internal`] if `actual` cannot be represented as JSON.
pub fn evaluate<T: Serialize>(
    expected: &Map<String, Value>,
    actual: &T,
) -> Result<EvaluationReport, TriageError> {
    let actual = serde_json::to_value(actual)
        .map_err(|e| TriageError::Internal(format!("Failed to serialise result for scoring: {e}")))?;
    let fields: Vec<FieldScore> = expected
        .iter()
        .map(|(field, expected_value)| {
            let actual_value = actual.get(field).cloned().unwrap_or(Value::Null);
            FieldScore {
                field: field.clone(),
                matched: field_matches(field, expected_value, &actual_value),
                expected: expected_value.clone(),
                actual: actual_value,
            }
        })
        .collect();

    let accuracy = if fields.is_empty() {
        0.0
    } else {
        fields.iter().filter(|f| f.matched).count() as f64 / fields.len() as f64
    };

    Ok(EvaluationReport {
        fields,
        accuracy,
        passed: accuracy >= PASS_THRESHOLD,
    })
}

fn field_matches(field: &str, expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => match (e.as_f64(), a.as_f64()) {
            (Some(e), Some(a)) => (e - a).abs() < AMOUNT_TOLERANCE,
            _ => false,
        },
        (Value::String(e), Value::String(a)) if field.ends_with("_name") => {
            let (e, a) = (e.to_lowercase(), a.to_lowercase());
            e.contains(&a) || a.contains(&e)
        }
        _ => expected == actual,
    }
}
