//! Domain models for the cellforge pipeline.
//!
//! Rows are string-keyed JSON objects ([`serde_json::Value`]), so a
//! cell is already a tagged variant: text, number, boolean, or empty
//! (null). Column sets may vary row to row. This module holds the
//! helpers around that representation plus the per-run accounting
//! types:
//!
//! - [`TransformOutcome`] - success count and per-row failures for one run
//! - [`RowFailure`] - a single recorded cell-transform failure
//! - [`cell_is_empty`] / [`infer_cell`] / [`render_cell`] - cell variant helpers

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Cell helpers
// =============================================================================

/// Check whether a cell counts as empty.
///
/// Empty cells are passed through by the transformer untouched: null,
/// whitespace-only text, and missing keys (the caller maps a missing
/// key to `None`).
pub fn cell_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Build a typed cell from a raw field.
///
/// Empty text becomes null, `true`/`false` become booleans, integer
/// and float literals become numbers, everything else stays text.
pub fn infer_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        // Preserve text for zero-padded identifiers like "0042".
        if trimmed == i.to_string() {
            return Value::Number(i.into());
        }
    }
    if looks_like_float(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(trimmed.to_string())
}

/// Only plain decimal forms count as floats ("1.5", "-0.25"), not
/// exponent notation or "nan"/"inf", which stay text.
fn looks_like_float(s: &str) -> bool {
    let mut dots = 0;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => {}
            '.' => dots += 1,
            '-' if i == 0 => {}
            _ => return false,
        }
    }
    dots == 1 && s.chars().any(|c| c.is_ascii_digit())
}

/// Render a cell back to field text for the sink.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays/objects only appear if a custom transform produced one.
        other => other.to_string(),
    }
}

// =============================================================================
// Transform Outcome
// =============================================================================

/// A recorded failure of the cell transform on one row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowFailure {
    /// Zero-based row index within the dataset (header excluded).
    pub row: usize,
    /// Designated column the transform ran against.
    pub column: String,
    /// Error message from the transform.
    pub message: String,
}

/// Summary of one transform run.
///
/// Returned next to the transformed rows. Failures never abort a run;
/// the affected rows keep their original cell value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformOutcome {
    /// Rows whose designated cell was non-empty and transformed.
    pub success_count: usize,
    /// Rows whose designated cell was empty or missing (passed through).
    pub skipped_count: usize,
    /// Per-row transform failures, in row order.
    pub failures: Vec<RowFailure>,
}

impl TransformOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every non-empty designated cell transformed cleanly.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} transformed, {} skipped, {} failed",
            self.success_count,
            self.skipped_count,
            self.failures.len()
        )
    }
}
