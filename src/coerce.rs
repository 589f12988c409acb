//! Per-row value coercion.
//!
//! Converts one raw [`ParameterRow`] into the [`ParameterBag`] a pipeline
//! callback receives. Every cell is independently put through a
//! try-JSON-decode with string fallback: JSON-encoded objects, arrays, and
//! quoted strings become decoded structures; everything else degrades to
//! its plain string representation. Decode failures are swallowed per
//! field and never surface to the caller.

use serde_json::Value;

use crate::table::{ParameterBag, ParameterRow};

/// Coerce a raw parameter row into the bag passed to a pipeline callback.
///
/// Columns are independent; the bag keeps the row's column order.
pub fn coerce(row: &ParameterRow) -> ParameterBag {
    row.iter()
        .map(|(name, cell)| (name.clone(), coerce_value(cell)))
        .collect()
}

/// Coerce a single cell.
///
/// Structured cells (objects, arrays) are already decoded and pass through
/// unchanged, as do nulls. Scalar cells are rendered to their string form
/// and then tentatively parsed as JSON:
///
/// - a JSON object, array, or quoted string keeps the decoded structure,
///   with nested array-of-object shape preserved exactly;
/// - bare scalars fall back to the string form, so a numeric cell `1`
///   becomes the string `"1"` rather than the JSON number `1`, and a bare
///   word, empty string, or malformed document stays a plain string.
fn coerce_value(cell: &Value) -> Value {
    let text = match cell {
        Value::Null | Value::Array(_) | Value::Object(_) => return cell.clone(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(decoded @ (Value::Object(_) | Value::Array(_) | Value::String(_))) => decoded,
        // Bare numbers, booleans and nulls are technically valid JSON
        // scalars, but parameter cells holding them degrade to their
        // string form.
        _ => Value::String(text),
    }
}
