//! Parameter table data model.
//!
//! A [`ParameterTable`] is an ordered sequence of named-column rows, either
//! built literally by the caller or produced by executing an invocation
//! query against a query-source backend. The table is read-only input to
//! the dispatcher and is never mutated by it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use std::path::Path;

use crate::error::{JsonParseSnafu, ReadFileSnafu, TableError, YamlParseSnafu};

/// One row of a parameter table: a mapping from column name to the raw
/// cell value as received from the table. Insertion order is preserved.
pub type ParameterRow = serde_json::Map<String, Value>;

/// The coerced form of a [`ParameterRow`]: the same column names mapped to
/// either a decoded JSON structure or the cell's plain string
/// representation. This is what a pipeline callback receives.
pub type ParameterBag = serde_json::Map<String, Value>;

/// An ordered sequence of parameter rows.
///
/// All rows are expected to share the same column set; per-cell value
/// types are arbitrary scalars (numeric, string, or JSON-encoded string).
/// The dispatcher requires at least one row, but an empty table can be
/// constructed and filled incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable {
    rows: Vec<ParameterRow>,
}

impl ParameterTable {
    /// Create a table from pre-built rows.
    pub fn from_rows(rows: Vec<ParameterRow>) -> Self {
        Self { rows }
    }

    /// Parse a table from a JSON array of objects.
    pub fn from_json(text: &str) -> Result<Self, TableError> {
        serde_json::from_str(text).context(JsonParseSnafu)
    }

    /// Parse a table from a YAML sequence of mappings.
    pub fn from_yaml(text: &str) -> Result<Self, TableError> {
        serde_yaml::from_str(text).context(YamlParseSnafu)
    }

    /// Load a table from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let text = std::fs::read_to_string(path).context(ReadFileSnafu)?;
        Self::from_yaml(&text)
    }

    /// Append a row to the table.
    pub fn push_row(&mut self, row: ParameterRow) {
        self.rows.push(row);
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows of the table, in table order.
    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }
}

impl FromIterator<ParameterRow> for ParameterTable {
    fn from_iter<I: IntoIterator<Item = ParameterRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Build a single-row helper map from string pairs. Intended for literal
/// tables in tests and examples.
pub fn row_from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> ParameterRow
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_array_of_objects() {
        let table = ParameterTable::from_json(
            r#"[{"table_prefix": "batman"}, {"table_prefix": "robin"}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0]["table_prefix"], json!("batman"));
        assert_eq!(table.rows()[1]["table_prefix"], json!("robin"));
    }

    #[test]
    fn parses_yaml_sequence_of_mappings() {
        let table = ParameterTable::from_yaml(
            "- table_prefix: batman\n- table_prefix: robin\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1]["table_prefix"], json!("robin"));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = ParameterTable::from_json("{not a table");
        assert!(matches!(result, Err(TableError::JsonParse { .. })));
    }

    #[test]
    fn preserves_column_order_within_a_row() {
        let table =
            ParameterTable::from_json(r#"[{"zulu": 1, "alpha": 2, "mike": 3}]"#).unwrap();
        let names: Vec<&str> = table.rows()[0].keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
    }
}
