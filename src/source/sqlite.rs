//! SQLite query-source adapter.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::dispatch;
use crate::error::{
    BoxError, ColumnDecodeSnafu, DispatchSnafu, PipelineError, SourceError, SourceSnafu,
    SqliteSnafu,
};
use crate::table::{ParameterBag, ParameterRow, ParameterTable};

/// Backend-specific execution options for the SQLite adapter.
///
/// Forwarded verbatim to the connection; the dispatcher interprets none
/// of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqliteQueryOptions {
    /// PRAGMA settings applied to the connection before the invocation
    /// query runs (e.g. `case_sensitive_like`).
    #[serde(default)]
    pub pragmas: HashMap<String, String>,
}

/// Execute `invocation_query` on `conn` and dispatch `pipeline` over the
/// resulting parameter table.
///
/// Query or fetch failures propagate unchanged; so do callback failures.
pub fn run_with_invocation_query<T, E, F>(
    pipeline: F,
    invocation_query: &str,
    conn: &Connection,
    options: &SqliteQueryOptions,
) -> Result<Vec<T>, PipelineError>
where
    F: FnMut(ParameterBag) -> Result<T, E>,
    E: Into<BoxError>,
{
    let table = execute_invocation_query(invocation_query, conn, options).context(SourceSnafu)?;
    dispatch::dispatch(pipeline, &table).context(DispatchSnafu)
}

/// Execute a query and materialize the full result as a parameter table.
pub fn execute_invocation_query(
    query: &str,
    conn: &Connection,
    options: &SqliteQueryOptions,
) -> Result<ParameterTable, SourceError> {
    for (name, value) in &options.pragmas {
        conn.pragma_update(None, name, value).context(SqliteSnafu)?;
    }

    let mut stmt = conn.prepare(query).context(SqliteSnafu)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = stmt.query([]).context(SqliteSnafu)?;
    let mut table = ParameterTable::default();
    while let Some(row) = rows.next().context(SqliteSnafu)? {
        let mut record = ParameterRow::new();
        for (idx, name) in column_names.iter().enumerate() {
            let cell = row.get_ref(idx).context(SqliteSnafu)?;
            record.insert(name.clone(), sqlite_cell(cell, name)?);
        }
        table.push_row(record);
    }

    info!("Invocation query returned {} rows", table.len());
    Ok(table)
}

fn sqlite_cell(value: ValueRef<'_>, column: &str) -> Result<Value, SourceError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::from(v)),
        ValueRef::Real(v) => serde_json::Number::from_f64(v)
            .map(Value::Number)
            .with_context(|| ColumnDecodeSnafu {
                column,
                message: format!("non-finite float {v}"),
            }),
        ValueRef::Text(v) => {
            let text = std::str::from_utf8(v).ok().with_context(|| ColumnDecodeSnafu {
                column,
                message: "invalid UTF-8 in text cell".to_string(),
            })?;
            Ok(Value::String(text.to_string()))
        }
        ValueRef::Blob(_) => ColumnDecodeSnafu {
            column,
            message: "BLOB cells cannot be parameter values".to_string(),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE params (table_prefix TEXT, config TEXT, count INTEGER);
             INSERT INTO params VALUES ('batman', '{\"cape\": true}', 1);
             INSERT INTO params VALUES ('robin', '{\"cape\": false}', 2);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn materializes_query_result_as_table() {
        let conn = seed_connection();
        let table = execute_invocation_query(
            "SELECT * FROM params ORDER BY count",
            &conn,
            &SqliteQueryOptions::default(),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0]["table_prefix"], json!("batman"));
        assert_eq!(table.rows()[0]["config"], json!(r#"{"cape": true}"#));
        assert_eq!(table.rows()[0]["count"], json!(1));
    }

    #[test]
    fn null_cells_survive_materialization() {
        let conn = Connection::open_in_memory().unwrap();
        let table = execute_invocation_query(
            "SELECT NULL AS missing, 'x' AS present",
            &conn,
            &SqliteQueryOptions::default(),
        )
        .unwrap();
        assert_eq!(table.rows()[0]["missing"], Value::Null);
        assert_eq!(table.rows()[0]["present"], json!("x"));
    }

    #[test]
    fn blob_cells_are_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let result = execute_invocation_query(
            "SELECT x'deadbeef' AS payload",
            &conn,
            &SqliteQueryOptions::default(),
        );
        assert!(matches!(result, Err(SourceError::ColumnDecode { .. })));
    }

    #[test]
    fn malformed_query_propagates_backend_error() {
        let conn = Connection::open_in_memory().unwrap();
        let result = run_with_invocation_query(
            |_bag| Ok::<(), BoxError>(()),
            "SELECT FROM nowhere",
            &conn,
            &SqliteQueryOptions::default(),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Source {
                source: SourceError::Sqlite { .. }
            })
        ));
    }

    #[test]
    fn dispatches_pipeline_over_query_rows() {
        let conn = seed_connection();
        let results = run_with_invocation_query(
            |bag| -> Result<String, BoxError> {
                Ok(format!(
                    "{}:{}",
                    bag["table_prefix"].as_str().unwrap(),
                    bag["config"]["cape"]
                ))
            },
            "SELECT * FROM params ORDER BY count",
            &conn,
            &SqliteQueryOptions::default(),
        )
        .unwrap();
        assert_eq!(results, vec!["batman:true", "robin:false"]);
    }

    #[test]
    fn empty_result_is_an_invalid_argument() {
        let conn = seed_connection();
        let result = run_with_invocation_query(
            |_bag| Ok::<(), BoxError>(()),
            "SELECT * FROM params WHERE count > 99",
            &conn,
            &SqliteQueryOptions::default(),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Dispatch {
                source: crate::error::DispatchError::EmptyTable
            })
        ));
    }
}
