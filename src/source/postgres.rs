//! PostgreSQL query-source adapter.

use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use tokio_postgres::types::Type;
use tokio_postgres::{Column, Row};
use tracing::info;

use crate::dispatch;
use crate::error::{
    BoxError, ColumnDecodeSnafu, DispatchSnafu, PipelineError, PoolSnafu, PostgresSnafu,
    SourceError, SourceSnafu,
};
use crate::table::{ParameterBag, ParameterRow, ParameterTable};

/// Backend-specific execution options for the Postgres adapter.
///
/// Applied as `SET` statements on the checked-out connection before the
/// invocation query runs; the dispatcher interprets none of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgresQueryOptions {
    /// Statement timeout in milliseconds for the invocation query.
    #[serde(default)]
    pub statement_timeout_ms: Option<u64>,

    /// Schema search path for the invocation query.
    #[serde(default)]
    pub search_path: Option<String>,
}

/// Execute `invocation_query` on a pooled connection and dispatch
/// `pipeline` over the resulting parameter table.
///
/// Query or fetch failures propagate unchanged; so do callback failures.
pub async fn run_with_invocation_query<T, E, F>(
    pipeline: F,
    invocation_query: &str,
    pool: &Pool,
    options: &PostgresQueryOptions,
) -> Result<Vec<T>, PipelineError>
where
    F: FnMut(ParameterBag) -> Result<T, E>,
    E: Into<BoxError>,
{
    let table = execute_invocation_query(invocation_query, pool, options)
        .await
        .context(SourceSnafu)?;
    dispatch::dispatch(pipeline, &table).context(DispatchSnafu)
}

/// Execute a query and materialize the full result as a parameter table.
pub async fn execute_invocation_query(
    query: &str,
    pool: &Pool,
    options: &PostgresQueryOptions,
) -> Result<ParameterTable, SourceError> {
    let client = pool.get().await.context(PoolSnafu)?;

    if let Some(ms) = options.statement_timeout_ms {
        client
            .batch_execute(&format!("SET statement_timeout = {ms}"))
            .await
            .context(PostgresSnafu)?;
    }
    if let Some(path) = &options.search_path {
        client
            .batch_execute(&format!("SET search_path = {path}"))
            .await
            .context(PostgresSnafu)?;
    }

    let rows = client.query(query, &[]).await.context(PostgresSnafu)?;

    let mut table = ParameterTable::default();
    for row in &rows {
        table.push_row(pg_row(row)?);
    }

    info!("Invocation query returned {} rows", table.len());
    Ok(table)
}

fn pg_row(row: &Row) -> Result<ParameterRow, SourceError> {
    let mut record = ParameterRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), pg_cell(row, idx, column)?);
    }
    Ok(record)
}

/// Decode one result cell to a parameter value.
///
/// JSON and JSONB cells arrive already decoded; everything else comes
/// through as the closest JSON scalar. Types without a native mapping
/// fall back to their text representation.
fn pg_cell(row: &Row, idx: usize, column: &Column) -> Result<Value, SourceError> {
    let ty = column.type_();
    let value = match *ty {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .context(PostgresSnafu)?
            .map(Value::from),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .context(PostgresSnafu)?
            .map(|v| Value::from(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .context(PostgresSnafu)?
            .map(|v| Value::from(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .context(PostgresSnafu)?
            .map(Value::from),
        Type::FLOAT4 => float_cell(
            row.try_get::<_, Option<f32>>(idx)
                .context(PostgresSnafu)?
                .map(f64::from),
            column,
        )?,
        Type::FLOAT8 => float_cell(
            row.try_get::<_, Option<f64>>(idx).context(PostgresSnafu)?,
            column,
        )?,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
            .try_get::<_, Option<String>>(idx)
            .context(PostgresSnafu)?
            .map(Value::String),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)
            .context(PostgresSnafu)?,
        _ => match row.try_get::<_, Option<String>>(idx) {
            Ok(text) => text.map(Value::String),
            Err(_) => {
                return ColumnDecodeSnafu {
                    column: column.name(),
                    message: format!("unsupported column type {ty}"),
                }
                .fail()
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float_cell(value: Option<f64>, column: &Column) -> Result<Option<Value>, SourceError> {
    value
        .map(|v| {
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .with_context(|| ColumnDecodeSnafu {
                    column: column.name(),
                    message: format!("non-finite float {v}"),
                })
        })
        .transpose()
}
