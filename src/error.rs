//! Error types for corral using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

/// Boxed error type for propagating opaque pipeline callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============ Table Errors ============

/// Errors that can occur while loading a literal parameter table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TableError {
    /// Failed to parse a JSON parameter table document.
    #[snafu(display("Failed to parse JSON parameter table"))]
    JsonParse { source: serde_json::Error },

    /// Failed to parse a YAML parameter table document.
    #[snafu(display("Failed to parse YAML parameter table"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read a parameter table file.
    #[snafu(display("Failed to read parameter table file"))]
    ReadFile { source: std::io::Error },
}

// ============ Dispatch Errors ============

/// Errors that can occur during row dispatch.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DispatchError {
    /// The parameter table contained no rows. Dispatching over an empty
    /// table is a usage error, not a no-op; it fails before any callback
    /// runs.
    #[snafu(display("Parameter table must contain at least one row"))]
    EmptyTable,

    /// The pipeline callback failed for a row. Remaining rows are not
    /// processed.
    #[snafu(display("Pipeline callback failed on row {row}"))]
    Callback { row: usize, source: BoxError },
}

// ============ Source Errors ============

/// Errors that can occur while executing an invocation query against a
/// query-source backend.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// SQLite query execution or row fetch failed.
    #[snafu(display("SQLite invocation query failed"))]
    Sqlite { source: rusqlite::Error },

    /// Postgres query execution or row fetch failed.
    #[snafu(display("Postgres invocation query failed"))]
    Postgres { source: tokio_postgres::Error },

    /// Failed to check a connection out of the Postgres pool.
    #[snafu(display("Failed to check out a Postgres connection"))]
    Pool { source: deadpool_postgres::PoolError },

    /// A result cell could not be represented as a parameter value.
    #[snafu(display("Cannot decode column {column}: {message}"))]
    ColumnDecode { column: String, message: String },
}

// ============ Pipeline Error (top-level) ============

/// Top-level errors returned by the query-source adapters, aggregating
/// dispatch and backend failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Row dispatch failed.
    #[snafu(display("Dispatch error"))]
    Dispatch { source: DispatchError },

    /// Invocation query execution failed.
    #[snafu(display("Query source error"))]
    Source { source: SourceError },

    /// Literal parameter table could not be loaded.
    #[snafu(display("Parameter table error"))]
    Table { source: TableError },
}
