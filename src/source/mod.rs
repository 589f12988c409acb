//! Query-source adapters.
//!
//! Thin plug points that execute an invocation query against an external
//! backend, convert the backend's result rows into a [`ParameterTable`],
//! and delegate to the dispatcher. Adapters add no retry or recovery
//! logic: a backend failure propagates unchanged and aborts the run.
//!
//! Two backends are supported:
//! - [`sqlite`]: synchronous, over an embedded `rusqlite` connection
//! - [`postgres`]: asynchronous, over a `deadpool-postgres` pool
//!
//! Connection and credential lifecycle stays with the caller; adapters
//! borrow a connection handle for the duration of one run.
//!
//! [`ParameterTable`]: crate::table::ParameterTable

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresQueryOptions;
pub use sqlite::SqliteQueryOptions;
