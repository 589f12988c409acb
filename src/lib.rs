//! corral: a row-iteration dispatcher for parameterized data pipelines.
//!
//! Separates "what varies" (a parameter table, literal or discovered by
//! executing an invocation query) from "what runs" (a user-supplied
//! pipeline callback). The dispatcher invokes the callback once per row,
//! handing it the row's values as a parameter bag with JSON-encoded
//! string values transparently decoded into nested structures.
//!
//! # Example
//!
//! ```
//! use corral::{dispatch, ParameterTable};
//!
//! let table = ParameterTable::from_json(
//!     r#"[{"table_prefix": "batman"}, {"table_prefix": "robin"}]"#,
//! )?;
//!
//! let queries = dispatch(
//!     |bag| -> Result<String, corral::error::BoxError> {
//!         let prefix = bag["table_prefix"].as_str().unwrap_or_default();
//!         Ok(format!("SELECT * FROM {prefix}_results;"))
//!     },
//!     &table,
//! )?;
//!
//! assert_eq!(queries[1], "SELECT * FROM robin_results;");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod coerce;
pub mod dispatch;
pub mod error;
pub mod source;
pub mod table;

// Re-export main types
pub use dispatch::{dispatch, dispatch_async, dispatch_concurrent};
pub use error::{DispatchError, PipelineError, SourceError};
pub use table::{ParameterBag, ParameterRow, ParameterTable};
