//! The core row-dispatch loop.
//!
//! Iterates a [`ParameterTable`] in row order, coerces each row into a
//! [`ParameterBag`], invokes the pipeline callback, and collects one
//! result per row. Rows are independent units of work: no state is
//! carried between iterations, each bag is owned by exactly one
//! invocation, and no row observes another row's bag or result.
//!
//! Three entry points share these semantics:
//! - [`dispatch`]: synchronous, sequential (the reference behavior)
//! - [`dispatch_async`]: sequential dispatch of an async callback
//! - [`dispatch_concurrent`]: bounded-concurrency dispatch with results
//!   reassembled in row order and fail-fast on the first callback error

use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::coerce;
use crate::error::{BoxError, CallbackSnafu, DispatchError, EmptyTableSnafu};
use crate::table::{ParameterBag, ParameterTable};

/// Invoke `pipeline` once per row of `table`, in table order.
///
/// Fails with [`DispatchError::EmptyTable`] before any callback runs if
/// the table has no rows. A callback error aborts remaining rows and is
/// propagated as [`DispatchError::Callback`] with the failing row index;
/// only JSON-decode failures inside coercion are swallowed (string
/// fallback), never callback failures.
pub fn dispatch<T, E, F>(mut pipeline: F, table: &ParameterTable) -> Result<Vec<T>, DispatchError>
where
    F: FnMut(ParameterBag) -> Result<T, E>,
    E: Into<BoxError>,
{
    ensure!(!table.is_empty(), EmptyTableSnafu);

    let mut results = Vec::with_capacity(table.len());
    for (row, raw) in table.rows().iter().enumerate() {
        debug!("[row {}] dispatching", row);
        let bag = coerce::coerce(raw);
        let value = pipeline(bag)
            .map_err(Into::into)
            .context(CallbackSnafu { row })?;
        results.push(value);
    }

    info!("Dispatched {} rows", results.len());
    Ok(results)
}

/// Sequential dispatch of an async pipeline callback.
///
/// Same semantics as [`dispatch`]; each row's future is awaited to
/// completion before the next row is coerced.
pub async fn dispatch_async<T, E, F, Fut>(
    mut pipeline: F,
    table: &ParameterTable,
) -> Result<Vec<T>, DispatchError>
where
    F: FnMut(ParameterBag) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    ensure!(!table.is_empty(), EmptyTableSnafu);

    let mut results = Vec::with_capacity(table.len());
    for (row, raw) in table.rows().iter().enumerate() {
        debug!("[row {}] dispatching", row);
        let bag = coerce::coerce(raw);
        let value = pipeline(bag)
            .await
            .map_err(Into::into)
            .context(CallbackSnafu { row })?;
        results.push(value);
    }

    info!("Dispatched {} rows", results.len());
    Ok(results)
}

/// Dispatch rows with up to `max_in_flight` callbacks running
/// concurrently.
///
/// Row independence makes this safe: results are reassembled in original
/// row order, and the first callback error fails the run without
/// returning partial results. `max_in_flight` is clamped to at least 1.
pub async fn dispatch_concurrent<T, E, F, Fut>(
    pipeline: F,
    table: &ParameterTable,
    max_in_flight: usize,
) -> Result<Vec<T>, DispatchError>
where
    F: Fn(ParameterBag) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    ensure!(!table.is_empty(), EmptyTableSnafu);

    let results: Vec<T> = stream::iter(table.rows().iter().enumerate())
        .map(|(row, raw)| {
            debug!("[row {}] dispatching", row);
            let fut = pipeline(coerce::coerce(raw));
            async move { fut.await.map_err(Into::into).context(CallbackSnafu { row }) }
        })
        .buffered(max_in_flight.max(1))
        .try_collect()
        .await?;

    info!("Dispatched {} rows", results.len());
    Ok(results)
}
