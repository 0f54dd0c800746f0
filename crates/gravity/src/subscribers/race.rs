//! First-success join over a set of fallible operations

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Await the first operation that succeeds; else aggregate every failure
///
/// Operations run concurrently. As soon as one yields `Ok`, that value is
/// returned and the remaining operations are dropped, not cancelled
/// individually — losers are simply ignored. When every operation fails,
/// the failures are returned in completion order.
pub async fn race_ok<F, T, E>(ops: impl IntoIterator<Item = F>) -> Result<T, Vec<E>>
where
    F: Future<Output = Result<T, E>>,
{
    let mut pending: FuturesUnordered<F> = ops.into_iter().collect();
    let mut failures = Vec::new();

    while let Some(result) = pending.next().await {
        match result {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(e),
        }
    }

    Err(failures)
}
