//! Fan-in: reducing per-unit outcomes back into one ordered batch result.
//!
//! Handles are awaited in index order. The units behind them are already
//! running concurrently, so total wall time is bounded by the slowest unit,
//! not the sum. Two policies are offered: fail-fast with partial-result
//! discard, and best-effort accumulation of every outcome.

use crate::{Error, Outcome, UnitHandle};

/// Awaits every handle in index order and returns the values, all or nothing.
///
/// On the first failure, returns [`Error::UnitFailed`] naming the failing
/// unit's index and drops the remaining handles. Values already produced are
/// discarded, and units still in flight keep running to completion; their
/// outcomes are delivered into dropped slots and logged by the executor side.
pub async fn gather_ordered<T>(handles: Vec<UnitHandle<T>>) -> Result<Vec<T>, Error> {
    let mut values = Vec::with_capacity(handles.len());
    for handle in handles {
        let index = handle.index();
        match handle.join().await {
            Ok(value) => values.push(value),
            Err(err) => return Err(Error::unit_failed(index, err)),
        }
    }
    Ok(values)
}

/// Awaits every handle in index order and returns all outcomes, mixed.
///
/// The best-effort counterpart to [`gather_ordered`]: one failing unit does
/// not suppress the values of its siblings. `outcomes[i]` is the outcome of
/// the unit submitted at index `i`.
pub async fn gather_outcomes<T>(handles: Vec<UnitHandle<T>>) -> Vec<Outcome<T>> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.join().await);
    }
    outcomes
}
