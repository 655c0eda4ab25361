//! Unbounded dispatch: one spawned task per unit of work.
//!
//! Used when the backend itself bounds real parallelism (an inference engine
//! queueing submitted jobs, for example), so the dispatch layer spawns freely
//! and lets every unit make progress at once. There is no lifecycle to manage:
//! tasks are request-scoped and resolve their own delivery slots.

use crate::{Batch, UnitHandle, UnitRunner, WorkUnit};
use std::sync::Arc;
use tracing::Instrument;

/// Fans a batch out into one concurrent task per unit.
///
/// Returns one handle per payload, in batch order; `handles[i]` resolves with
/// the outcome of `batch[i]`. Each task runs independently: a failing unit
/// delivers its error into its own slot and never cancels a sibling. Callers
/// decide the fan-in policy with [`gather_ordered`](crate::gather_ordered) or
/// [`gather_outcomes`](crate::gather_outcomes).
pub fn spawn_units<R>(runner: &Arc<R>, batch: Batch<R::Payload>) -> Vec<UnitHandle<R::Value>>
where
    R: UnitRunner + Send + Sync + 'static,
    R::Payload: Send + 'static,
    R::Value: Send + 'static,
{
    let (correlation, payloads) = batch.into_parts();
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| {
            let (unit, handle) =
                WorkUnit::<R::Payload, R::Value>::new(index, correlation.unit(index), payload);
            let span = tracing::info_span!(
                "unit",
                correlation = %unit.correlation(),
                index = unit.index(),
            );
            let runner = Arc::clone(runner);
            tokio::spawn(
                async move {
                    let (payload, slot) = unit.into_parts();
                    let outcome = runner.run(payload).await;
                    if slot.fulfill(outcome).is_err() {
                        tracing::debug!("caller went away before delivery");
                    }
                }
                .instrument(span),
            );
            handle
        })
        .collect()
}
