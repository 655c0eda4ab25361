use crate::{UnitRunner, WorkUnit};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Worker task draining the pool's shared queue.
///
/// Each worker loops: lock the shared receiver, wait for a unit or
/// cancellation, release the lock, execute the unit to completion, repeat.
/// Holding the receiver only while waiting keeps dequeue order equal to
/// submission order while letting siblings pull the next unit during
/// execution. One unit per worker at a time is the pool's concurrency
/// ceiling.
///
/// Cancellation is checked before the queue (the `biased` arm order), so a
/// worker that wakes into shutdown exits without taking more work; units it
/// leaves behind are resolved by the pool's drain phase.
pub(crate) async fn worker_loop<R>(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<WorkUnit<R::Payload, R::Value>>>>,
    runner: Arc<R>,
    shutdown: CancellationToken,
) where
    R: UnitRunner + Send + Sync + 'static,
    R::Payload: Send + 'static,
    R::Value: Send + 'static,
{
    tracing::trace!("Worker {worker_id} started");

    loop {
        let next = {
            let mut queue_rx = queue.lock().await;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                unit = queue_rx.recv() => unit,
            }
        };
        // None covers both shutdown and a closed, fully drained queue.
        let Some(unit) = next else { break };

        let span = tracing::info_span!(
            "unit",
            worker = worker_id,
            correlation = %unit.correlation(),
            index = unit.index(),
        );
        async {
            let (payload, slot) = unit.into_parts();
            let outcome = runner.run(payload).await;
            if slot.fulfill(outcome).is_err() {
                tracing::debug!("caller went away before delivery");
            }
        }
        .instrument(span)
        .await;
    }

    tracing::trace!("Worker {worker_id} stopped");
}
