//! Bounded worker pool dispatcher.
//!
//! This module defines the [`WorkerPool`] struct, which manages a fixed set of
//! asynchronous workers draining one shared FIFO queue of [`WorkUnit`]s. The
//! worker count is the concurrency ceiling: each worker executes exactly one
//! unit at a time, and excess submissions queue in arrival order up to a
//! configured depth. Shutdown is coordinated through a shared
//! [`CancellationToken`] and resolves every accepted unit (executed, failed,
//! or explicitly failed as shutting down) before it returns.

mod worker;


use crate::{CorrelationId, Error, UnitHandle, UnitRunner, WorkUnit};
use core::time::Duration;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc, mpsc::error::TrySendError},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use worker::worker_loop;

/// Default bound on how long [`WorkerPool::shutdown`] waits for workers to
/// finish their in-flight units.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Sizing and teardown knobs for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of long-lived workers; the pool's concurrency ceiling.
    pub workers: usize,
    /// Queue capacity. Submissions beyond it fail with [`Error::QueueFull`]
    /// instead of growing the backlog without bound.
    pub queue_depth: usize,
    /// How long shutdown waits for in-flight units before giving up on the
    /// join and draining the queue.
    pub shutdown_timeout: Duration,
}

impl PoolConfig {
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        Self {
            workers,
            queue_depth,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Rejects configurations that cannot dispatch anything.
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(Error::InvalidRequest {
                reason: "pool requires at least one worker".into(),
            });
        }
        if self.queue_depth == 0 {
            return Err(Error::InvalidRequest {
                reason: "pool requires a queue depth of at least one unit".into(),
            });
        }
        Ok(())
    }
}

type SharedQueue<R> = Arc<
    Mutex<mpsc::Receiver<WorkUnit<<R as UnitRunner>::Payload, <R as UnitRunner>::Value>>>,
>;

/// A fixed-size pool of asynchronous workers executing submitted units.
///
/// Units enter one bounded MPSC queue and are dequeued in submission order by
/// whichever worker frees up first, so completion order is not submission
/// order; callers re-impose index order with
/// [`gather_ordered`](crate::gather_ordered). Each unit's outcome arrives on
/// the [`UnitHandle`] returned at submission.
pub struct WorkerPool<R: UnitRunner> {
    queue_tx: mpsc::Sender<WorkUnit<R::Payload, R::Value>>,
    queue_rx: SharedQueue<R>,
    shutdown_token: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown_timeout: Duration,
    queue_depth: usize,
}

impl<R> WorkerPool<R>
where
    R: UnitRunner + Send + Sync + 'static,
    R::Payload: Send + 'static,
    R::Value: Send + 'static,
{
    /// Validates the config and spawns the worker set.
    ///
    /// Workers start idle, parked on the shared queue, and live until
    /// [`shutdown`](Self::shutdown). Must be called from within a Tokio
    /// runtime.
    pub fn start(config: PoolConfig, runner: R) -> Result<Self, Error> {
        config.validate()?;

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_depth);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let shutdown_token = CancellationToken::new();
        let runner = Arc::new(runner);

        let mut workers = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&queue_rx),
                Arc::clone(&runner),
                shutdown_token.clone(),
            )));
        }

        Ok(Self {
            queue_tx,
            queue_rx,
            shutdown_token,
            workers: Mutex::new(workers),
            shutdown_timeout: config.shutdown_timeout,
            queue_depth: config.queue_depth,
        })
    }

    /// Submits one standalone unit (batch index 0).
    ///
    /// Non-blocking and safe to call from any task. Returns the handle the
    /// caller awaits for the outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has begun; never hangs.
    /// - [`Error::QueueFull`] when the queue is at capacity.
    pub fn submit(
        &self,
        payload: R::Payload,
        correlation: CorrelationId,
    ) -> Result<UnitHandle<R::Value>, Error> {
        self.submit_indexed(0, payload, correlation)
    }

    /// Submits a unit carrying an explicit batch index.
    ///
    /// The index travels on the returned handle so that ordered fan-in over
    /// pool-dispatched units can name the failing position.
    pub fn submit_indexed(
        &self,
        index: usize,
        payload: R::Payload,
        correlation: CorrelationId,
    ) -> Result<UnitHandle<R::Value>, Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let (unit, handle) = WorkUnit::new(index, correlation, payload);
        match self.queue_tx.try_send(unit) {
            Ok(()) => Ok(handle),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull {
                capacity: self.queue_depth,
            }),
            // The queue only closes during shutdown's drain phase.
            Err(TrySendError::Closed(_)) => Err(Error::ServiceShutdown),
        }
    }

    /// Whether shutdown has been initiated.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Gracefully shuts the pool down. Idempotent.
    ///
    /// - Cancels the shared token so new submissions are refused and idle
    ///   workers exit; a worker mid-unit finishes that unit first.
    /// - Joins every worker, bounded by the configured shutdown timeout. A
    ///   join that times out leaves the straggler detached on its in-flight
    ///   backend call; it can no longer dequeue.
    /// - Closes the queue and resolves every still-queued unit with
    ///   [`Error::ServiceShutdown`], so nothing accepted is left pending.
    pub async fn shutdown(&self) {
        tracing::info!("Refusing new submissions");
        self.shutdown_token.cancel();

        let workers = {
            let mut guard = self.workers.lock().await;
            core::mem::take(&mut *guard)
        };
        if !workers.is_empty() {
            tracing::debug!("Joining {} workers", workers.len());
            if timeout(self.shutdown_timeout, futures::future::join_all(workers))
                .await
                .is_err()
            {
                tracing::warn!(
                    "Worker join timed out after {:?}; an in-flight backend call is still running",
                    self.shutdown_timeout
                );
            }
        }

        let mut queue_rx = self.queue_rx.lock().await;
        queue_rx.close();
        let mut drained = 0_usize;
        while let Ok(unit) = queue_rx.try_recv() {
            let (_, slot) = unit.into_parts();
            let _ = slot.fulfill(Err(Error::ServiceShutdown));
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!("Resolved {drained} queued units with a shutdown failure");
        }

        tracing::info!("Worker pool shutdown complete");
    }
}
