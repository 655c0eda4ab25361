//! Work units and their single-use delivery slots.
//!
//! A [`WorkUnit`] is one independently executable element of a batch: its
//! position, its payload, and the slot its outcome must be delivered into.
//! The slot and the caller-side [`UnitHandle`] are two ends of a oneshot
//! channel, so delivering twice is unrepresentable and dropping a slot
//! unfulfilled wakes the joining side with an error instead of hanging it.

use crate::{CorrelationId, Error, Outcome};
use core::time::Duration;
use tokio::sync::oneshot;

/// Creates the paired slot and handle for the unit at `index`.
pub fn delivery<T>(index: usize) -> (DeliverySlot<T>, UnitHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (DeliverySlot { tx }, UnitHandle { index, rx })
}

/// One independently executable element of a batch.
pub struct WorkUnit<P, T> {
    index: usize,
    correlation: CorrelationId,
    payload: P,
    slot: DeliverySlot<T>,
}

impl<P, T> WorkUnit<P, T> {
    /// Builds the unit and the handle its outcome will arrive on.
    pub fn new(
        index: usize,
        correlation: CorrelationId,
        payload: P,
    ) -> (Self, UnitHandle<T>) {
        let (slot, handle) = delivery(index);
        (
            Self {
                index,
                correlation,
                payload,
                slot,
            },
            handle,
        )
    }

    /// Zero-based position of this unit within its batch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Correlation identifier derived from the batch, for logging.
    pub fn correlation(&self) -> &CorrelationId {
        &self.correlation
    }

    /// Splits the unit into its payload and slot for execution.
    pub fn into_parts(self) -> (P, DeliverySlot<T>) {
        (self.payload, self.slot)
    }
}

/// Single-use slot a unit's outcome is delivered into.
pub struct DeliverySlot<T> {
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> DeliverySlot<T> {
    /// Delivers the outcome, consuming the slot.
    ///
    /// Hands the outcome back if the joining side already went away, e.g.
    /// after a caller-side timeout. Executors log and drop it.
    pub fn fulfill(self, outcome: Outcome<T>) -> Result<(), Outcome<T>> {
        self.tx.send(outcome)
    }
}

/// Caller-side handle resolved with exactly one unit's outcome.
pub struct UnitHandle<T> {
    index: usize,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> UnitHandle<T> {
    /// Zero-based position of the unit this handle belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Waits for the unit's outcome.
    ///
    /// A slot dropped unfulfilled resolves here as [`Error::ChannelError`],
    /// so a lost unit can never hang its caller.
    pub async fn join(self) -> Outcome<T> {
        let index = self.index;
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ChannelError {
                context: format!("delivery slot for unit {index} dropped before fulfillment"),
            }),
        }
    }

    /// Waits for the unit's outcome, giving up after `timeout`.
    pub async fn join_timeout(self, timeout: Duration) -> Outcome<T> {
        match tokio::time::timeout(timeout, self.join()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::DeadlineElapsed { after: timeout }),
        }
    }
}
