//! Error types for the dispatch layer.
//!
//! This module defines the central `Error` enum, which captures all
//! recoverable and reportable error cases across unit submission, execution,
//! aggregation, and pool lifecycle. Transport crates map these onto their own
//! status codes; this crate never assumes a particular wire surface.
//!
//! ## Error Cases
//! - `InvalidRequest`: A request or batch was malformed or exceeded bounds.
//! - `UnknownModel`: The requested engine is not registered.
//! - `Submission`: A unit could not be handed to its execution backend.
//! - `QueueFull`: The bounded dispatch queue was at capacity.
//! - `Execution`: The backend accepted a unit but failed to complete it.
//! - `DeadlineElapsed`: A unit exceeded its hard completion deadline.
//! - `ServiceShutdown`: A unit was refused or discarded due to shutdown.
//! - `ChannelError`: An internal communication failure between tasks.
//! - `UnitFailed`: Batch-level wrapper naming the first failed unit.

use core::time::Duration;

/// Per-unit result: either the produced value or the failure that replaced it.
pub type Outcome<T> = core::result::Result<T, Error>;

/// Unified error type for the dispatch layer.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The request or batch was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// No engine is registered under the requested model identifier.
    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    /// The unit never reached its backend.
    #[error("Submission failed: {context}")]
    Submission { context: String },

    /// The bounded dispatch queue was full at submission time.
    #[error("Dispatch queue at capacity ({capacity})")]
    QueueFull { capacity: usize },

    /// The backend accepted the unit but reported a failure.
    #[error("Execution failed: {context}")]
    Execution { context: String },

    /// The unit did not complete within its deadline.
    #[error("Deadline of {after:?} elapsed")]
    DeadlineElapsed { after: Duration },

    /// The unit was refused or abandoned because the service is shutting
    /// down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// Internal channel send/receive failure (e.g., a delivery slot was
    /// dropped before fulfillment).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A batch aggregated under fail-fast policy hit its first failure.
    #[error("Unit {index} failed: {source}")]
    UnitFailed { index: usize, source: Box<Error> },
}

impl Error {
    /// Wraps a per-unit failure with the index it occurred at.
    pub fn unit_failed(index: usize, source: Error) -> Self {
        Error::UnitFailed {
            index,
            source: Box::new(source),
        }
    }
}
