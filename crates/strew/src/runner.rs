//! The unit-of-work contract executed by both dispatchers.

use crate::Outcome;
use core::future::Future;

/// Executes one unit of work against a backend.
///
/// A runner is the only code a dispatcher calls on behalf of a unit: it takes
/// the unit's payload and produces the unit's [`Outcome`]. Implementations
/// must convert every backend-level failure (refusal, execution error,
/// timeout) into `Err` rather than panicking, since a panic escapes the
/// outcome contract and costs the caller a
/// [`ChannelError`](crate::Error::ChannelError) instead of a reason.
///
/// Runners are shared across workers and spawned tasks, so implementations
/// hold their backend behind `Arc` and stay cheap to call concurrently.
pub trait UnitRunner {
    /// Input carried by each work unit.
    type Payload;
    /// Value produced on success.
    type Value;

    /// Runs one unit to completion.
    fn run(&self, payload: Self::Payload) -> impl Future<Output = Outcome<Self::Value>> + Send;
}
