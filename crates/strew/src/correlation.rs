//! Correlation identifiers threaded through batches and their units.

use core::fmt;
use uuid::Uuid;

/// Opaque identifier attached to a batch and derived per unit for log
/// correlation. It is never used for routing, ordering, or deduplication;
/// batch/unit association is positional.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derives the identifier for the unit at `index` within this batch.
    pub fn unit(&self, index: usize) -> CorrelationId {
        CorrelationId(format!("{}-batch-{}", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Adopts a caller-supplied identifier (e.g. an inbound request id header).
impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
