//! Batches: ordered payload collections dispatched as one logical request.

use crate::{CorrelationId, Error};

/// An ordered collection of payloads processed as one logical request.
///
/// Position is the contract: the outcome list produced for a batch has the
/// same length and order as the payloads given here, regardless of the order
/// units finish in.
#[derive(Debug, Clone)]
pub struct Batch<P> {
    correlation: CorrelationId,
    payloads: Vec<P>,
}

impl<P> Batch<P> {
    /// Builds a batch under a fresh correlation id, rejecting an empty
    /// payload set.
    pub fn try_new(payloads: Vec<P>) -> Result<Self, Error> {
        Self::with_correlation(CorrelationId::new(), payloads)
    }

    /// Builds a batch under a caller-provided correlation id.
    pub fn with_correlation(
        correlation: CorrelationId,
        payloads: Vec<P>,
    ) -> Result<Self, Error> {
        if payloads.is_empty() {
            return Err(Error::InvalidRequest {
                reason: "batch contains no units".into(),
            });
        }
        Ok(Self {
            correlation,
            payloads,
        })
    }

    pub fn correlation(&self) -> &CorrelationId {
        &self.correlation
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Always false: empty batches are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Consumes the batch into its correlation id and ordered payloads.
    pub fn into_parts(self) -> (CorrelationId, Vec<P>) {
        (self.correlation, self.payloads)
    }
}
