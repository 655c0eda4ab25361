//! Built-in deterministic embedding engine.
//!
//! Produces repeatable embeddings with no external dependencies, which keeps
//! the binary self-contained and runnable; real engines plug in through
//! [`InferenceBackend`]. Each input is tokenized on non-alphanumeric
//! boundaries and every token is FNV-1a hashed into a signed bucket; the
//! resulting vector is L2-normalized.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use strew::{CompletedJob, EmbedOutput, EmbedSpec, Error, InferenceBackend, JobTicket};

/// Feature-hashing embedding engine with a fixed output dimension.
///
/// Jobs complete at submission time; the ticket map exists to honor the
/// submit/await split of the engine contract, so callers behave identically
/// against engines that finish asynchronously.
pub struct HashEmbedder {
    dimension: usize,
    next_ticket: AtomicU64,
    completed: Mutex<HashMap<u64, CompletedJob>>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            next_ticket: AtomicU64::new(0),
            completed: Mutex::new(HashMap::new()),
        }
    }

    fn embed(&self, input: &str) -> EmbedOutput {
        let mut vector = vec![0.0f32; self.dimension];

        for token in input
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a_64(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        // An input with no tokens stays the zero vector.
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        EmbedOutput {
            vector,
            tokens: estimate_tokens(input),
        }
    }
}

#[async_trait]
impl InferenceBackend for HashEmbedder {
    async fn submit(&self, spec: EmbedSpec) -> Result<JobTicket, Error> {
        let id = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let output = self.embed(&spec.input);
        self.completed.lock().insert(id, CompletedJob::success(output));
        Ok(JobTicket::new(id))
    }

    async fn await_completion(&self, ticket: JobTicket) -> CompletedJob {
        match self.completed.lock().remove(&ticket.id()) {
            Some(job) => job,
            None => CompletedJob::failed(Error::Execution {
                context: format!("no completed job for {ticket}"),
            }),
        }
    }
}

/// FNV-1a hash of the token bytes.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 14_695_981_039_346_656_037;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1_099_511_628_211);
    }
    hash
}

/// Rough chars/4 token estimate, floored at one token per input.
fn estimate_tokens(input: &str) -> u32 {
    input.chars().count().div_ceil(4).max(1) as u32
}
