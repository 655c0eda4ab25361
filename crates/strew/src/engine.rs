//! Inference engine contract and the embedding unit runner.
//!
//! The engine is consumed as an interface: callers submit a job and receive a
//! ticket, then await the ticket's completion. Both steps can fail
//! independently (a refusal at submission and a failure during execution are
//! distinct outcomes), and [`EmbedRunner`] folds the whole sequence into the
//! [`UnitRunner`] contract so one spawned task drives one job end to end.

use crate::{Error, Outcome, UnitRunner};
use async_trait::async_trait;
use core::fmt;
use core::future::Future;
use std::collections::HashMap;
use std::sync::Arc;

/// One embedding job: which engine model to run and the text to embed.
#[derive(Debug, Clone)]
pub struct EmbedSpec {
    pub model: String,
    pub input: String,
}

/// The product of one embedding job.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedOutput {
    /// The embedding vector, in the engine's configured dimension.
    pub vector: Vec<f32>,
    /// Estimated token count of the input, for usage accounting.
    pub tokens: u32,
}

/// Opaque identifier for a submitted job, redeemed via
/// [`InferenceBackend::await_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobTicket(u64);

impl JobTicket {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A finished job, successful or not.
///
/// Completion and success are separate questions: the engine completing a job
/// tells the dispatcher the ticket is spent, and only then does the job's own
/// result say whether inference produced a vector or an error.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    result: Outcome<EmbedOutput>,
}

impl CompletedJob {
    pub fn success(output: EmbedOutput) -> Self {
        Self { result: Ok(output) }
    }

    pub fn failed(error: Error) -> Self {
        Self { result: Err(error) }
    }

    pub fn has_error(&self) -> bool {
        self.result.is_err()
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Consumes the job into the per-unit outcome.
    pub fn into_result(self) -> Outcome<EmbedOutput> {
        self.result
    }
}

impl From<Outcome<EmbedOutput>> for CompletedJob {
    fn from(result: Outcome<EmbedOutput>) -> Self {
        Self { result }
    }
}

/// An inference engine accepting embedding jobs.
///
/// Object safe so engines can be registered and swapped at runtime; the
/// dispatch layer holds engines as `Arc<dyn InferenceBackend>`. `submit`
/// returning `Err` means the engine refused the job (queue saturation,
/// draining); a job that was accepted reports its own failure through the
/// [`CompletedJob`] instead.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Hands one job to the engine, returning the ticket to await.
    async fn submit(&self, spec: EmbedSpec) -> Result<JobTicket, Error>;

    /// Waits until the ticketed job finishes, however it finishes.
    async fn await_completion(&self, ticket: JobTicket) -> CompletedJob;
}

/// Model-name-keyed set of registered engines.
///
/// Built once at startup and injected wherever jobs are dispatched; tests
/// inject registries holding fakes. Resolution failures surface as
/// [`Error::UnknownModel`] before any unit is submitted.
#[derive(Default)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn InferenceBackend>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `engine` under `model`, replacing any previous entry.
    pub fn register(&mut self, model: impl Into<String>, engine: Arc<dyn InferenceBackend>) {
        self.engines.insert(model.into(), engine);
    }

    /// Looks up the engine serving `model`.
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn InferenceBackend>, Error> {
        self.engines
            .get(model)
            .cloned()
            .ok_or_else(|| Error::UnknownModel {
                model: model.to_owned(),
            })
    }

    /// The registered model names, for startup logging.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }
}

/// [`UnitRunner`] adapter driving one embedding job per unit.
///
/// Each unit's payload is one input string; the runner submits it under the
/// configured model and turns the awaited ticket into the unit's outcome.
pub struct EmbedRunner {
    engine: Arc<dyn InferenceBackend>,
    model: String,
}

impl EmbedRunner {
    pub fn new(engine: Arc<dyn InferenceBackend>, model: impl Into<String>) -> Self {
        Self {
            engine,
            model: model.into(),
        }
    }
}

impl UnitRunner for EmbedRunner {
    type Payload = String;
    type Value = EmbedOutput;

    fn run(&self, input: String) -> impl Future<Output = Outcome<EmbedOutput>> + Send {
        let engine = Arc::clone(&self.engine);
        let spec = EmbedSpec {
            model: self.model.clone(),
            input,
        };
        async move {
            let ticket = engine.submit(spec).await?;
            engine.await_completion(ticket).await.into_result()
        }
    }
}
