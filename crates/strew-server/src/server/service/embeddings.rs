//! `POST /v1/embeddings` - batched embedding fan-out.
//!
//! Validates the batch, fans one task out per input through the unbounded
//! dispatcher, and gathers the vectors back in input order. The fan-in is
//! fail-fast: the first failing input decides the response and the remaining
//! vectors are discarded, never partially returned.

use crate::server::{
    error::ApiResult,
    service::{AppState, REQUEST_ID_HEADER, correlation_from},
    telemetry::{
        decrement_units_inflight, increment_requests, increment_unit_failures,
        increment_units_inflight, record_batch_duration, record_units_per_batch,
    },
};
use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use strew::{Batch, EmbedRunner, Error, gather_ordered, spawn_units};

/// One input string or an ordered batch of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbedInput {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub input: EmbedInput,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingRow {
    pub object: &'static str,
    pub index: usize,
    pub embedding: Vec<f32>,
    pub tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingsResponse {
    pub object: &'static str,
    pub data: Vec<EmbeddingRow>,
    pub model: String,
    pub usage: Usage,
}

/// Handles one embedding request end to end.
///
/// Emits telemetry for request rate, batch size, units in flight, and batch
/// duration; failures surface as a single structured error naming the first
/// failing input's index.
pub async fn create_embeddings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<EmbeddingsRequest>,
) -> ApiResult<impl IntoResponse> {
    increment_requests();
    let start = Instant::now();

    let inputs = match request.input {
        EmbedInput::One(input) => vec![input],
        EmbedInput::Many(inputs) => inputs,
    };

    if inputs.is_empty() {
        return Err(Error::InvalidRequest {
            reason: "input must contain at least one entry".into(),
        }
        .into());
    }
    if inputs.len() > state.config.max_batch_size {
        return Err(Error::InvalidRequest {
            reason: format!(
                "input holds {} entries, exceeding the maximum of {}",
                inputs.len(),
                state.config.max_batch_size
            ),
        }
        .into());
    }
    if let Some(position) = inputs.iter().position(|input| input.is_empty()) {
        return Err(Error::InvalidRequest {
            reason: format!("input {position} is empty"),
        }
        .into());
    }

    let engine = state.registry.resolve(&request.model)?;

    let correlation = correlation_from(&headers);
    let batch = Batch::with_correlation(correlation.clone(), inputs)?;
    let units = batch.len();
    record_units_per_batch(units as f64);
    increment_units_inflight(units as u64);

    let runner = Arc::new(EmbedRunner::new(engine, request.model.clone()));
    let gathered = gather_ordered(spawn_units(&runner, batch)).await;
    decrement_units_inflight(units as u64);

    let outputs = match gathered {
        Ok(outputs) => outputs,
        Err(err) => {
            increment_unit_failures();
            tracing::warn!(correlation = %correlation, "Batch failed: {err}");
            return Err(err.into());
        }
    };

    let mut prompt_tokens = 0u32;
    let data: Vec<EmbeddingRow> = outputs
        .into_iter()
        .enumerate()
        .map(|(index, output)| {
            prompt_tokens += output.tokens;
            EmbeddingRow {
                object: "embedding",
                index,
                embedding: output.vector,
                tokens: output.tokens,
            }
        })
        .collect();

    record_batch_duration(start.elapsed().as_millis() as f64);

    let response = EmbeddingsResponse {
        object: "list",
        data,
        model: request.model,
        usage: Usage {
            prompt_tokens,
            total_tokens: prompt_tokens,
        },
    };
    Ok((
        AppendHeaders([(REQUEST_ID_HEADER, correlation.to_string())]),
        Json(response),
    ))
}
