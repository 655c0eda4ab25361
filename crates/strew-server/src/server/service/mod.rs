//! Route handlers and router assembly.
//!
//! This module contains the client-facing HTTP surface: request validation,
//! dispatch to the embedding and search backends, and response shaping.
//!
//! ## Structure
//!
//! - [`embeddings`] - `POST /v1/embeddings`, batched fan-out to the engine.
//! - [`search`] - `POST /v1/search`, pass-through dispatch over the pool.
//! - [`health`] - `GET /health` liveness probe.

pub mod embeddings;
pub mod health;
pub mod search;

#[cfg(test)]
mod tests;

use crate::server::config::ServerConfig;
use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use std::sync::Arc;
use strew::{CorrelationId, EngineRegistry, FetchRunner, WorkerPool};
use tower_http::cors::{Any, CorsLayer};

/// Response and request header carrying the batch correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<EngineRegistry>,
    pub search_pool: Arc<WorkerPool<FetchRunner>>,
}

/// Assembles the service router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/embeddings", post(embeddings::create_embeddings))
        .route("/v1/search", post(search::search))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Adopts the caller's request id when present, otherwise mints a fresh one.
pub(crate) fn correlation_from(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(CorrelationId::from)
        .unwrap_or_default()
}
