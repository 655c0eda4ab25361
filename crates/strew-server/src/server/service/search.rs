//! `POST /v1/search` - pass-through dispatch to the search backend.
//!
//! Each request becomes one unit on the bounded worker pool, so concurrent
//! outbound search calls never exceed the configured worker count and excess
//! load is refused at the queue instead of piling up.

use crate::server::{
    error::{ApiError, ApiResult},
    service::{AppState, REQUEST_ID_HEADER, correlation_from},
    telemetry::{increment_queue_rejections, increment_requests},
};
use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use strew::{Error, FetchSpec};

/// Slack on top of the dispatch deadline before the caller-side wait gives
/// up. Covers time a unit spends queued behind busy workers.
const JOIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Overrides the configured default timeout.
    pub timeout_seconds: Option<u64>,
}

/// The backend's answer, status included; 4xx/5xx pass through unchanged.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: u16,
    pub body: String,
}

pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> ApiResult<impl IntoResponse> {
    increment_requests();

    if request.query.trim().is_empty() {
        return Err(Error::InvalidRequest {
            reason: "query must not be empty".into(),
        }
        .into());
    }
    if request.timeout_seconds == Some(0) {
        return Err(Error::InvalidRequest {
            reason: "timeout_seconds must be greater than 0".into(),
        }
        .into());
    }

    let timeout = request
        .timeout_seconds
        .map(Duration::from_secs)
        .unwrap_or(state.config.search_timeout);

    let mut url = state.config.search_backend_url.clone();
    url.query_pairs_mut().append_pair("q", &request.query);
    let mut spec = FetchSpec::new(String::from(url), timeout);
    if let Some(token) = &state.config.search_bearer_token {
        spec = spec.with_header("authorization", format!("Bearer {token}"));
    }

    let correlation = correlation_from(&headers);
    let handle = state
        .search_pool
        .submit(spec, correlation.clone())
        .map_err(|err| {
            if matches!(err, Error::QueueFull { .. }) {
                increment_queue_rejections();
            }
            ApiError(err)
        })?;

    let response = handle.join_timeout(timeout + JOIN_GRACE).await?;

    Ok((
        AppendHeaders([(REQUEST_ID_HEADER, correlation.to_string())]),
        Json(SearchResponse {
            status: response.status,
            body: response.body,
        }),
    ))
}
