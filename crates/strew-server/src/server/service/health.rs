//! `GET /health` - liveness probe.

use crate::server::service::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// Reports `ok` while serving and `shutting_down` once drain has begun, so
/// load balancers stop routing before the listener closes.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.search_pool.is_shutdown() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "shutting_down" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    }
}
