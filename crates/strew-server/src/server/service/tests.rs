use super::{AppState, REQUEST_ID_HEADER, router};
use crate::server::config::ServerConfig;
use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use core::time::Duration;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use strew::{
    CompletedJob, CorrelationId, EmbedOutput, EmbedSpec, EngineRegistry, Error, FetchResponse,
    FetchRunner, FetchSpec, HttpDispatch, InferenceBackend, JobTicket, Outcome, PoolConfig,
    WorkerPool,
};
use tokio::sync::Notify;
use tokio::time::timeout;
use tower::ServiceExt;

/// Embeds each input as a 4-wide vector of its byte length; one token per
/// character. Inputs containing "boom" fail at completion.
struct FakeEngine {
    next: AtomicU64,
    jobs: Mutex<HashMap<u64, CompletedJob>>,
}

impl FakeEngine {
    fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl InferenceBackend for FakeEngine {
    async fn submit(&self, spec: EmbedSpec) -> Result<JobTicket, Error> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        let job = if spec.input.contains("boom") {
            CompletedJob::failed(Error::Execution {
                context: format!("induced failure for {:?}", spec.input),
            })
        } else {
            CompletedJob::success(EmbedOutput {
                vector: vec![spec.input.len() as f32; 4],
                tokens: spec.input.chars().count() as u32,
            })
        };
        self.jobs.lock().unwrap().insert(id, job);
        Ok(JobTicket::new(id))
    }

    async fn await_completion(&self, ticket: JobTicket) -> CompletedJob {
        self.jobs
            .lock()
            .unwrap()
            .remove(&ticket.id())
            .unwrap_or_else(|| {
                CompletedJob::failed(Error::Execution {
                    context: "missing job".into(),
                })
            })
    }
}

#[derive(Default)]
struct Gate {
    started: Notify,
    release: Notify,
}

/// Answers with a fixed status and the dispatched url in the body; when
/// gated, blocks inside the dispatch until the test releases it.
struct FakeSearchDispatch {
    status: u16,
    gate: Option<Arc<Gate>>,
}

#[async_trait]
impl HttpDispatch for FakeSearchDispatch {
    async fn perform(&self, spec: &FetchSpec) -> Outcome<FetchResponse> {
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        Ok(FetchResponse {
            status: self.status,
            body: format!("results for {}", spec.url),
        })
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        server_addr: "127.0.0.1:0".into(),
        search_workers: 1,
        search_queue_depth: 8,
        search_backend_url: "http://127.0.0.1:9/search".parse().unwrap(),
        search_bearer_token: None,
        search_timeout: Duration::from_secs(1),
        embed_model: "m1".into(),
        embed_dim: 4,
        max_batch_size: 4,
        shutdown_timeout: Duration::from_secs(1),
    }
}

fn test_state(config: ServerConfig, dispatch: Arc<dyn HttpDispatch>) -> AppState {
    let mut registry = EngineRegistry::new();
    registry.register(
        config.embed_model.clone(),
        Arc::new(FakeEngine::new()) as Arc<dyn InferenceBackend>,
    );
    let search_pool = WorkerPool::start(
        PoolConfig::new(config.search_workers, config.search_queue_depth)
            .with_shutdown_timeout(config.shutdown_timeout),
        FetchRunner::new(dispatch),
    )
    .unwrap();

    AppState {
        config,
        registry: Arc::new(registry),
        search_pool: Arc::new(search_pool),
    }
}

fn echo_state() -> AppState {
    test_state(
        test_config(),
        Arc::new(FakeSearchDispatch {
            status: 200,
            gate: None,
        }),
    )
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn embeddings_return_ordered_vectors_and_usage() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m1", "input": ["a", "bb", "ccc"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let body = body_json(response).await;
    assert_eq!(body["object"], "list");
    assert_eq!(body["model"], "m1");

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    for (i, row) in data.iter().enumerate() {
        assert_eq!(row["object"], "embedding");
        assert_eq!(row["index"], i as u64);
    }
    assert_eq!(data[1]["embedding"][0], 2.0);
    assert_eq!(body["usage"]["prompt_tokens"], 6);
    assert_eq!(body["usage"]["total_tokens"], 6);
}

#[tokio::test]
async fn single_string_input_is_accepted() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m1", "input": "hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["usage"]["total_tokens"], 5);
}

#[tokio::test]
async fn first_failing_input_names_its_index() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m1", "input": ["ok", "boom here", "fine"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unit_failed");
    assert_eq!(body["index"], 1);
    assert!(body["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m1", "input": [] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn empty_entry_is_rejected_with_its_position() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m1", "input": ["ok", ""] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("input 1"));
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    // max_batch_size is 4 in the test config.
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m1", "input": ["a", "b", "c", "d", "e"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/embeddings",
            json!({ "model": "m2", "input": ["x"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "unknown_model");
}

#[tokio::test]
async fn inbound_request_id_is_adopted() {
    let app = router(echo_state());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/embeddings")
        .header(header::CONTENT_TYPE, "application/json")
        .header(REQUEST_ID_HEADER, "req-123")
        .body(Body::from(
            json!({ "model": "m1", "input": "x" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
}

#[tokio::test]
async fn search_passes_the_backend_answer_through() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json("/v1/search", json!({ "query": "rust" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], 200);
    assert!(body["body"].as_str().unwrap().contains("q=rust"));
}

#[tokio::test]
async fn upstream_error_statuses_pass_through_as_payload() {
    let state = test_state(
        test_config(),
        Arc::new(FakeSearchDispatch {
            status: 404,
            gate: None,
        }),
    );
    let response = router(state)
        .oneshot(post_json("/v1/search", json!({ "query": "rust" })))
        .await
        .unwrap();

    // Transport succeeded, so the route answers 200 and carries the
    // backend's own status in the payload.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], 404);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json("/v1/search", json!({ "query": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zero_timeout_is_rejected() {
    let app = router(echo_state());
    let response = app
        .oneshot(post_json(
            "/v1/search",
            json!({ "query": "rust", "timeout_seconds": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn saturated_queue_refuses_with_429() {
    let gate = Arc::new(Gate::default());
    let dispatch = Arc::new(FakeSearchDispatch {
        status: 200,
        gate: Some(Arc::clone(&gate)),
    });
    let mut config = test_config();
    config.search_queue_depth = 1;
    // Generous dispatch deadline so the gated units cannot time out while
    // the test holds them.
    config.search_timeout = Duration::from_secs(5);
    let state = test_state(config, dispatch);

    // One request occupies the single worker inside the gated dispatch.
    let busy = tokio::spawn(
        router(state.clone()).oneshot(post_json("/v1/search", json!({ "query": "one" }))),
    );
    timeout(Duration::from_secs(1), gate.started.notified())
        .await
        .expect("first dispatch never started");

    // A direct submission occupies the only queue slot, deterministically.
    let parked = state
        .search_pool
        .submit(
            FetchSpec::new("http://backend/parked", Duration::from_secs(1)),
            CorrelationId::new(),
        )
        .unwrap();

    // The next request through the route finds the queue full.
    let refused = router(state.clone())
        .oneshot(post_json("/v1/search", json!({ "query": "three" })))
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(refused).await["error"], "queue_full");

    // Unwind: release the worker for both pending units.
    gate.release.notify_one();
    let first = busy.await.unwrap().unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    timeout(Duration::from_secs(1), gate.started.notified())
        .await
        .expect("queued dispatch never started");
    gate.release.notify_one();
    assert!(parked.join().await.is_ok());
}

#[tokio::test]
async fn requests_after_shutdown_are_unavailable() {
    let state = echo_state();
    state.search_pool.shutdown().await;

    let response = router(state.clone())
        .oneshot(post_json("/v1/search", json!({ "query": "late" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "service_shutdown");

    let health = router(state)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(health).await["status"], "shutting_down");
}

#[tokio::test]
async fn health_reports_ok_while_serving() {
    let response = router(echo_state())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
