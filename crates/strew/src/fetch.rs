//! Outbound HTTP dispatch contract and its unit runner.
//!
//! The HTTP client is consumed as an interface: [`HttpDispatch::perform`]
//! takes one fully described request and returns either a response or a
//! transport failure. Status handling stays with the caller: a 4xx or 5xx is
//! a successful dispatch carrying an unhappy status, not an `Err`.

use crate::{Error, Outcome, UnitRunner};
use async_trait::async_trait;
use core::future::Future;
use core::time::Duration;
use std::sync::Arc;
use tokio::time::timeout;

/// One outbound request: target, extra headers, and the hard deadline.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchSpec {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What came back from the backend: transport succeeded, status included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one outbound HTTP request.
///
/// Object safe so the client can be swapped for a fake in tests. `Err` means
/// the request never produced a response (connection refused, DNS failure,
/// client-side fault); any response, whatever its status, is `Ok`.
#[async_trait]
pub trait HttpDispatch: Send + Sync {
    async fn perform(&self, spec: &FetchSpec) -> Outcome<FetchResponse>;
}

/// [`UnitRunner`] adapter performing one outbound request per unit.
///
/// Each [`FetchSpec`]'s timeout is enforced here as a hard deadline: the
/// dispatch future is dropped when it elapses and the unit resolves with
/// [`Error::DeadlineElapsed`], so a stalled backend cannot pin a worker past
/// the deadline.
pub struct FetchRunner {
    dispatch: Arc<dyn HttpDispatch>,
}

impl FetchRunner {
    pub fn new(dispatch: Arc<dyn HttpDispatch>) -> Self {
        Self { dispatch }
    }
}

impl UnitRunner for FetchRunner {
    type Payload = FetchSpec;
    type Value = FetchResponse;

    fn run(&self, spec: FetchSpec) -> impl Future<Output = Outcome<FetchResponse>> + Send {
        let dispatch = Arc::clone(&self.dispatch);
        async move {
            match timeout(spec.timeout, dispatch.perform(&spec)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::DeadlineElapsed {
                    after: spec.timeout,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::sleep;

    /// Replies instantly with a fixed status and the request url as the body.
    struct EchoDispatch {
        status: u16,
    }

    #[async_trait]
    impl HttpDispatch for EchoDispatch {
        async fn perform(&self, spec: &FetchSpec) -> Outcome<FetchResponse> {
            Ok(FetchResponse {
                status: self.status,
                body: format!("echo:{}", spec.url),
            })
        }
    }

    /// Takes far longer than any test deadline; flags if it ever finishes.
    struct StalledDispatch {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HttpDispatch for StalledDispatch {
        async fn perform(&self, _spec: &FetchSpec) -> Outcome<FetchResponse> {
            sleep(Duration::from_secs(30)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(FetchResponse {
                status: 200,
                body: "too late".into(),
            })
        }
    }

    struct RefusedDispatch;

    #[async_trait]
    impl HttpDispatch for RefusedDispatch {
        async fn perform(&self, _spec: &FetchSpec) -> Outcome<FetchResponse> {
            Err(Error::Execution {
                context: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn response_passes_through_with_its_status() {
        let runner = FetchRunner::new(Arc::new(EchoDispatch { status: 200 }));
        let spec = FetchSpec::new("http://backend/search?q=x", Duration::from_secs(1));
        let response = runner.run(spec).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "echo:http://backend/search?q=x");
    }

    #[tokio::test]
    async fn unhappy_status_is_still_a_successful_dispatch() {
        let runner = FetchRunner::new(Arc::new(EchoDispatch { status: 404 }));
        let spec = FetchSpec::new("http://backend/missing", Duration::from_secs(1));
        let response = runner.run(spec).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn transport_failure_is_the_unit_outcome() {
        let runner = FetchRunner::new(Arc::new(RefusedDispatch));
        let spec = FetchSpec::new("http://backend/search", Duration::from_secs(1));
        assert!(matches!(
            runner.run(spec).await,
            Err(Error::Execution { .. })
        ));
    }

    #[tokio::test]
    async fn deadline_drops_the_inflight_request() {
        let finished = Arc::new(AtomicBool::new(false));
        let runner = FetchRunner::new(Arc::new(StalledDispatch {
            finished: Arc::clone(&finished),
        }));

        let deadline = Duration::from_millis(20);
        let spec = FetchSpec::new("http://backend/slow", deadline);
        match runner.run(spec).await {
            Err(Error::DeadlineElapsed { after }) => assert_eq!(after, deadline),
            other => panic!("expected deadline error, got {other:?}"),
        }

        // The dispatch future was dropped at the deadline, not left running.
        sleep(Duration::from_millis(50)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn headers_accumulate_in_order() {
        let spec = FetchSpec::new("http://backend", Duration::from_secs(1))
            .with_header("authorization", "Bearer t")
            .with_header("accept", "application/json");
        assert_eq!(
            spec.headers,
            vec![
                ("authorization".to_string(), "Bearer t".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ]
        );
    }
}
