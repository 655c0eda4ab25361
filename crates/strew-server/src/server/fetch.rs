//! Reqwest-backed implementation of the outbound HTTP dispatch contract.

use async_trait::async_trait;
use strew::{Error, FetchResponse, FetchSpec, HttpDispatch, Outcome};

/// Upper bound on how much of an upstream body is read and carried back to
/// callers.
const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

/// Performs search dispatches over a shared `reqwest` client.
///
/// Transport failures become [`Error::Execution`] outcomes; any response,
/// whatever its status, passes through so the caller sees the backend's own
/// answer. The per-request timeout comes from the [`FetchSpec`], on top of
/// which the dispatch layer enforces its own hard deadline.
pub struct ReqwestDispatch {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl ReqwestDispatch {
    pub fn new() -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }
}

#[async_trait]
impl HttpDispatch for ReqwestDispatch {
    async fn perform(&self, spec: &FetchSpec) -> Outcome<FetchResponse> {
        let mut request = self.client.get(&spec.url).timeout(spec.timeout);
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request.send().await.map_err(|e| Error::Execution {
            context: format!("transport: {e}"),
        })?;

        let status = response.status().as_u16();
        // The cap bounds the read itself: pull chunks and stop once it is
        // reached rather than buffering the whole body.
        let mut raw: Vec<u8> = Vec::new();
        while raw.len() < self.max_body_bytes {
            let chunk = response.chunk().await.map_err(|e| Error::Execution {
                context: format!("reading response body: {e}"),
            })?;
            match chunk {
                Some(bytes) => raw.extend_from_slice(&bytes),
                None => break,
            }
        }
        let mut body = String::from_utf8_lossy(&raw).into_owned();
        if body.len() > self.max_body_bytes {
            let mut cut = self.max_body_bytes;
            while cut > 0 && !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            tracing::debug!("Truncated upstream body to {cut} bytes");
        }

        Ok(FetchResponse { status, body })
    }
}
