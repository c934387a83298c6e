//! The Travis CI client: request construction, the round trip, and
//! envelope decoding.
//!
//! # Design
//! `TravisClient` holds the base URL, the optional API token and a shared
//! `Transport`; it keeps no mutable state between calls and is cheap to
//! clone. `new_request` builds an `HttpRequest` without I/O. `execute` runs
//! one round trip under a `Context`, returning as soon as the context is
//! cancelled or expires, and decodes the body only when the status is 2xx.
//! A non-2xx status is returned as data: the caller gets an
//! `ApiResponse` with no value and the untouched response, never an error.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::builds::BuildsService;
use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::jobs::JobsService;
use crate::requests::RequestsService;
use crate::transport::{Transport, UreqTransport};

/// Media type selecting version 2.1 of the Travis API.
pub const ACCEPT_TRAVIS_V2: &str = "application/vnd.travis-ci.2.1+json";

/// How often a waiting call re-checks its context.
const CONTEXT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The outcome of a completed round trip.
///
/// `value` is `Some` when the server answered 2xx and the body matched the
/// expected envelope, `None` for any other status. The raw `response` is
/// always present so callers can inspect the status code themselves; the
/// client does not decide what a status means.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: Option<T>,
    pub response: HttpResponse,
}

impl<T> ApiResponse<T> {
    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            value: self.value.map(f),
            response: self.response,
        }
    }

    pub fn into_parts(self) -> (Option<T>, HttpResponse) {
        (self.value, self.response)
    }
}

#[derive(Clone)]
pub struct TravisClient {
    base_url: String,
    token: Option<String>,
    user_agent: String,
    timeout: Option<Duration>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for TravisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TravisClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TravisClient {
    /// Client backed by the default `UreqTransport`.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(config, Arc::new(UreqTransport::new()))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported scheme {:?} in {base_url:?}",
                parsed.scheme()
            )));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ApiError::InvalidUrl(format!(
                "base url must not carry a query or fragment: {base_url:?}"
            )));
        }

        Ok(Self {
            base_url,
            token: config.token,
            user_agent: config.user_agent,
            timeout: config.timeout,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn jobs(&self) -> JobsService<'_> {
        JobsService::new(self)
    }

    pub fn builds(&self) -> BuildsService<'_> {
        BuildsService::new(self)
    }

    pub fn requests(&self) -> RequestsService<'_> {
        RequestsService::new(self)
    }

    /// Builds a bodiless request for `path`, which may carry a query string.
    pub fn new_request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, ApiError> {
        let url = self.resolve(path)?;
        Ok(HttpRequest {
            method,
            url,
            headers: self.default_headers(),
            body: None,
        })
    }

    /// Builds a request carrying `body` encoded as JSON.
    pub fn new_json_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut request = self.new_request(method, path)?;
        request
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }

    /// Sends `request` and decodes a 2xx body into `T`.
    pub fn execute<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        request: &HttpRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.execute_raw(ctx, request)?;
        if !response.is_success() {
            return Ok(ApiResponse {
                value: None,
                response,
            });
        }

        match serde_json::from_str::<T>(&response.body) {
            Ok(value) => Ok(ApiResponse {
                value: Some(value),
                response,
            }),
            Err(err) => Err(ApiError::Decode {
                message: err.to_string(),
                response: Box::new(response),
            }),
        }
    }

    /// Sends `request` and returns the response without decoding it.
    pub fn execute_raw(
        &self,
        ctx: &Context,
        request: &HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        ctx.check()?;

        let method = request.method.as_str();
        let url = request.url.as_str();
        let timeout = ctx.round_trip_timeout(self.timeout);
        debug!(
            method,
            url,
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            "sending travis request"
        );

        let started = Instant::now();
        let result = self.round_trip(ctx, request, timeout);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                debug!(
                    method,
                    url,
                    status = response.status,
                    elapsed_ms,
                    "received travis response"
                );
                Ok(response)
            }
            Err(ApiError::Cancelled) => {
                debug!(method, url, elapsed_ms, "travis request cancelled in flight");
                Err(ApiError::Cancelled)
            }
            Err(err) => {
                debug!(method, url, elapsed_ms, error = %err, "travis request failed");
                Err(err)
            }
        }
    }

    /// Runs the transport on a worker thread and waits for it while watching
    /// `ctx`, so a cancel or an elapsed deadline wakes the caller without
    /// waiting for the transport. The result of an abandoned round trip is
    /// dropped when the worker finishes.
    fn round_trip(
        &self,
        ctx: &Context,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, ApiError> {
        let (tx, rx) = mpsc::sync_channel(1);
        let transport = Arc::clone(&self.transport);
        let owned = request.clone();
        thread::Builder::new()
            .name("travis-round-trip".to_string())
            .spawn(move || {
                // Fails only when the caller stopped waiting.
                let _ = tx.send(transport.send(&owned, timeout));
            })
            .map_err(|e| ApiError::Transport(format!("failed to start round trip: {e}")))?;

        loop {
            match rx.recv_timeout(CONTEXT_POLL_INTERVAL) {
                Ok(result) => {
                    // A call cancelled while in flight yields no result.
                    if ctx.is_cancelled() {
                        return Err(ApiError::Cancelled);
                    }
                    return result;
                }
                Err(RecvTimeoutError::Timeout) => ctx.check()?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ApiError::Transport(
                        "transport aborted without a result".to_string(),
                    ));
                }
            }
        }
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let request = self.new_request(HttpMethod::Get, path)?;
        self.execute(ctx, &request)
    }

    /// POSTs to an action endpoint that answers without a meaningful body.
    pub(crate) fn post_action(&self, ctx: &Context, path: &str) -> Result<HttpResponse, ApiError> {
        let request = self.new_request(HttpMethod::Post, path)?;
        self.execute_raw(ctx, &request)
    }

    fn resolve(&self, path: &str) -> Result<String, ApiError> {
        if !path.starts_with('/') {
            return Err(ApiError::InvalidUrl(format!("path must be absolute: {path:?}")));
        }
        let raw = format!("{}{}", self.base_url, path);
        let url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw:?}: {e}")))?;
        Ok(url.into())
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("accept".to_string(), ACCEPT_TRAVIS_V2.to_string()),
            ("user-agent".to_string(), self.user_agent.clone()),
        ];
        if let Some(token) = &self.token {
            headers.push(("authorization".to_string(), format!("token {token}")));
        }
        headers
    }
}
