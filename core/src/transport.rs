//! The network boundary of the client.
//!
//! `TravisClient` never performs I/O itself; it hands each `HttpRequest` to
//! a `Transport`. `UreqTransport` is the default, blocking implementation.
//! Tests and embedders can supply their own.

use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round trip.
///
/// Implementations must return every status code as an `HttpResponse`;
/// only failures to complete the exchange are errors. `timeout` bounds the
/// whole round trip when set.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest, timeout: Option<Duration>)
        -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a shared `ureq::Agent` and its connection
/// pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status codes are data for the client, never transport errors.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, ApiError> {
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(self.agent.get(&request.url), request, timeout).call(),
            (HttpMethod::Post, Some(body)) => {
                prepare(self.agent.post(&request.url), request, timeout).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => {
                prepare(self.agent.post(&request.url), request, timeout).send_empty()
            }
        };

        let mut response = result.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(map_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn prepare<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.config().timeout_global(timeout).build()
}

fn map_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(reason) => {
            debug!(?reason, "transport timed out");
            ApiError::Timeout
        }
        other => ApiError::Transport(other.to_string()),
    }
}
