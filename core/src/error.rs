//! Error types for the Travis CI client.
//!
//! # Design
//! A non-2xx status is not an error here: it reaches the caller as data in
//! `ApiResponse::response`. `ApiError` only covers failures that leave the
//! caller without a usable exchange: invalid input caught before any I/O,
//! transport failures, cancellation, and bodies that do not match the
//! expected envelope. `Decode` keeps the raw response so status and headers
//! can still be inspected.

use std::time::Duration;

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors returned by `TravisClient` and the resource services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input was rejected before any network call.
    #[error("invalid options: {0}")]
    Validation(String),

    /// The base URL or a resource path could not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport failed to complete the round trip.
    #[error("transport error: {0}")]
    Transport(String),

    /// The context deadline passed, or the transport timed out.
    #[error("request timed out")]
    Timeout,

    /// The context was cancelled before the round trip finished.
    #[error("request cancelled")]
    Cancelled,

    /// The response body does not match the expected JSON shape.
    #[error("deserialization failed (HTTP {}): {message}", .response.status)]
    Decode {
        message: String,
        response: Box<HttpResponse>,
    },
}

impl ApiError {
    /// The raw response that accompanied the error, if the round trip
    /// completed.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::Decode { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Whether the error was raised before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApiError::Validation(_) | ApiError::InvalidUrl(_) | ApiError::Serialization(_)
        )
    }

    pub(crate) fn timeout_after(elapsed: Duration) -> Self {
        tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "context deadline exceeded");
        ApiError::Timeout
    }
}
