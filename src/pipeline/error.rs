//! Error types for the prepare, send, and respond stages.

use std::sync::Arc;

use thiserror::Error;

use crate::service::RequestError;
use crate::time::Cancelled;

use super::HttpResponse;

/// Error type for HTTP transport operations.
///
/// Describes what went wrong without dictating recovery strategy.
/// The retry decorators treat every variant as a failed attempt.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed.
    ///
    /// This includes DNS resolution failures, connection refused,
    /// and other network-level errors.
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request timed out.
    ///
    /// The server did not respond within the configured timeout period.
    #[error("Request timed out")]
    Timeout,

    /// The request URL is missing or invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Error raised while preparing a request.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// A URL could not be parsed or joined.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL or path
        url: String,
        /// Parser message
        reason: String,
    },

    /// A path or query step ran before any base URL was set.
    #[error("Request has no URL to modify")]
    MissingUrl,

    /// A header name was rejected.
    #[error("Invalid header name '{name}'")]
    InvalidHeaderName {
        /// The offending header name
        name: String,
    },

    /// A header value was rejected.
    #[error("Invalid value for header '{name}'")]
    InvalidHeaderValue {
        /// The header name
        name: String,
    },

    /// The request body could not be serialized.
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),

    /// An authorizer could not produce credentials.
    #[error("Authorization failed: {0}")]
    Authorization(String),
}

/// Error raised by a sender chain.
///
/// Transport failures and status-code validation failures travel the same
/// path so the retry decorators can treat them alike. When an error carries a
/// response, the response (and its body) moves with the error.
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The response status code was rejected by a validating decorator.
    #[error("{method} {url} failed with {status}")]
    UnexpectedStatus {
        /// Request method
        method: http::Method,
        /// Request URL
        url: String,
        /// The rejected status code
        status: http::StatusCode,
        /// The rejected response; its body is open unless a closing decorator ran
        response: Box<HttpResponse>,
    },

    /// A follow-up request could not be prepared.
    #[error("Failed to prepare request: {0}")]
    Prepare(#[from] PrepareError),

    /// A response that required polling carried no usable location.
    #[error("Location header missing from response that requires polling ({status})")]
    MissingPollingLocation {
        /// Status of the response that required polling
        status: http::StatusCode,
    },

    /// The request's cancellation token fired during a pipeline sleep.
    #[error("Request cancelled")]
    Cancelled,
}

impl From<Cancelled> for SendError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl SendError {
    /// Creates an `UnexpectedStatus` error that takes ownership of `response`.
    #[must_use]
    pub fn unexpected_status(
        method: http::Method,
        url: impl Into<String>,
        response: HttpResponse,
    ) -> Self {
        Self::UnexpectedStatus {
            method,
            url: url.into(),
            status: response.status,
            response: Box::new(response),
        }
    }

    /// Returns the response carried by this error, if any.
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::UnexpectedStatus { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Returns the carried response mutably, if any.
    pub fn response_mut(&mut self) -> Option<&mut HttpResponse> {
        match self {
            Self::UnexpectedStatus { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Consumes the error, returning the carried response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            Self::UnexpectedStatus { response, .. } => Some(*response),
            _ => None,
        }
    }

    /// Closes the body of the carried response, if any.
    pub fn close_response(&mut self) {
        if let Some(response) = self.response_mut() {
            response.close_body();
        }
    }

    /// Returns `true` for cancellation, which always ends a retry loop.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error raised by a responder chain.
#[derive(Debug, Error)]
pub enum RespondError {
    /// The service returned a structured error.
    #[error(transparent)]
    Service(Box<RequestError>),

    /// The status code was not among the accepted codes.
    #[error("Unexpected response status {0}")]
    UnexpectedStatus(http::StatusCode),

    /// The body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(#[source] std::io::Error),

    /// The body could not be decoded into the target type.
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<RequestError> for RespondError {
    fn from(e: RequestError) -> Self {
        Self::Service(Box::new(e))
    }
}

impl RespondError {
    /// Returns the structured service error, if this is one.
    #[must_use]
    pub fn service_error(&self) -> Option<&RequestError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }
}
