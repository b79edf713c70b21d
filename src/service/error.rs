//! Structured service errors decoded from failure responses.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::pipeline::polling::HEADER_RETRY_AFTER;
use crate::pipeline::responder::responder;
use crate::pipeline::{HttpResponse, RespondDecorator, RespondError};

use super::extract_request_id;

const PACKAGE: &str = "restwire";

/// The `error` object of a service failure body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable description
    #[serde(default)]
    pub message: String,
    /// Service-specific extra information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code={:?} Message={:?}", self.code, self.message)?;
        if let Some(details) = &self.details {
            let details = serde_json::to_string(details).map_err(|_| fmt::Error)?;
            write!(f, " Details={details}")?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: ServiceError,
}

/// A failed request, described in service terms.
///
/// Built either from a decoded failure body (see
/// [`with_error_unless_status_code`]) or by wrapping an arbitrary error with
/// [`RequestError::with_error`]. Immutable once built.
#[derive(Debug, Clone)]
pub struct RequestError {
    package_type: String,
    method: String,
    message: String,
    status_code: Option<StatusCode>,
    request_id: Option<String>,
    retry_after: Option<Duration>,
    service_error: Option<ServiceError>,
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl RequestError {
    /// Creates an error with no response information.
    #[must_use]
    pub fn new(
        package_type: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            package_type: package_type.into(),
            method: method.into(),
            message: message.into(),
            status_code: None,
            request_id: None,
            retry_after: None,
            service_error: None,
            source: None,
        }
    }

    /// Wraps `original`, recording the status and ids of `response`.
    ///
    /// If `original` already is a `RequestError` it is returned unchanged.
    #[must_use]
    pub fn with_error(
        original: Box<dyn Error + Send + Sync>,
        package_type: impl Into<String>,
        method: impl Into<String>,
        response: Option<&HttpResponse>,
        message: impl Into<String>,
    ) -> Self {
        let original = match original.downcast::<Self>() {
            Ok(existing) => return *existing,
            Err(other) => other,
        };

        let mut error = Self::new(package_type, method, message);
        if let Some(response) = response {
            error.record_response(response);
        }
        error.source = Some(Arc::from(original));
        error
    }

    fn from_service_error(response: &HttpResponse, service_error: ServiceError) -> Self {
        let mut error = Self::new(PACKAGE, "with_error_unless_status_code", "service error");
        error.record_response(response);
        error.service_error = Some(service_error);
        error
    }

    fn record_response(&mut self, response: &HttpResponse) {
        self.status_code = Some(response.status);
        self.request_id = extract_request_id(response).map(str::to_string);
        self.retry_after = response
            .header(HEADER_RETRY_AFTER)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
    }

    /// Status code of the failed response, if one was received.
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        self.status_code
    }

    /// The `x-ms-request-id` of the failed response.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// The `Retry-After` hint of the failed response.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// The decoded service error, if the body had one.
    #[must_use]
    pub const fn service_error(&self) -> Option<&ServiceError> {
        self.service_error.as_ref()
    }

    /// Name of the package that raised the error.
    #[must_use]
    pub fn package_type(&self) -> &str {
        &self.package_type
    }

    /// Name of the operation that raised the error.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Free-form description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .status_code
            .map_or_else(|| "unknown".to_string(), |s| s.as_u16().to_string());

        if let Some(service_error) = &self.service_error {
            return write!(
                f,
                "Service returned an error. Status={status} {service_error}"
            );
        }

        write!(
            f,
            "{}#{}: {}: StatusCode={status}",
            self.package_type, self.method, self.message
        )?;
        if let Some(source) = &self.source {
            write!(f, " -- Original Error: {source}")?;
        }
        Ok(())
    }
}

impl Error for RequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Returns `true` if `err` or any error in its source chain is a
/// [`RequestError`].
#[must_use]
pub fn is_service_error(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<RequestError>()
            || e.is::<Box<RequestError>>()
            || e.downcast_ref::<RespondError>()
                .is_some_and(|r| r.service_error().is_some())
        {
            return true;
        }
        current = e.source();
    }
    false
}

/// Decodes a structured service error unless the status is in `ok_codes`.
///
/// - Accepted status: delegates to the next responder.
/// - Other status: buffers the body (a readable copy is put back) and
///   decodes `{"error": {...}}`, or a bare error object. A decoded error
///   becomes [`RespondError::Service`]. A body of any other shape is left
///   for the caller: the chain stops with `Ok(())`.
#[must_use]
pub fn with_error_unless_status_code<'a>(
    ok_codes: impl Into<Vec<StatusCode>>,
) -> RespondDecorator<'a> {
    let ok_codes = ok_codes.into();
    RespondDecorator::new(move |next| {
        responder(move |response| {
            if ok_codes.contains(&response.status) {
                return next.respond(response);
            }

            let content = response.buffer_body().map_err(RespondError::Body)?;
            match decode_service_error(&content) {
                Some(service_error) => {
                    Err(RequestError::from_service_error(response, service_error).into())
                }
                None => {
                    tracing::debug!(
                        "Failure body for status {} is not a service error",
                        response.status
                    );
                    Ok(())
                }
            }
        })
    })
}

fn decode_service_error(content: &[u8]) -> Option<ServiceError> {
    serde_json::from_slice::<ServiceErrorBody>(content)
        .map(|body| body.error)
        .or_else(|_| serde_json::from_slice::<ServiceError>(content))
        .ok()
        .filter(|error| !error.code.is_empty())
}
