//! Service conventions layered on the pipeline.
//!
//! This module provides:
//! - Structured service errors ([`RequestError`], [`with_error_unless_status_code`])
//! - Client and request id headers ([`with_client_id`], [`extract_request_id`])
//! - Token file persistence ([`Token`], [`load_token`], [`save_token`])

mod error;
mod token;


pub use error::{RequestError, ServiceError, is_service_error, with_error_unless_status_code};
pub use token::{Token, TokenError, load_token, save_token};

use crate::pipeline::{HttpResponse, PrepareDecorator, preparer};

/// Client-generated id echoed back by the service.
pub const HEADER_CLIENT_ID: &str = "x-ms-client-request-id";

/// Asks the service to echo [`HEADER_CLIENT_ID`] on the response.
pub const HEADER_RETURN_CLIENT_ID: &str = "x-ms-return-client-request-id";

/// Service-generated id of the request.
pub const HEADER_REQUEST_ID: &str = "x-ms-request-id";

/// Sets the client request id header.
#[must_use]
pub fn with_client_id(id: impl Into<String>) -> PrepareDecorator {
    preparer::with_header(HEADER_CLIENT_ID, id)
}

/// Sets whether the service should echo the client request id.
#[must_use]
pub fn with_return_client_id(returns: bool) -> PrepareDecorator {
    preparer::with_header(HEADER_RETURN_CLIENT_ID, returns.to_string())
}

/// Sets the client request id and asks the service to echo it.
#[must_use]
pub fn with_returning_client_id(id: impl Into<String>) -> PrepareDecorator {
    let id = with_client_id(id);
    let returns = with_return_client_id(true);
    PrepareDecorator::new(move |next| id.decorate(returns.decorate(next)))
}

/// Returns the echoed client request id, if any.
#[must_use]
pub fn extract_client_id(response: &HttpResponse) -> Option<&str> {
    response.header(HEADER_CLIENT_ID)
}

/// Returns the service request id, if any.
#[must_use]
pub fn extract_request_id(response: &HttpResponse) -> Option<&str> {
    response.header(HEADER_REQUEST_ID)
}
