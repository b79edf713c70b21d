//! HTTP request/response types and the transport trait.

use std::io;

use tokio_util::sync::CancellationToken;

use super::{Body, HttpError};

/// An HTTP request flowing through the pipeline.
///
/// The body is held as buffered bytes so every retry attempt can send its
/// own clone of the request. The optional cancellation token interrupts
/// pipeline sleeps (backoff, delays, polling intervals).
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: http::Method,
    /// Target URL; set by a preparer such as `with_base_url`
    pub url: Option<url::Url>,
    /// HTTP headers to send
    pub headers: http::HeaderMap,
    /// Optional request body
    pub body: Option<Vec<u8>>,
    /// Cancellation signal honored by every pipeline suspension point
    pub cancellation: Option<CancellationToken>,
}

impl HttpRequest {
    /// Creates a new HTTP request with the given method and URL.
    ///
    /// Headers are initialized to an empty map and body is `None`.
    #[must_use]
    pub fn new(method: http::Method, url: url::Url) -> Self {
        Self {
            method,
            url: Some(url),
            ..Self::default()
        }
    }

    /// Creates a GET request to the given URL.
    #[must_use]
    pub fn get(url: url::Url) -> Self {
        Self::new(http::Method::GET, url)
    }

    /// Creates a POST request to the given URL.
    #[must_use]
    pub fn post(url: url::Url) -> Self {
        Self::new(http::Method::POST, url)
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header to the request.
    ///
    /// If the header name already exists, the value is appended
    /// (HTTP headers can have multiple values).
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the URL as a string, or `"<no url>"` when unset.
    #[must_use]
    pub fn url_str(&self) -> &str {
        self.url.as_ref().map_or("<no url>", url::Url::as_str)
    }
}

/// An HTTP response received from a server.
///
/// The response owns its [`Body`] until a closing responder or the caller
/// closes it.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Response body; `None` when the transport produced no body
    pub body: Option<Body>,
}

impl HttpResponse {
    /// Creates a new HTTP response.
    #[must_use]
    pub const fn new(status: http::StatusCode, headers: http::HeaderMap, body: Option<Body>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response with the given status, no headers, and a buffered body.
    #[must_use]
    pub fn with_content(status: http::StatusCode, content: impl Into<Vec<u8>>) -> Self {
        Self::new(
            status,
            http::HeaderMap::new(),
            Some(Body::from_bytes(content)),
        )
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the status line text, e.g. `"202 Accepted"`.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.status.canonical_reason().map_or_else(
            || self.status.as_str().to_string(),
            |reason| format!("{} {reason}", self.status.as_str()),
        )
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns `true` if the body exists and has not been closed.
    #[must_use]
    pub fn body_is_open(&self) -> bool {
        self.body.as_ref().is_some_and(Body::is_open)
    }

    /// Closes the body if there is one.
    ///
    /// Close failures are logged and ignored; a failed close is never fatal.
    pub fn close_body(&mut self) {
        if let Some(body) = self.body.as_mut() {
            if let Err(e) = body.close() {
                tracing::warn!("Failed to close response body: {e}");
            }
        }
    }

    /// Reads the whole body, closes it, and puts back a detached copy.
    ///
    /// After this call the caller can still read the same bytes from
    /// [`body`](Self::body), whatever later steps do to it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the body cannot be read.
    pub fn buffer_body(&mut self) -> io::Result<Vec<u8>> {
        let Some(body) = self.body.as_mut() else {
            return Ok(Vec::new());
        };

        let content = body.read_to_end()?;
        if let Err(e) = body.close() {
            tracing::warn!("Failed to close buffered response body: {e}");
        }
        self.body = Some(Body::detached(content.clone()));
        Ok(content)
    }
}

/// Trait for making HTTP requests.
///
/// # Design
///
/// This trait abstracts the HTTP client implementation, enabling:
/// - Dependency injection for testing with mock clients
/// - Swapping HTTP libraries without changing calling code
/// - Plugging the transport into the decorator pipeline via
///   [`transport`](super::transport)
///
/// # Example
///
/// ```ignore
/// use restwire::pipeline::{HttpClient, HttpError, HttpRequest, HttpResponse};
///
/// struct MockClient;
///
/// impl HttpClient for MockClient {
///     async fn request(&self, _req: HttpRequest) -> Result<HttpResponse, HttpError> {
///         Ok(HttpResponse::with_content(http::StatusCode::OK, "{}"))
///     }
/// }
/// ```
pub trait HttpClient: Send + Sync {
    /// Sends an HTTP request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when:
    /// - Network connection fails ([`HttpError::Connection`])
    /// - Request times out ([`HttpError::Timeout`])
    /// - URL is missing or invalid ([`HttpError::InvalidUrl`])
    fn request(
        &self,
        req: HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, HttpError>> + Send;
}
