//! A reusable bundle of pipeline settings.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tokio_util::sync::CancellationToken;

use super::retry::{self, Budget};
use super::{
    Authorizer, DynSender, HttpClient, HttpRequest, HttpResponse, NullAuthorizer,
    PrepareDecorator, PrepareError, SendDecorator, SendResult, polling, preparer, sender,
};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("restwire/", env!("CARGO_PKG_VERSION"));

/// Default attempt count for [`Client::execute`].
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default base backoff for [`Client::execute`].
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Sender, credentials, and timing settings shared by many requests.
///
/// Cloning is cheap; clones share the sender and authorizer.
///
/// # Example
///
/// ```no_run
/// use restwire::pipeline::{BearerAuthorizer, Client, HttpRequest, ReqwestClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::from_http_client(ReqwestClient::new())
///     .with_authorizer(BearerAuthorizer::new("token"))
///     .with_user_agent("my-tool/1.0");
///
/// let request = HttpRequest::get(url::Url::parse("https://example.com/jobs")?);
/// let response = client.execute(request).await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    sender: DynSender,
    authorizer: Arc<dyn Authorizer>,
    user_agent: String,
    request_inspectors: Vec<PrepareDecorator>,
    retry_attempts: u32,
    retry_backoff: Duration,
    polling_delay: Duration,
    polling_duration: Duration,
    polling_codes: Vec<StatusCode>,
}

impl Client {
    /// Creates a client around a sender chain, with default settings.
    #[must_use]
    pub fn new(sender: DynSender) -> Self {
        Self {
            sender,
            authorizer: Arc::new(NullAuthorizer),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_inspectors: Vec::new(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            polling_delay: polling::DEFAULT_POLLING_DELAY,
            polling_duration: polling::DEFAULT_POLLING_DURATION,
            polling_codes: polling::DEFAULT_POLLING_CODES.to_vec(),
        }
    }

    /// Creates a client that sends through `client`.
    #[must_use]
    pub fn from_http_client<C: HttpClient + 'static>(client: C) -> Self {
        Self::new(sender::transport(client))
    }

    /// Sets the authorizer applied to every request.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Sets the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a preparer that runs on every request, polls included.
    #[must_use]
    pub fn with_request_inspector(mut self, inspector: PrepareDecorator) -> Self {
        self.request_inspectors.push(inspector);
        self
    }

    /// Sets the retry budget used by [`execute`](Self::execute).
    #[must_use]
    pub const fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }

    /// Sets the default polling delay and the total polling budget.
    #[must_use]
    pub const fn with_polling(mut self, delay: Duration, duration: Duration) -> Self {
        self.polling_delay = delay;
        self.polling_duration = duration;
        self
    }

    /// Sets the status codes that mean "still running".
    #[must_use]
    pub fn with_polling_codes(mut self, codes: impl Into<Vec<StatusCode>>) -> Self {
        self.polling_codes = codes.into();
        self
    }

    /// The configured user agent.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The configured retry attempts.
    #[must_use]
    pub const fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// The configured default polling delay.
    #[must_use]
    pub const fn polling_delay(&self) -> Duration {
        self.polling_delay
    }

    /// The configured polling budget.
    #[must_use]
    pub const fn polling_duration(&self) -> Duration {
        self.polling_duration
    }

    /// Applies credentials, the user agent, and the request inspectors.
    ///
    /// # Errors
    ///
    /// Returns the first [`PrepareError`] raised by a step.
    pub fn prepare_request(&self, request: HttpRequest) -> Result<HttpRequest, PrepareError> {
        self.inspect(preparer::prepare(
            request,
            [self.authorizer.with_authorization()],
        )?)
    }

    fn inspect(&self, request: HttpRequest) -> Result<HttpRequest, PrepareError> {
        let user_agent = preparer::with_header(http::header::USER_AGENT.as_str(), &self.user_agent);
        preparer::prepare(
            request,
            std::iter::once(user_agent).chain(self.request_inspectors.iter().cloned()),
        )
    }

    /// Prepares `request` and sends it through the client's sender wrapped
    /// with `decorators`.
    ///
    /// # Errors
    ///
    /// Returns a preparation error or whatever the decorated chain returns.
    pub async fn send(
        &self,
        request: HttpRequest,
        decorators: impl IntoIterator<Item = SendDecorator>,
    ) -> SendResult {
        let request = self.prepare_request(request)?;
        sender::send_with_sender(Arc::clone(&self.sender), request, decorators).await
    }

    /// Returns `true` if `response` reports a still-running operation.
    #[must_use]
    pub fn should_poll(&self, response: &HttpResponse) -> bool {
        polling::response_requires_polling(response, &self.polling_codes)
    }

    /// Polls the operation `response` accepted, or returns `response` as is
    /// when it needs no polling.
    ///
    /// The first poll waits for the response's `Retry-After` hint, or the
    /// configured delay.
    ///
    /// # Errors
    ///
    /// See [`polling::poll_for_duration`]; additionally a missing or invalid
    /// polling location.
    pub async fn poll_as_needed(
        &self,
        mut response: HttpResponse,
        cancellation: Option<CancellationToken>,
    ) -> SendResult {
        if !self.should_poll(&response) {
            return Ok(response);
        }

        let first_delay = polling::get_polling_delay(&response, self.polling_delay);
        let request =
            polling::new_polling_request_with_cancellation(&mut response, self, cancellation)?;
        let request = self.inspect(request)?;

        polling::poll(
            self.sender.as_ref(),
            request,
            first_delay,
            self.polling_delay,
            Budget::Duration(self.polling_duration),
            &self.polling_codes,
        )
        .await
    }

    /// Sends with the configured retry budget, then polls if needed.
    ///
    /// # Errors
    ///
    /// Returns the send error after retries run out, or any polling error.
    pub async fn execute(&self, request: HttpRequest) -> SendResult {
        let cancellation = request.cancellation.clone();
        let response = self
            .send(
                request,
                [retry::do_retry_for_attempts(
                    self.retry_attempts,
                    self.retry_backoff,
                )],
            )
            .await?;
        self.poll_as_needed(response, cancellation).await
    }
}

impl Authorizer for Client {
    fn with_authorization(&self) -> PrepareDecorator {
        self.authorizer.with_authorization()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("user_agent", &self.user_agent)
            .field("request_inspectors", &self.request_inspectors.len())
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .field("polling_delay", &self.polling_delay)
            .field("polling_duration", &self.polling_duration)
            .field("polling_codes", &self.polling_codes)
            .finish_non_exhaustive()
    }
}
