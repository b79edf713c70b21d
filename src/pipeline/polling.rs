//! Long-running operation polling.
//!
//! A service that accepts work asynchronously answers with `202 Accepted`
//! and a follow-up location. The functions here build the follow-up GET and
//! repeat it until the operation reaches a terminal state or the polling
//! budget runs out.

use std::fmt;
use std::io;
use std::time::Duration;

use http::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::time::pause;

use super::retry::Budget;
use super::{
    Authorizer, HttpRequest, HttpResponse, PrepareError, SendError, SendResult, Sender, preparer,
};

/// Delay between polls when the service sends no `Retry-After` hint.
pub const DEFAULT_POLLING_DELAY: Duration = Duration::from_secs(60);

/// Total time budget for duration-bounded polling.
pub const DEFAULT_POLLING_DURATION: Duration = Duration::from_secs(15 * 60);

/// Status codes that mean "accepted, still running".
pub const DEFAULT_POLLING_CODES: &[StatusCode] = &[StatusCode::ACCEPTED];

/// Follow-up location for an accepted operation.
pub const HEADER_LOCATION: &str = "location";

/// Preferred follow-up location when present.
pub const HEADER_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Seconds to wait before the next poll.
pub const HEADER_RETRY_AFTER: &str = "retry-after";

/// Lifecycle state of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still running
    InProgress,
    /// Completed successfully
    Succeeded,
    /// Completed with a failure
    Failed,
    /// Cancelled by the service or a user
    Canceled,
}

impl OperationStatus {
    /// Parses a status name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [
            Self::InProgress,
            Self::Succeeded,
            Self::Failed,
            Self::Canceled,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Returns the canonical status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }

    /// Returns `true` for every state except [`InProgress`](Self::InProgress).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Derives the status of a finished operation from its status code:
    /// 2xx means success, anything else failure.
    #[must_use]
    pub fn from_status_code(status: StatusCode) -> Self {
        if status.is_success() {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }

    /// Derives the status of a finished operation, reading the body.
    ///
    /// A JSON body with a recognized `status` field wins over
    /// [`from_status_code`](Self::from_status_code). The body is buffered
    /// and put back readable, so the transport body ends up closed.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the body cannot be read.
    pub fn from_response(response: &mut HttpResponse) -> io::Result<Self> {
        #[derive(Deserialize)]
        struct StatusBody {
            status: Option<String>,
        }

        let content = response.buffer_body()?;
        let from_body = serde_json::from_slice::<StatusBody>(&content)
            .ok()
            .and_then(|body| body.status)
            .and_then(|status| Self::parse(&status));

        Ok(from_body.unwrap_or_else(|| Self::from_status_code(response.status)))
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a long-running operation.
///
/// Owns the most recent response until it is handed to the caller. Recording
/// a new response closes the previous one's body.
#[derive(Debug)]
pub struct PollingState {
    /// Current operation status
    pub status: OperationStatus,
    /// Where the next poll goes, if the service said
    pub polling_url: Option<String>,
    /// Wait before the next poll
    pub delay: Duration,
    last_response: HttpResponse,
}

impl PollingState {
    /// Builds the state from an accepted (or polled) response.
    ///
    /// Only the status code and headers are inspected; the body is left
    /// untouched for the caller.
    #[must_use]
    pub fn from_response(
        response: HttpResponse,
        default_delay: Duration,
        codes: &[StatusCode],
    ) -> Self {
        let status = if response_requires_polling(&response, codes) {
            OperationStatus::InProgress
        } else {
            OperationStatus::from_status_code(response.status)
        };
        Self {
            status,
            polling_url: get_polling_location(&response),
            delay: get_polling_delay(&response, default_delay),
            last_response: response,
        }
    }

    /// Records the next poll's response.
    ///
    /// The previous response's body is closed first. A missing location
    /// keeps the previous polling URL.
    pub fn record(&mut self, response: HttpResponse, default_delay: Duration, codes: &[StatusCode]) {
        self.last_response.close_body();
        let next = Self::from_response(response, default_delay, codes);
        self.status = next.status;
        self.delay = next.delay;
        if next.polling_url.is_some() {
            self.polling_url = next.polling_url;
        }
        self.last_response = next.last_response;
    }

    /// Returns `true` once the operation has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The most recent response.
    #[must_use]
    pub const fn response(&self) -> &HttpResponse {
        &self.last_response
    }

    /// Closes the most recent response's body.
    pub fn close_response(&mut self) {
        self.last_response.close_body();
    }

    /// Hands the most recent response to the caller.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        self.last_response
    }
}

/// Returns `true` if the response status is one of `codes`.
#[must_use]
pub fn response_has_status_code(response: &HttpResponse, codes: &[StatusCode]) -> bool {
    codes.contains(&response.status)
}

/// Returns `true` if the response reports a still-running operation.
///
/// `200 OK` never requires polling. An empty `codes` means
/// [`DEFAULT_POLLING_CODES`]. The body is not touched.
#[must_use]
pub fn response_requires_polling(response: &HttpResponse, codes: &[StatusCode]) -> bool {
    if response.status == StatusCode::OK {
        return false;
    }
    let codes = if codes.is_empty() {
        DEFAULT_POLLING_CODES
    } else {
        codes
    };
    response_has_status_code(response, codes)
}

/// Returns the follow-up URL, preferring `Azure-AsyncOperation` over
/// `Location`. `None` means "do not poll".
#[must_use]
pub fn get_polling_location(response: &HttpResponse) -> Option<String> {
    [HEADER_ASYNC_OPERATION, HEADER_LOCATION]
        .into_iter()
        .filter_map(|name| response.header(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reads `Retry-After` as whole seconds, falling back to `default_delay`.
#[must_use]
pub fn get_polling_delay(response: &HttpResponse, default_delay: Duration) -> Duration {
    response
        .header(HEADER_RETRY_AFTER)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map_or(default_delay, Duration::from_secs)
}

/// Builds the GET that polls the operation `response` accepted.
///
/// The response body is closed whether or not a request can be built.
///
/// # Errors
///
/// - [`SendError::MissingPollingLocation`] if there is no follow-up location
/// - [`SendError::Prepare`] if the location is not a valid absolute URL or
///   the authorizer fails
pub fn new_polling_request(
    response: &mut HttpResponse,
    authorizer: &dyn Authorizer,
) -> Result<HttpRequest, SendError> {
    new_polling_request_with_cancellation(response, authorizer, None)
}

/// Like [`new_polling_request`], carrying the originating request's
/// cancellation token onto the follow-up request.
///
/// # Errors
///
/// Same as [`new_polling_request`].
pub fn new_polling_request_with_cancellation(
    response: &mut HttpResponse,
    authorizer: &dyn Authorizer,
    cancellation: Option<CancellationToken>,
) -> Result<HttpRequest, SendError> {
    let location = get_polling_location(response);
    response.close_body();

    let location = location.ok_or(SendError::MissingPollingLocation {
        status: response.status,
    })?;

    let mut request = preparer::prepare(
        HttpRequest::default(),
        [
            preparer::as_get(),
            preparer::with_base_url(location),
            authorizer.with_authorization(),
        ],
    )?;
    request.cancellation = cancellation;
    Ok(request)
}

/// Polls with `request` until the operation finishes or `attempts` polls
/// have been sent (0 means 1).
///
/// # Errors
///
/// - [`SendError::UnexpectedStatus`] carrying the last, still open response
///   when the budget runs out while the operation is in progress
/// - the last transport error if the final poll failed
/// - [`SendError::Cancelled`] if the request's token fires
pub async fn poll_for_attempts(
    sender: &dyn Sender,
    request: HttpRequest,
    polling_delay: Duration,
    attempts: u32,
    codes: &[StatusCode],
) -> SendResult {
    let budget = Budget::Attempts(attempts.max(1));
    poll(sender, request, polling_delay, polling_delay, budget, codes).await
}

/// Polls with `request` until the operation finishes or `duration` has
/// elapsed. At least one poll is sent.
///
/// # Errors
///
/// Same as [`poll_for_attempts`].
pub async fn poll_for_duration(
    sender: &dyn Sender,
    request: HttpRequest,
    polling_delay: Duration,
    duration: Duration,
    codes: &[StatusCode],
) -> SendResult {
    let budget = Budget::Duration(duration);
    poll(sender, request, polling_delay, polling_delay, budget, codes).await
}

/// Shared polling loop. `first_delay` is slept before the first poll;
/// `polling_delay` is the fallback when a pending response has no
/// `Retry-After` hint.
pub(crate) async fn poll(
    sender: &dyn Sender,
    mut request: HttpRequest,
    first_delay: Duration,
    polling_delay: Duration,
    budget: Budget,
    codes: &[StatusCode],
) -> SendResult {
    let start = Instant::now();
    let mut delay = first_delay;
    let mut attempt: u32 = 0;
    let mut state: Option<PollingState> = None;

    loop {
        pause(delay, request.cancellation.as_ref()).await?;
        let result = sender.send(request.clone()).await;
        attempt += 1;
        let exhausted = budget.exhausted(attempt, start.elapsed());

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_cancelled() || exhausted => return Err(e),
            Err(mut e) => {
                tracing::debug!("Poll {attempt} of {} failed: {e}", request.url_str());
                e.close_response();
                continue;
            }
        };

        let mut current = match state.take() {
            Some(mut previous) => {
                previous.record(response, polling_delay, codes);
                previous
            }
            None => PollingState::from_response(response, polling_delay, codes),
        };

        if current.is_terminal() {
            tracing::debug!(
                "Operation at {} finished: {}",
                request.url_str(),
                current.status
            );
            return Ok(current.into_response());
        }

        if exhausted {
            let method = request.method.clone();
            let url = request.url_str().to_string();
            return Err(SendError::unexpected_status(method, url, current.into_response()));
        }

        delay = current.delay;
        if let Some(location) = current.polling_url.as_deref() {
            request.url = Some(follow_location(&request, location)?);
        }
        tracing::debug!(
            "Poll {attempt}: operation still {}, next poll of {} in {delay:?}",
            current.status,
            request.url_str(),
        );

        current.close_response();
        state = Some(current);
    }
}

fn follow_location(request: &HttpRequest, location: &str) -> Result<url::Url, PrepareError> {
    let joined = match &request.url {
        Some(base) => base.join(location),
        None => url::Url::parse(location),
    };
    joined.map_err(|e| PrepareError::InvalidUrl {
        url: location.to_string(),
        reason: e.to_string(),
    })
}
