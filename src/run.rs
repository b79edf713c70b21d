//! Request execution logic.
//!
//! This module drives one request through the pipeline: credentials,
//! retries on transient statuses, optional long-running operation polling,
//! and service error decoding.

use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use http::StatusCode;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use restwire::config::{Credentials, ValidatedConfig};
use restwire::date::TimeRfc1123;
use restwire::pipeline::{
    Authorizer, BearerAuthorizer, Client, HttpClient, HttpRequest, NullAuthorizer, PrepareError,
    RespondDecorator, RespondError, ReqwestClient, SendError, preparer, respond, responder, retry,
    sender,
};
use restwire::service::{self, TokenError};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Statuses that are worth another attempt.
const RETRYABLE_STATUS_CODES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Prefix of the pipeline's request log lines.
const LOG_PREFIX: &str = "restwire";

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The token file could not be loaded.
    #[error("Failed to load token: {0}")]
    Token(#[from] TokenError),

    /// The request could not be built.
    #[error("Failed to prepare request: {0}")]
    Prepare(#[from] PrepareError),

    /// Sending or polling failed.
    #[error("Request failed: {0}")]
    Send(#[from] SendError),

    /// The response could not be handled, or carried a service error.
    #[error(transparent)]
    Respond(#[from] RespondError),

    /// The final status was not accepted and the body was not a service error.
    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus {
        /// Final status code
        status: StatusCode,
        /// Raw response body
        body: String,
    },

    /// The response body could not be written to stdout.
    #[error("Failed to write response body: {0}")]
    Output(#[source] std::io::Error),
}

/// Sends the configured request and prints the response body.
///
/// Ctrl+C cancels the pipeline at its next sleep (backoff or polling delay).
///
/// # Errors
///
/// Returns an error if credentials cannot be loaded, the request fails
/// after retries, or the final response is not accepted.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires a real
/// network and OS signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let cancellation = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_shutdown(cancellation.clone()));

    let result = perform(&config, ReqwestClient::new(), cancellation).await;
    watcher.abort();

    let body = result?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{body}").map_err(RunError::Output)
}

/// Runs the whole pipeline against `http` and returns the response body.
pub(crate) async fn perform<C: HttpClient + 'static>(
    config: &ValidatedConfig,
    http: C,
    cancellation: CancellationToken,
) -> Result<String, RunError> {
    let client = create_client(config, http)?;
    let request = create_request(config, cancellation.clone())?;

    let response = match client
        .send(
            request,
            [
                retry::do_retry(config.retry_policy.clone()),
                sender::with_logging(LOG_PREFIX),
                sender::do_error_if_status_code(RETRYABLE_STATUS_CODES),
            ],
        )
        .await
    {
        Ok(response) => response,
        // Retries ran out on a transient status: classify the last response
        Err(SendError::UnexpectedStatus { response, .. }) => *response,
        Err(e) => return Err(e.into()),
    };

    let mut response = if config.polling.enabled {
        client.poll_as_needed(response, Some(cancellation)).await?
    } else {
        response
    };

    if let Some(date) = response
        .header(http::header::DATE.as_str())
        .and_then(|value| value.parse::<TimeRfc1123>().ok())
    {
        tracing::debug!("Server date: {date}");
    }
    if let Some(request_id) = service::extract_request_id(&response) {
        tracing::debug!("Request id: {request_id}");
    }
    if let Some(client_id) = service::extract_client_id(&response) {
        tracing::debug!("Client request id: {client_id}");
    }

    let mut body = String::new();
    respond(
        &mut response,
        [
            responder::by_closing(),
            service::with_error_unless_status_code(config.expect.clone()),
            RespondDecorator::step(|response| {
                let content = response.buffer_body().map_err(RespondError::Body)?;
                body = String::from_utf8_lossy(&content).into_owned();
                Ok(())
            }),
        ],
    )?;

    if !config.expect.contains(&response.status) {
        let content = response.buffer_body().map_err(RespondError::Body)?;
        return Err(RunError::UnexpectedStatus {
            status: response.status,
            body: String::from_utf8_lossy(&content).into_owned(),
        });
    }

    Ok(body)
}

/// Creates the pipeline client from configuration.
fn create_client<C: HttpClient + 'static>(
    config: &ValidatedConfig,
    http: C,
) -> Result<Client, RunError> {
    let mut client = Client::from_http_client(http)
        .with_authorizer(create_authorizer(&config.credentials)?)
        .with_polling(config.polling.delay, config.polling.duration)
        .with_polling_codes(config.polling.codes.clone());

    if let Some(ref id) = config.client_request_id {
        client = client.with_request_inspector(service::with_returning_client_id(id.clone()));
    }

    Ok(client)
}

/// Resolves the configured credentials into an authorizer.
fn create_authorizer(credentials: &Credentials) -> Result<Arc<dyn Authorizer>, RunError> {
    match credentials {
        Credentials::None => Ok(Arc::new(NullAuthorizer)),
        Credentials::Bearer(token) => Ok(Arc::new(BearerAuthorizer::new(token.clone()))),
        Credentials::TokenFile(path) => {
            let token = service::load_token(path)?;
            if token.is_expired(Utc::now()) {
                tracing::warn!(
                    "Token in {} has expired, the service may reject it",
                    path.display()
                );
            }
            Ok(Arc::new(token))
        }
    }
}

/// Builds the outgoing request from configuration.
fn create_request(
    config: &ValidatedConfig,
    cancellation: CancellationToken,
) -> Result<HttpRequest, PrepareError> {
    let request = HttpRequest {
        headers: config.headers.clone(),
        ..HttpRequest::default()
    }
    .with_cancellation(cancellation);

    let mut decorators = vec![
        preparer::with_method(config.method.clone()),
        preparer::with_base_url(config.url.as_str()),
    ];
    if let Some(ref body) = config.body {
        decorators.push(preparer::with_string(body.clone()));
    }

    preparer::prepare(request, decorators)
}

/// Cancels `token` when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received, cancelling request...");
    token.cancel();
}
