//! Request sending: the second pipeline stage.
//!
//! A [`Sender`] executes a request and returns a response. A
//! [`SendDecorator`] wraps a sender with one cross-cutting behavior.
//! Decorators passed to [`send_with_sender`] wrap from the outside in: the
//! first one listed sees the outgoing request first and the returned
//! response last.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::time::pause;

use super::{HttpClient, HttpRequest, HttpResponse, SendError};

/// Result of a send stage.
pub type SendResult = Result<HttpResponse, SendError>;

/// A stage that turns a request into a response.
///
/// The method returns a boxed future so senders can be stacked as trait
/// objects.
pub trait Sender: Send + Sync {
    /// Sends the request.
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, SendResult>;
}

/// Shared handle to a sender chain.
pub type DynSender = Arc<dyn Sender>;

/// Wraps a [`Sender`] with additional behavior.
#[derive(Clone)]
pub struct SendDecorator(Arc<dyn Fn(DynSender) -> DynSender + Send + Sync>);

impl SendDecorator {
    /// Creates a decorator from a wrapping function.
    pub fn new(decorate: impl Fn(DynSender) -> DynSender + Send + Sync + 'static) -> Self {
        Self(Arc::new(decorate))
    }

    /// Wraps `next` with this decorator.
    #[must_use]
    pub fn decorate(&self, next: DynSender) -> DynSender {
        (self.0)(next)
    }
}

impl fmt::Debug for SendDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendDecorator")
    }
}

/// Adapts a closure returning a `'static` future into a [`Sender`].
///
/// Closures typically capture a cloned [`DynSender`] for the next stage.
pub fn sender_fn<F, Fut>(f: F) -> DynSender
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = SendResult> + Send + 'static,
{
    Arc::new(SenderFn(f))
}

struct SenderFn<F>(F);

impl<F, Fut> Sender for SenderFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = SendResult> + Send + 'static,
{
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, SendResult> {
        Box::pin((self.0)(request))
    }
}

/// Adapts an [`HttpClient`] transport into the pipeline.
pub fn transport<C: HttpClient + 'static>(client: C) -> DynSender {
    Arc::new(Transport(client))
}

struct Transport<C>(C);

impl<C: HttpClient> Sender for Transport<C> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, SendResult> {
        Box::pin(async move { Ok(self.0.request(request).await?) })
    }
}

/// Wraps `sender` with `decorators`; the first decorator ends up outermost.
pub fn decorate_sender(
    sender: DynSender,
    decorators: impl IntoIterator<Item = SendDecorator>,
) -> DynSender {
    let decorators: Vec<_> = decorators.into_iter().collect();
    decorators
        .iter()
        .rev()
        .fold(sender, |next, decorator| decorator.decorate(next))
}

/// Decorates `sender` and sends `request` through the resulting chain.
///
/// # Errors
///
/// Returns whatever error the decorated chain produces.
pub async fn send_with_sender(
    sender: DynSender,
    request: HttpRequest,
    decorators: impl IntoIterator<Item = SendDecorator>,
) -> SendResult {
    decorate_sender(sender, decorators).send(request).await
}

/// Passes requests and responses through unchanged.
#[must_use]
pub fn as_is() -> SendDecorator {
    SendDecorator::new(|next| next)
}

/// Logs the outgoing request and the received status.
#[must_use]
pub fn with_logging(prefix: impl Into<String>) -> SendDecorator {
    let prefix: Arc<str> = Arc::from(prefix.into());
    SendDecorator::new(move |next| {
        let prefix = Arc::clone(&prefix);
        sender_fn(move |request: HttpRequest| {
            let next = Arc::clone(&next);
            let prefix = Arc::clone(&prefix);
            async move {
                let method = request.method.clone();
                let url = request.url_str().to_string();
                tracing::info!("{prefix}: Sending {method} {url}");
                let result = next.send(request).await;
                match &result {
                    Ok(response) => tracing::info!(
                        "{prefix}: {method} {url} received {}",
                        response.status_text()
                    ),
                    Err(e) => tracing::info!("{prefix}: {method} {url} failed: {e}"),
                }
                result
            }
        })
    })
}

/// Fails with [`SendError::UnexpectedStatus`] when the status is in `codes`.
#[must_use]
pub fn do_error_if_status_code(codes: impl Into<Vec<http::StatusCode>>) -> SendDecorator {
    status_check(codes.into(), true)
}

/// Fails with [`SendError::UnexpectedStatus`] when the status is not in `codes`.
#[must_use]
pub fn do_error_unless_status_code(codes: impl Into<Vec<http::StatusCode>>) -> SendDecorator {
    status_check(codes.into(), false)
}

fn status_check(codes: Vec<http::StatusCode>, fail_on_match: bool) -> SendDecorator {
    let codes: Arc<[http::StatusCode]> = Arc::from(codes);
    SendDecorator::new(move |next| {
        let codes = Arc::clone(&codes);
        sender_fn(move |request: HttpRequest| {
            let next = Arc::clone(&next);
            let codes = Arc::clone(&codes);
            async move {
                let method = request.method.clone();
                let url = request.url_str().to_string();
                let response = next.send(request).await?;
                if codes.contains(&response.status) == fail_on_match {
                    return Err(SendError::unexpected_status(method, url, response));
                }
                Ok(response)
            }
        })
    })
}

/// Closes the body of any response carried by an error before propagating it.
#[must_use]
pub fn do_close_if_error() -> SendDecorator {
    SendDecorator::new(|next| {
        sender_fn(move |request: HttpRequest| {
            let next = Arc::clone(&next);
            async move {
                next.send(request).await.map_err(|mut e| {
                    e.close_response();
                    e
                })
            }
        })
    })
}

/// Waits `delay` before sending.
///
/// The wait ends early with [`SendError::Cancelled`] if the request's
/// cancellation token fires.
#[must_use]
pub fn after_delay(delay: Duration) -> SendDecorator {
    SendDecorator::new(move |next| {
        sender_fn(move |request: HttpRequest| {
            let next = Arc::clone(&next);
            async move {
                pause(delay, request.cancellation.as_ref()).await?;
                next.send(request).await
            }
        })
    })
}
