//! Response handling: the third pipeline stage.
//!
//! Respond decorators are single-use: they may borrow a caller-owned target
//! (see [`by_unmarshalling_json`]), so a chain is built, run once, and
//! dropped. The first decorator listed is outermost, which means
//! `[by_closing(), by_unmarshalling_json(&mut out)]` decodes first and closes
//! last.

use std::fmt;

use serde::de::DeserializeOwned;

use super::{HttpResponse, RespondError};

/// A stage that inspects or consumes a response.
pub trait Responder {
    /// Handles the response.
    ///
    /// # Errors
    ///
    /// Returns a [`RespondError`] if validation or decoding fails.
    fn respond(self: Box<Self>, response: &mut HttpResponse) -> Result<(), RespondError>;
}

impl<F> Responder for F
where
    F: FnOnce(&mut HttpResponse) -> Result<(), RespondError>,
{
    fn respond(self: Box<Self>, response: &mut HttpResponse) -> Result<(), RespondError> {
        (*self)(response)
    }
}

/// Owned, single-use responder chain.
pub type BoxResponder<'a> = Box<dyn Responder + 'a>;

/// Boxes a closure as a responder.
pub fn responder<'a>(
    f: impl FnOnce(&mut HttpResponse) -> Result<(), RespondError> + 'a,
) -> BoxResponder<'a> {
    Box::new(f)
}

/// Wraps a [`Responder`] with additional behavior.
pub struct RespondDecorator<'a>(Box<dyn FnOnce(BoxResponder<'a>) -> BoxResponder<'a> + 'a>);

impl<'a> RespondDecorator<'a> {
    /// Creates a decorator from a wrapping function.
    pub fn new(decorate: impl FnOnce(BoxResponder<'a>) -> BoxResponder<'a> + 'a) -> Self {
        Self(Box::new(decorate))
    }

    /// Creates a decorator that runs `step` and then the next responder.
    /// A failing step short-circuits the chain.
    pub fn step(
        step: impl FnOnce(&mut HttpResponse) -> Result<(), RespondError> + 'a,
    ) -> Self {
        Self::new(move |next| {
            responder(move |response| {
                step(response)?;
                next.respond(response)
            })
        })
    }

    /// Wraps `next` with this decorator.
    #[must_use]
    pub fn decorate(self, next: BoxResponder<'a>) -> BoxResponder<'a> {
        (self.0)(next)
    }
}

impl fmt::Debug for RespondDecorator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RespondDecorator")
    }
}

/// Wraps `responder` with `decorators`; the first decorator ends up outermost.
pub fn decorate_responder<'a>(
    responder: BoxResponder<'a>,
    decorators: impl IntoIterator<Item = RespondDecorator<'a>>,
) -> BoxResponder<'a> {
    let decorators: Vec<_> = decorators.into_iter().collect();
    decorators
        .into_iter()
        .rev()
        .fold(responder, |next, decorator| decorator.decorate(next))
}

/// Runs `decorators` over `response`.
///
/// # Errors
///
/// Returns the first error raised in the chain.
pub fn respond<'a>(
    response: &mut HttpResponse,
    decorators: impl IntoIterator<Item = RespondDecorator<'a>>,
) -> Result<(), RespondError> {
    decorate_responder(responder(|_| Ok(())), decorators).respond(response)
}

/// Delegates without touching the response.
#[must_use]
pub fn by_ignoring<'a>() -> RespondDecorator<'a> {
    RespondDecorator::new(|next| next)
}

/// Runs the inner chain, then closes the body whatever the outcome.
///
/// The inner chain's error is returned unchanged; a failed close is logged.
#[must_use]
pub fn by_closing<'a>() -> RespondDecorator<'a> {
    RespondDecorator::new(|next| {
        responder(move |response| {
            let result = next.respond(response);
            response.close_body();
            result
        })
    })
}

/// Decodes the JSON body into `target`, then delegates.
///
/// The body is read to the end but not closed.
#[must_use]
pub fn by_unmarshalling_json<T>(target: &mut T) -> RespondDecorator<'_>
where
    T: DeserializeOwned,
{
    RespondDecorator::step(move |response| {
        let content = match response.body.as_mut() {
            Some(body) => body.read_to_end().map_err(RespondError::Body)?,
            None => Vec::new(),
        };
        *target = serde_json::from_slice(&content).map_err(RespondError::Decode)?;
        Ok(())
    })
}

/// Fails with [`RespondError::UnexpectedStatus`] unless the status is in `codes`.
#[must_use]
pub fn with_status_code_check<'a>(codes: impl Into<Vec<http::StatusCode>>) -> RespondDecorator<'a> {
    let codes = codes.into();
    RespondDecorator::step(move |response| {
        if codes.contains(&response.status) {
            Ok(())
        } else {
            Err(RespondError::UnexpectedStatus(response.status))
        }
    })
}
