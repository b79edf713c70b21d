//! Request preparation: the first pipeline stage.
//!
//! A [`Preparer`] turns a request into a (modified) request. A
//! [`PrepareDecorator`] wraps a preparer with one modification. Decorators
//! passed to [`prepare`] apply in the order given, and the first error stops
//! the chain.

use std::fmt;
use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use serde::Serialize;

use super::{HttpRequest, PrepareError};

/// Media type set by [`as_json`] and [`with_json`].
pub const MIME_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Media type set by [`as_form_url_encoded`] and [`with_form_data`].
pub const MIME_TYPE_FORM_POST: &str = "application/x-www-form-urlencoded";

/// A stage that builds or modifies an outgoing request.
pub trait Preparer: Send + Sync {
    /// Returns the prepared request.
    ///
    /// # Errors
    ///
    /// Returns a [`PrepareError`] if the request cannot be prepared.
    fn prepare(&self, request: HttpRequest) -> Result<HttpRequest, PrepareError>;
}

impl<F> Preparer for F
where
    F: Fn(HttpRequest) -> Result<HttpRequest, PrepareError> + Send + Sync,
{
    fn prepare(&self, request: HttpRequest) -> Result<HttpRequest, PrepareError> {
        self(request)
    }
}

/// Shared handle to a preparer chain.
pub type DynPreparer = Arc<dyn Preparer>;

/// Wraps a [`Preparer`] with additional behavior.
///
/// Decorators are cheap to clone so they can be stored (for example as a
/// client's request inspectors) and reused for every request.
#[derive(Clone)]
pub struct PrepareDecorator(Arc<dyn Fn(DynPreparer) -> DynPreparer + Send + Sync>);

impl PrepareDecorator {
    /// Creates a decorator from a wrapping function.
    pub fn new(decorate: impl Fn(DynPreparer) -> DynPreparer + Send + Sync + 'static) -> Self {
        Self(Arc::new(decorate))
    }

    /// Creates a decorator that applies `step` and then hands the request
    /// to the next preparer. A failing step short-circuits the chain.
    pub fn step(
        step: impl Fn(HttpRequest) -> Result<HttpRequest, PrepareError> + Send + Sync + 'static,
    ) -> Self {
        let step = Arc::new(step);
        Self::new(move |next| {
            let step = Arc::clone(&step);
            Arc::new(move |request: HttpRequest| next.prepare(step(request)?))
        })
    }

    /// Wraps `next` with this decorator.
    #[must_use]
    pub fn decorate(&self, next: DynPreparer) -> DynPreparer {
        (self.0)(next)
    }
}

impl fmt::Debug for PrepareDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrepareDecorator")
    }
}

/// Wraps `preparer` with `decorators`; the first decorator ends up outermost.
pub fn decorate_preparer(
    preparer: DynPreparer,
    decorators: impl IntoIterator<Item = PrepareDecorator>,
) -> DynPreparer {
    let decorators: Vec<_> = decorators.into_iter().collect();
    decorators
        .iter()
        .rev()
        .fold(preparer, |next, decorator| decorator.decorate(next))
}

/// Applies `decorators` to `base` in order.
///
/// # Errors
///
/// Returns the first error raised by a decorator, unchanged.
pub fn prepare(
    base: HttpRequest,
    decorators: impl IntoIterator<Item = PrepareDecorator>,
) -> Result<HttpRequest, PrepareError> {
    let identity: DynPreparer = Arc::new(Ok::<HttpRequest, PrepareError>);
    decorate_preparer(identity, decorators).prepare(base)
}

/// Leaves the request untouched.
#[must_use]
pub fn as_is() -> PrepareDecorator {
    PrepareDecorator::new(|next| next)
}

/// Sets the request method.
#[must_use]
pub fn with_method(method: http::Method) -> PrepareDecorator {
    PrepareDecorator::step(move |mut request| {
        request.method = method.clone();
        Ok(request)
    })
}

/// Sets the method to GET.
#[must_use]
pub fn as_get() -> PrepareDecorator {
    with_method(http::Method::GET)
}

/// Sets the method to POST.
#[must_use]
pub fn as_post() -> PrepareDecorator {
    with_method(http::Method::POST)
}

/// Sets the method to PUT.
#[must_use]
pub fn as_put() -> PrepareDecorator {
    with_method(http::Method::PUT)
}

/// Sets the method to PATCH.
#[must_use]
pub fn as_patch() -> PrepareDecorator {
    with_method(http::Method::PATCH)
}

/// Sets the method to DELETE.
#[must_use]
pub fn as_delete() -> PrepareDecorator {
    with_method(http::Method::DELETE)
}

/// Sets the method to HEAD.
#[must_use]
pub fn as_head() -> PrepareDecorator {
    with_method(http::Method::HEAD)
}

/// Sets the method to OPTIONS.
#[must_use]
pub fn as_options() -> PrepareDecorator {
    with_method(http::Method::OPTIONS)
}

/// Parses `base_url` and sets it as the request URL.
///
/// Only absolute URLs are accepted.
#[must_use]
pub fn with_base_url(base_url: impl Into<String>) -> PrepareDecorator {
    let base_url = base_url.into();
    PrepareDecorator::step(move |mut request| {
        let url = url::Url::parse(&base_url).map_err(|e| PrepareError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        request.url = Some(url);
        Ok(request)
    })
}

/// Appends `path` to the current URL path, joining with a single `/`.
#[must_use]
pub fn with_path(path: impl Into<String>) -> PrepareDecorator {
    let path = path.into();
    PrepareDecorator::step(move |mut request| {
        let url = request.url.as_mut().ok_or(PrepareError::MissingUrl)?;
        append_path(url, &path);
        Ok(request)
    })
}

/// Substitutes `{name}` placeholders in `template` and appends the result.
///
/// Values are inserted verbatim; the URL parser escapes characters that are
/// not valid in a path.
#[must_use]
pub fn with_path_parameters<K, V>(
    template: impl Into<String>,
    parameters: impl IntoIterator<Item = (K, V)>,
) -> PrepareDecorator
where
    K: Into<String>,
    V: Into<String>,
{
    let path = substitute(&template.into(), parameters, |value| value.to_string());
    with_path(path)
}

/// Like [`with_path_parameters`], but query-escapes each value first.
#[must_use]
pub fn with_escaped_path_parameters<K, V>(
    template: impl Into<String>,
    parameters: impl IntoIterator<Item = (K, V)>,
) -> PrepareDecorator
where
    K: Into<String>,
    V: Into<String>,
{
    let path = substitute(&template.into(), parameters, |value| {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    });
    with_path(path)
}

/// Appends query parameters to the URL.
#[must_use]
pub fn with_query_parameters<K, V>(parameters: impl IntoIterator<Item = (K, V)>) -> PrepareDecorator
where
    K: Into<String>,
    V: Into<String>,
{
    let parameters: Vec<(String, String)> = parameters
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    PrepareDecorator::step(move |mut request| {
        let url = request.url.as_mut().ok_or(PrepareError::MissingUrl)?;
        url.query_pairs_mut().extend_pairs(parameters.iter());
        Ok(request)
    })
}

/// Sets a header, replacing any existing values for that name.
#[must_use]
pub fn with_header(name: impl Into<String>, value: impl Into<String>) -> PrepareDecorator {
    let name = name.into();
    let value = value.into();
    PrepareDecorator::step(move |mut request| {
        let header_name = name
            .parse::<HeaderName>()
            .map_err(|_| PrepareError::InvalidHeaderName { name: name.clone() })?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|_| PrepareError::InvalidHeaderValue { name: name.clone() })?;
        request.headers.insert(header_name, header_value);
        Ok(request)
    })
}

/// Sets the `Content-Type` header.
#[must_use]
pub fn as_content_type(content_type: impl Into<String>) -> PrepareDecorator {
    with_header(CONTENT_TYPE.as_str(), content_type)
}

/// Sets the JSON content type.
#[must_use]
pub fn as_json() -> PrepareDecorator {
    as_content_type(MIME_TYPE_JSON)
}

/// Sets the form content type.
#[must_use]
pub fn as_form_url_encoded() -> PrepareDecorator {
    as_content_type(MIME_TYPE_FORM_POST)
}

/// Sets `Authorization: Bearer <token>`.
#[must_use]
pub fn with_bearer_authorization(token: impl AsRef<str>) -> PrepareDecorator {
    with_header(AUTHORIZATION.as_str(), format!("Bearer {}", token.as_ref()))
}

/// Sets a text body.
#[must_use]
pub fn with_string(body: impl Into<String>) -> PrepareDecorator {
    let body = body.into();
    PrepareDecorator::step(move |request| Ok(request.with_body(body.clone().into_bytes())))
}

/// Serializes `value` as the JSON body and sets the JSON content type.
///
/// Serialization happens once, when the decorator is built; a failure is
/// reported when the decorator runs.
#[must_use]
pub fn with_json<T: Serialize + ?Sized>(value: &T) -> PrepareDecorator {
    let encoded = serde_json::to_vec(value).map_err(Arc::new);
    PrepareDecorator::step(move |mut request| {
        let body = encoded.clone().map_err(PrepareError::Serialize)?;
        request.headers.insert(CONTENT_TYPE, HeaderValue::from_static(MIME_TYPE_JSON));
        Ok(request.with_body(body))
    })
}

/// Sets a url-encoded form body and the form content type.
#[must_use]
pub fn with_form_data<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> PrepareDecorator
where
    K: Into<String>,
    V: Into<String>,
{
    let fields: Vec<(String, String)> = fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .finish();
    PrepareDecorator::step(move |mut request| {
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(MIME_TYPE_FORM_POST));
        Ok(request.with_body(encoded.clone().into_bytes()))
    })
}

fn append_path(url: &mut url::Url, path: &str) {
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
}

fn substitute<K, V>(
    template: &str,
    parameters: impl IntoIterator<Item = (K, V)>,
    encode: impl Fn(&str) -> String,
) -> String
where
    K: Into<String>,
    V: Into<String>,
{
    parameters
        .into_iter()
        .fold(template.to_string(), |path, (key, value)| {
            let placeholder = format!("{{{}}}", key.into());
            path.replace(&placeholder, &encode(&value.into()))
        })
}
