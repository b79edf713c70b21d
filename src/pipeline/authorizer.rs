//! Credential injection for outgoing requests.

use std::sync::Arc;

use super::{PrepareDecorator, preparer};

/// Supplies a preparer that adds credentials to a request.
pub trait Authorizer: Send + Sync {
    /// Returns the decorator that attaches this authorizer's credentials.
    fn with_authorization(&self) -> PrepareDecorator;
}

impl<A: Authorizer + ?Sized> Authorizer for Arc<A> {
    fn with_authorization(&self) -> PrepareDecorator {
        (**self).with_authorization()
    }
}

/// Adds no credentials and never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullAuthorizer;

impl Authorizer for NullAuthorizer {
    fn with_authorization(&self) -> PrepareDecorator {
        preparer::as_is()
    }
}

/// Attaches `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerAuthorizer {
    token: String,
}

impl BearerAuthorizer {
    /// Creates an authorizer for the given access token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for BearerAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthorizer")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Authorizer for BearerAuthorizer {
    fn with_authorization(&self) -> PrepareDecorator {
        preparer::with_bearer_authorization(&self.token)
    }
}
