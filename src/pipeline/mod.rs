//! The request pipeline: prepare, send, respond.
//!
//! This module provides:
//! - Request and response types ([`HttpRequest`], [`HttpResponse`], [`Body`])
//! - The transport abstraction ([`HttpClient`]) and its reqwest implementation
//!   ([`ReqwestClient`])
//! - Decorator stages for preparing ([`preparer`]), sending ([`sender`]),
//!   and responding ([`responder`])
//! - Retry with exponential backoff ([`retry`], [`RetryPolicy`])
//! - Long-running operation polling ([`polling`])
//! - A reusable settings bundle ([`Client`])

mod authorizer;
mod body;
mod client;
mod error;
mod http;
pub mod polling;
pub mod preparer;
pub mod responder;
pub mod retry;
pub mod sender;
mod transport;

#[cfg(test)]
mod responder_tests;
#[cfg(test)]
mod transport_tests;

pub use authorizer::{Authorizer, BearerAuthorizer, NullAuthorizer};
pub use body::{Body, BodyReader};
pub use client::{Client, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF, DEFAULT_USER_AGENT};
pub use error::{HttpError, PrepareError, RespondError, SendError};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use polling::{
    DEFAULT_POLLING_CODES, DEFAULT_POLLING_DELAY, DEFAULT_POLLING_DURATION, OperationStatus,
    PollingState,
};
pub use preparer::{DynPreparer, PrepareDecorator, Preparer, prepare};
pub use responder::{BoxResponder, RespondDecorator, Responder, respond};
pub use retry::RetryPolicy;
pub use sender::{
    DynSender, SendDecorator, SendResult, Sender, send_with_sender, sender_fn, transport,
};
pub use transport::ReqwestClient;
