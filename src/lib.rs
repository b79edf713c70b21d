//! restwire: a composable REST middleware pipeline
//!
//! A library for preparing, sending, and handling REST requests through
//! decorator chains, with retry, exponential backoff, long-running
//! operation polling, and structured service errors.

pub mod config;
pub mod date;
pub mod pipeline;
pub mod service;
pub mod time;

#[cfg(test)]
mod test_fixtures;
