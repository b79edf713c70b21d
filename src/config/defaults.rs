//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use crate::pipeline::{DEFAULT_POLLING_DELAY, DEFAULT_POLLING_DURATION};

/// Default HTTP method.
pub const METHOD: &str = "GET";

/// Status codes accepted when no `--expect` is given.
pub const EXPECTED_STATUS_CODES: &[u16] = &[200, 201, 202, 204];

/// Status codes that mean "still running" when polling is enabled.
pub const POLLING_STATUS_CODES: &[u16] = &[202];

/// Default maximum number of attempts.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Default initial retry delay in seconds.
pub const RETRY_INITIAL_DELAY_SECS: u64 = 5;

/// Default maximum retry delay in seconds.
pub const RETRY_MAX_DELAY_SECS: u64 = 60;

/// Default retry backoff multiplier.
pub const RETRY_MULTIPLIER: f64 = 2.0;

/// Default polling delay in seconds.
pub const POLLING_DELAY_SECS: u64 = DEFAULT_POLLING_DELAY.as_secs();

/// Default polling budget in seconds.
pub const POLLING_DURATION_SECS: u64 = DEFAULT_POLLING_DURATION.as_secs();
