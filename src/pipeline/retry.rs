//! Retry engine: backoff policy and the retrying send decorators.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::time::{Cancelled, pause};

use super::{HttpRequest, SendDecorator, sender_fn};

/// Configuration for exponential backoff retry behavior.
///
/// Controls how many times to retry a failed operation and how long
/// to wait between attempts. Uses exponential backoff with a configurable
/// multiplier and maximum delay cap. There is no jitter.
///
/// # Defaults
///
/// - `max_attempts`: 3
/// - `initial_delay`: 5 seconds
/// - `max_delay`: 60 seconds
/// - `multiplier`: 2.0
///
/// # Example
///
/// ```
/// use restwire::pipeline::RetryPolicy;
/// use std::time::Duration;
///
/// let custom = RetryPolicy::new()
///     .with_max_attempts(5)
///     .with_initial_delay(Duration::from_secs(1))
///     .with_max_delay(Duration::from_secs(30))
///     .with_multiplier(1.5);
/// assert_eq!(custom.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    ///
    /// A value of 1 means no retries; only the initial attempt is made.
    pub max_attempts: u32,

    /// Delay before the first retry.
    ///
    /// Subsequent delays are computed by multiplying by `multiplier`.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    ///
    /// The computed delay is capped at this value, or at `initial_delay`
    /// when that is larger, so the sequence never decreases.
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Default maximum attempts.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Default initial delay (5 seconds).
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);

    /// Default maximum delay (60 seconds).
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

    /// Default multiplier (2.0).
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;

    /// Minimum value for `max_attempts`.
    pub const MIN_MAX_ATTEMPTS: u32 = 1;

    /// Creates a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }

    /// Creates a doubling policy starting at `backoff`.
    #[must_use]
    pub const fn exponential(backoff: Duration) -> Self {
        Self::new().with_initial_delay(backoff)
    }

    /// Sets the maximum number of attempts.
    ///
    /// Zero is raised to [`Self::MIN_MAX_ATTEMPTS`]: at least one attempt is
    /// always made.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts < Self::MIN_MAX_ATTEMPTS {
            Self::MIN_MAX_ATTEMPTS
        } else {
            max_attempts
        };
        self
    }

    /// Sets the initial delay between retries.
    ///
    /// Zero delay is supported but creates a tight retry loop.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the delay multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is less than 1.0, which would make the delays
    /// shrink between attempts.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be at least 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Computes the delay for a given retry number (0-indexed).
    ///
    /// `initial_delay · multiplier^retry`, capped at the larger of
    /// `max_delay` and `initial_delay`.
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let cap = self.max_delay.max(self.initial_delay);
        // Clamp the exponent: anything past 2^63 is already beyond any cap
        let exponent = i32::try_from(retry.min(63)).unwrap_or(63);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = delay_secs.min(cap.as_secs_f64());
        Duration::try_from_secs_f64(capped).map_or(cap, |delay| delay.min(cap))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes `backoff · 2^attempt`, clamped to the default maximum delay.
#[must_use]
pub fn backoff_delay(backoff: Duration, attempt: u32) -> Duration {
    RetryPolicy::exponential(backoff).delay_for_retry(attempt)
}

/// Sleeps for [`backoff_delay`]`(backoff, attempt)`.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires during the wait.
pub async fn delay_for_backoff(
    backoff: Duration,
    attempt: u32,
    cancel: Option<&CancellationToken>,
) -> Result<(), Cancelled> {
    pause(backoff_delay(backoff, attempt), cancel).await
}

/// What bounds a retry or polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Budget {
    Attempts(u32),
    Duration(Duration),
}

impl Budget {
    pub(crate) fn exhausted(self, attempts_made: u32, elapsed: Duration) -> bool {
        match self {
            Self::Attempts(max) => attempts_made >= max,
            Self::Duration(limit) => elapsed >= limit,
        }
    }
}

/// Retries up to `attempts` times (0 means 1), sleeping
/// `backoff · 2^attempt` between attempts.
#[must_use]
pub fn do_retry_for_attempts(attempts: u32, backoff: Duration) -> SendDecorator {
    do_retry(RetryPolicy::exponential(backoff).with_max_attempts(attempts))
}

/// Retries with the attempt count and backoff of `policy`.
#[must_use]
pub fn do_retry(policy: RetryPolicy) -> SendDecorator {
    let limit = Budget::Attempts(policy.max_attempts);
    retrying(Arc::new(policy), limit)
}

/// Retries until `duration` has elapsed, sleeping `backoff · 2^attempt`
/// between attempts.
///
/// At least one attempt is made. The elapsed time is checked after each
/// attempt, before sleeping.
#[must_use]
pub fn do_retry_for_duration(duration: Duration, backoff: Duration) -> SendDecorator {
    retrying(
        Arc::new(RetryPolicy::exponential(backoff)),
        Budget::Duration(duration),
    )
}

fn retrying(policy: Arc<RetryPolicy>, limit: Budget) -> SendDecorator {
    SendDecorator::new(move |next| {
        let policy = Arc::clone(&policy);
        sender_fn(move |request: HttpRequest| {
            let next = Arc::clone(&next);
            let policy = Arc::clone(&policy);
            async move {
                let start = Instant::now();
                let mut attempt: u32 = 0;
                loop {
                    let result = next.send(request.clone()).await;
                    attempt += 1;

                    let mut error = match result {
                        Ok(response) => return Ok(response),
                        Err(e) => e,
                    };

                    if error.is_cancelled() || limit.exhausted(attempt, start.elapsed()) {
                        return Err(error);
                    }

                    // Abandoned attempt: its response is never seen again
                    error.close_response();

                    let delay = policy.delay_for_retry(attempt - 1);
                    tracing::debug!(
                        "Attempt {attempt} for {} {} failed ({error}), retrying in {delay:?}",
                        request.method,
                        request.url_str(),
                    );
                    pause(delay, request.cancellation.as_ref()).await?;
                }
            }
        })
    })
}
