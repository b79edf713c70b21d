//! Cancellable sleeps for the pipeline's suspension points.
//!
//! Backoff waits, `after_delay`, and polling intervals all go through
//! [`pause`], so a caller-supplied [`CancellationToken`] can end any of them
//! early. Sleeping uses `tokio::time`, which lets tests drive time with a
//! paused clock.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The cancellation token fired before a sleep finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Sleep interrupted by cancellation")]
pub struct Cancelled;

/// Sleeps for `duration` unless `cancel` fires first.
///
/// A zero duration still checks the token, so a cancelled request stops at
/// its next suspension point even when no delay is configured.
///
/// # Errors
///
/// Returns [`Cancelled`] if the token is (or becomes) cancelled.
pub async fn pause(duration: Duration, cancel: Option<&CancellationToken>) -> Result<(), Cancelled> {
    let Some(token) = cancel else {
        tokio::time::sleep(duration).await;
        return Ok(());
    };

    if token.is_cancelled() {
        return Err(Cancelled);
    }

    tokio::select! {
        () = token.cancelled() => Err(Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}
