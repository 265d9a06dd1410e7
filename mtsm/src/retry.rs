//! Retry backoff for the wire push.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Exponential backoff: `wait * 2^attempt`, capped at `max_wait`, for at most
/// `max_retries` waits.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    wait: Duration,
    max_wait: Duration,
    max_retries: u32,
    attempts: u32,
}

impl Backoff {
    /// Create a new [`Backoff`].
    #[must_use]
    pub fn new(wait: Duration, max_wait: Duration, max_retries: u32) -> Self {
        Self {
            wait,
            max_wait,
            max_retries,
            attempts: 0,
        }
    }

    /// Number of waits handed out so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The next delay, or `None` once `max_retries` delays were handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_retries {
            return None;
        }
        let factor = 1_u32.checked_shl(self.attempts).unwrap_or(u32::MAX);
        let delay = self.wait.saturating_mul(factor).min(self.max_wait);
        self.attempts = self.attempts.saturating_add(1);
        Some(delay)
    }

    /// Wait for the next delay.
    ///
    /// Returns `Some(())` if the wait completed, `None` if retries are
    /// exhausted or `cancel` fired first.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> Option<()> {
        let delay = self.next_delay()?;
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            () = tokio::time::sleep(delay) => Some(()),
        }
    }
}
