//! Idle-reset keep-alive countdown used by the writer loop.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

// ============================================================================
// KeepAlive
// ============================================================================

/// Single-shot countdown that fires when nothing happened for one period.
///
/// Rearming replaces the deadline of the same timer, so an expiry that was
/// reached but not yet observed is discarded by [`reset`](Self::reset) and can
/// never be processed as a new timeout.
pub(crate) struct KeepAlive {
    period: Duration,
    timer: Pin<Box<Sleep>>,
}

impl KeepAlive {
    /// Arms a countdown of `period`.
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            timer: Box::pin(sleep(period)),
        }
    }

    /// Restarts the countdown from now.
    pub(crate) fn reset(&mut self) {
        let deadline = Instant::now() + self.period;
        self.timer.as_mut().reset(deadline);
    }

    /// Completes once the countdown expires.
    ///
    /// Stays ready until the next [`reset`](Self::reset).
    pub(crate) async fn fired(&mut self) {
        self.timer.as_mut().await;
    }

    /// Instant at which the countdown expires.
    pub(crate) fn deadline(&self) -> Instant {
        self.timer.deadline()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::{advance, timeout};
    use tokio_test::{assert_pending, assert_ready, task};

    const PERIOD: Duration = Duration::from_secs(9);

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_period() {
        let start = Instant::now();
        let mut keepalive = KeepAlive::new(PERIOD);

        keepalive.fired().await;

        assert!(Instant::now() - start >= PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_until_period_elapses() {
        let mut keepalive = KeepAlive::new(PERIOD);

        {
            let mut fired = task::spawn(keepalive.fired());
            assert_pending!(fired.poll());
        }

        advance(PERIOD).await;

        let mut fired = task::spawn(keepalive.fired());
        assert_ready!(fired.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_postpones_expiry() {
        let mut keepalive = KeepAlive::new(PERIOD);

        advance(Duration::from_secs(6)).await;
        keepalive.reset();

        // Original deadline passes without a fire.
        let early = timeout(Duration::from_secs(8), keepalive.fired()).await;
        assert!(early.is_err());

        let late = timeout(Duration::from_secs(2), keepalive.fired()).await;
        assert!(late.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_unobserved_expiry() {
        let mut keepalive = KeepAlive::new(PERIOD);

        // Let the countdown expire without polling it.
        advance(PERIOD + Duration::from_secs(1)).await;
        keepalive.reset();

        let stale = timeout(Duration::from_millis(100), keepalive.fired()).await;
        assert!(stale.is_err(), "expired countdown must not fire after reset");
        assert_eq!(keepalive.deadline(), Instant::now() + PERIOD - Duration::from_millis(100));
    }
}
