use std::time::Duration;
use tokio::time::Instant;

/// Paces the polling loop at a fixed period.
///
/// The reference point is reset after every sleep instead of advancing from a
/// fixed origin, so one overlong iteration never causes catch-up iterations.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Time left until `period` has passed since the last reset, zero if it already has.
    pub fn remaining(&self, period: Duration) -> Duration {
        period.saturating_sub(self.elapsed())
    }

    /// Sleep for whatever is left of `period` and start measuring the next one.
    /// Returns how long it slept.
    pub async fn sleep_delta(&mut self, period: Duration) -> Duration {
        let delta = self.remaining(period);
        if !delta.is_zero() {
            tokio::time::sleep(delta).await;
        }
        self.reset();
        delta
    }
}
