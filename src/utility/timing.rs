// ============================================
// TIMING UTILITY
// ============================================
// Usage:
//   let timer = Timer::start("render pass"); ... timer.stop();
//   let value = timed_async("load TSLA", || load(...)).await;
// ============================================

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Operations at or above this are logged at `warn`
pub const SLOW_MS: u128 = 1_000;

/// Wall-clock timer that reports through `tracing` when stopped or dropped
pub struct Timer {
    name: String,
    start: Instant,
    threshold_ms: u128,
    reported: bool,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self::start_with_threshold(name, 0)
    }

    /// Only report if the elapsed time reaches `threshold_ms`
    pub fn start_with_threshold(name: impl Into<String>, threshold_ms: u128) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            threshold_ms,
            reported: false,
        }
    }

    pub fn stop(mut self) -> Duration {
        let duration = self.start.elapsed();
        self.report(duration);
        duration
    }

    fn report(&mut self, duration: Duration) {
        if self.reported {
            return;
        }
        self.reported = true;

        let ms = duration.as_millis();
        if ms < self.threshold_ms {
            return;
        }

        match ms {
            0..=100 => debug!(name = %self.name, elapsed_ms = ms as u64, "timing"),
            101..SLOW_MS => info!(name = %self.name, elapsed_ms = ms as u64, "timing"),
            _ => warn!(name = %self.name, elapsed_ms = ms as u64, "slow operation"),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.report(duration);
    }
}

/// Time a synchronous closure
pub fn timed<F, R>(name: impl Into<String>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let timer = Timer::start(name);
    let result = f();
    timer.stop();
    result
}

/// Time an async function
pub async fn timed_async<F, Fut, R>(name: impl Into<String>, f: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    let timer = Timer::start(name);
    let result = f().await;
    timer.stop();
    result
}
