//! Monitoring thresholds and the sleep seam used between iterations

use async_trait::async_trait;
use std::time::Duration;

/// Default poll interval while healthy
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
/// Consecutive failed checks before a restart is attempted
pub const DEFAULT_MAX_FAILURES: u32 = 3;
/// Restart attempts before escalating to manual intervention
pub const DEFAULT_MAX_RESTART_ATTEMPTS: u32 = 5;
/// Pause after a restart before the next check
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Thresholds and delays driving one monitor task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPolicy {
    /// Poll interval while healthy
    pub interval: Duration,
    /// Consecutive failures that trigger a restart
    pub max_failures: u32,
    /// Restart attempts allowed before escalation
    pub max_restart_attempts: u32,
    /// Delay after a restart attempt, successful or not
    pub settle_delay: Duration,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_failures: DEFAULT_MAX_FAILURES,
            max_restart_attempts: DEFAULT_MAX_RESTART_ATTEMPTS,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl MonitorPolicy {
    /// Same thresholds with a different poll interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll interval while degraded (half the normal interval)
    pub fn degraded_interval(&self) -> Duration {
        self.interval / 2
    }
}

/// Suspends a monitor task between iterations
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
