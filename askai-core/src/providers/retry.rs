//! Backoff plan for rate-limited upstream calls
//!
//! The relay retries with a linear ramp: the wait after attempt `n` is
//! `base_delay * n`. There is no jitter and no cap other than the attempt
//! budget.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of upstream calls per relay invocation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default base delay between attempts
pub const DEFAULT_BASE_DELAY_MS: u64 = 4_000;

/// Upper bound on the total time a plan may spend sleeping
pub const MAX_TOTAL_BACKOFF: Duration = Duration::from_secs(60);

/// Attempt budget and delay sequence, fixed for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffPlan {
    /// Total number of upstream calls, including the first one
    pub max_attempts: u32,

    /// Delay unit (milliseconds); attempt `n` waits `n` units
    pub base_delay_ms: u64,
}

impl Default for BackoffPlan {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl BackoffPlan {
    /// Create a plan with the given attempt budget and base delay
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay to wait after the failed attempt `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }

    /// Whether another call may follow attempt `attempt`
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Worst-case time spent sleeping across the whole budget
    pub fn total_budget(&self) -> Duration {
        // base * (1 + 2 + ... + (max_attempts - 1))
        let waits = u64::from(self.max_attempts.saturating_sub(1));
        let units = waits.saturating_mul(waits + 1) / 2;
        Duration::from_millis(self.base_delay_ms.saturating_mul(units))
    }
}
