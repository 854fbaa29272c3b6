use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a caller should retry a throttled operation.
///
/// The policy is a plain value; the async code consuming it decides where to
/// sleep, so it works with any scheduler and can be cancelled by dropping
/// the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed before giving up. `0` means the first failure is final.
    pub max_attempts: u8,
    /// Delay before the first retry; doubled on each further attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Add 0-25% random jitter to each delay.
    pub jitter: bool,
    /// Overall wall-clock budget for the whole operation, if any.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
            deadline: None,
        }
    }
}

/// Result of asking a policy what to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u8, delay: Duration },
    Exhausted { attempts: u8 },
}

impl RetryPolicy {
    /// Decide what happens after the `attempt`-th failure (1-based).
    pub fn on_failure(&self, attempt: u8) -> RetryDecision {
        if attempt > self.max_attempts {
            RetryDecision::Exhausted { attempts: attempt }
        } else {
            RetryDecision::Retry {
                attempt,
                delay: self.delay_for(attempt),
            }
        }
    }

    /// Backoff delay for the given 1-based attempt.
    pub fn delay_for(&self, attempt: u8) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        if self.jitter {
            calculate_backoff(attempt, base_ms, max_ms)
        } else {
            exponential_delay(attempt, base_ms, max_ms)
        }
    }
}

fn exponential_delay(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let exp_factor = 2u64.saturating_pow((attempt - 1) as u32);
    Duration::from_millis(base_ms.saturating_mul(exp_factor).min(max_ms))
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow((attempt - 1) as u32);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    let total_delay = delay_ms.saturating_add(jitter).min(max_ms);
    Duration::from_millis(total_delay)
}
