use rand::Rng;
use std::time::Duration;

use crate::types::{BACKOFF_BASE, BACKOFF_CAP};

/// Capped exponential backoff: `min(base * 2^(attempt - 1), cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Spread retries over `[delay / 2, delay]` in [`Backoff::next_delay`]
    pub jitter: bool,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (1-based). Attempt 0 is treated as 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let cap_ms = u64::try_from(self.cap.as_millis()).unwrap_or(u64::MAX);

        Duration::from_millis(base_ms.saturating_mul(factor).min(cap_ms))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BACKOFF_BASE),
            Duration::from_millis(BACKOFF_CAP),
        )
    }
}

/// Retry counter driving a [`BackoffPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempts: u32,
    limit: Option<u32>,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            limit: None,
        }
    }

    /// Gives up once more than `limit` retries have been requested
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Counts one failure and returns the delay before the next try, or
    /// `None` when the limit is exceeded.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        if let Some(limit) = self.limit
            && self.attempts > limit
        {
            return None;
        }

        let delay = self.policy.delay(self.attempts);
        if !self.policy.jitter {
            return Some(delay);
        }

        let full = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let jittered = rand::rng().random_range(full / 2..=full);
        Some(Duration::from_millis(jittered))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
