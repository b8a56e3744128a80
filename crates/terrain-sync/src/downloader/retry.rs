//! Retry policy
//!
//! A pure decision function: given how many attempts a target has had and
//! what kind of failure the last one was, decide whether to go again and how
//! long to wait first. No I/O and no state, so it is tested directly.

use std::time::Duration;

use crate::downloader::config::SyncConfig;
use crate::downloader::core::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay_before_next_attempt: Duration,
}

impl RetryDecision {
    pub fn give_up() -> Self {
        Self {
            should_retry: false,
            delay_before_next_attempt: Duration::ZERO,
        }
    }

    pub fn retry_after(delay: Duration) -> Self {
        Self {
            should_retry: true,
            delay_before_next_attempt: delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay, config.max_retry_delay)
    }

    /// First attempt plus every allowed retry
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide what to do after `attempts_made` attempts, the last of which failed with `kind`
    pub fn decide(&self, attempts_made: u32, kind: FailureKind) -> RetryDecision {
        if kind != FailureKind::Transient || attempts_made >= self.max_attempts() {
            return RetryDecision::give_up();
        }
        RetryDecision::retry_after(self.backoff(attempts_made))
    }

    /// `base × 2^(attempts_made - 1)`, capped at the configured ceiling
    pub fn backoff(&self, attempts_made: u32) -> Duration {
        let exponent = attempts_made.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
