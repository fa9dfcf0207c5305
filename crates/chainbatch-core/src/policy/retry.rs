//! Exponential backoff retry scheduling.
//!
//! The scheduler is stateless: every decision is recomputed from the
//! classification of the latest failure and the attempt number.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classifier::{NETWORK_ERROR, TIMEOUT_ERROR};
use crate::types::{ErrorCategory, ErrorClassification};

/// Codes retried even when their category alone would not qualify.
pub const TRANSIENT_CODES: &[&str] = &[
    "ERR_SEQUENCE_MISMATCH",
    "ERR_RATE_LIMITED",
    "ERR_MEMPOOL_FULL",
    "ERR_SERVICE_UNAVAILABLE",
    "ERR_NODE_SYNCING",
    TIMEOUT_ERROR,
    NETWORK_ERROR,
];

/// Configuration for the retry scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on any single backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Extra factor for network failures, applied before the cap.
    #[serde(default = "default_network_multiplier")]
    pub network_multiplier: u64,
}

fn default_base_delay_ms() -> u64 { 1_000 }
fn default_max_delay_ms() -> u64 { 30_000 }
fn default_network_multiplier() -> u64 { 2 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            network_multiplier: default_network_multiplier(),
        }
    }
}

/// Whether to try again, and after how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay_ms: u64,
}

impl RetryDecision {
    pub const STOP: RetryDecision = RetryDecision {
        should_retry: false,
        delay_ms: 0,
    };

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Stateless retry scheduler.
#[derive(Debug, Clone, Default)]
pub struct RetryScheduler {
    pub config: RetryConfig,
}

impl RetryScheduler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// `true` if a failure with this classification is worth retrying at all.
    pub fn is_retryable(&self, classification: &ErrorClassification) -> bool {
        classification.recoverable
            && (matches!(
                classification.category,
                ErrorCategory::Network | ErrorCategory::System
            ) || TRANSIENT_CODES.contains(&classification.code.as_str()))
    }

    /// Backoff before retrying after the `attempt`-th (1-based) failure:
    /// `min(max_delay, base * 2^(attempt-1))`, with network failures
    /// multiplied before the cap.
    pub fn backoff_ms(&self, category: ErrorCategory, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(63);
        let mut delay = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << exponent);
        if category == ErrorCategory::Network {
            delay = delay.saturating_mul(self.config.network_multiplier);
        }
        delay.min(self.config.max_delay_ms)
    }

    /// Decide what to do after the `attempt`-th attempt failed, given an
    /// overall budget of `max_attempts`.
    pub fn decide(
        &self,
        classification: &ErrorClassification,
        attempt: u32,
        max_attempts: u32,
    ) -> RetryDecision {
        if attempt >= max_attempts || !self.is_retryable(classification) {
            return RetryDecision::STOP;
        }
        RetryDecision {
            should_retry: true,
            delay_ms: self.backoff_ms(classification.category, attempt),
        }
    }

    /// The full delay schedule a persistently failing operation with this
    /// classification would see.
    pub fn schedule(&self, classification: &ErrorClassification, max_attempts: u32) -> Vec<u64> {
        (1..=max_attempts)
            .map(|attempt| self.decide(classification, attempt, max_attempts))
            .take_while(|d| d.should_retry)
            .map(|d| d.delay_ms)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(code: &str, category: ErrorCategory, recoverable: bool) -> ErrorClassification {
        ErrorClassification::new(code, "test", category, recoverable)
    }

    #[test]
    fn system_backoff_doubles() {
        let s = RetryScheduler::default();
        let c = class("ERR_INTERNAL", ErrorCategory::System, true);
        assert_eq!(s.decide(&c, 1, 5).delay_ms, 1_000);
        assert_eq!(s.decide(&c, 2, 5).delay_ms, 2_000);
        assert_eq!(s.decide(&c, 3, 5).delay_ms, 4_000);
        assert_eq!(s.decide(&c, 4, 5).delay_ms, 8_000);
    }

    #[test]
    fn network_backoff_doubles_before_cap() {
        let s = RetryScheduler::default();
        let c = class(TIMEOUT_ERROR, ErrorCategory::Network, true);
        for attempt in 1..10 {
            let expected = (1_000u64 * 2u64.pow(attempt - 1) * 2).min(30_000);
            let d = s.decide(&c, attempt, 10);
            assert!(d.should_retry);
            assert_eq!(d.delay_ms, expected, "attempt {attempt}");
        }
    }

    #[test]
    fn delay_capped_at_max() {
        let s = RetryScheduler::default();
        assert_eq!(s.backoff_ms(ErrorCategory::System, 6), 30_000);
        assert_eq!(s.backoff_ms(ErrorCategory::Network, 5), 30_000);
        // huge attempt counts saturate instead of overflowing
        assert_eq!(s.backoff_ms(ErrorCategory::Network, u32::MAX), 30_000);
    }

    #[test]
    fn exhaustion_stops_retry() {
        let s = RetryScheduler::default();
        let c = class(NETWORK_ERROR, ErrorCategory::Network, true);
        assert!(s.decide(&c, 2, 3).should_retry);
        assert_eq!(s.decide(&c, 3, 3), RetryDecision::STOP);
        assert_eq!(s.decide(&c, 4, 3), RetryDecision::STOP);
    }

    #[test]
    fn non_recoverable_never_retries() {
        let s = RetryScheduler::default();
        let c = class("ERR_INTERNAL", ErrorCategory::System, false);
        assert_eq!(s.decide(&c, 1, 10), RetryDecision::STOP);
    }

    #[test]
    fn recoverable_contract_error_needs_allow_list() {
        let s = RetryScheduler::default();
        let balance = class("ERR_INSUFFICIENT_BALANCE", ErrorCategory::Contract, true);
        assert!(!s.decide(&balance, 1, 3).should_retry);

        let sequence = class("ERR_SEQUENCE_MISMATCH", ErrorCategory::Contract, true);
        let d = s.decide(&sequence, 1, 3);
        assert!(d.should_retry);
        assert_eq!(d.delay_ms, 1_000);
    }

    #[test]
    fn wallet_errors_are_not_retried() {
        let s = RetryScheduler::default();
        let c = class("WALLET_ERROR", ErrorCategory::Wallet, true);
        assert!(!s.is_retryable(&c));
    }

    #[test]
    fn timeout_schedule_matches_three_attempts() {
        let s = RetryScheduler::default();
        let c = class(TIMEOUT_ERROR, ErrorCategory::Network, true);
        assert_eq!(s.schedule(&c, 3), vec![2_000, 4_000]);
    }

    #[test]
    fn custom_config() {
        let s = RetryScheduler::new(RetryConfig {
            base_delay_ms: 100,
            max_delay_ms: 500,
            network_multiplier: 3,
        });
        assert_eq!(s.backoff_ms(ErrorCategory::Network, 1), 300);
        assert_eq!(s.backoff_ms(ErrorCategory::Network, 2), 500);
        assert_eq!(s.backoff_ms(ErrorCategory::System, 3), 400);
    }
}
