//! Reconnection policy and backoff math.
//!
//! Runtime-agnostic: the Connection Manager owns the timers and asks this module
//! how long to wait before each retry.

use std::time::Duration;

pub const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Bounds for automatic reconnection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Retries allowed after a failure before giving up (the first attempt is not counted)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for exponential growth
    pub max_delay: Duration,
    /// A handshake that takes longer than this counts as a failed attempt
    pub handshake_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_RETRY_DELAY_MS),
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
        }
    }
}

/// Exponential backoff state for one run of consecutive failures.
///
/// Delays are never zero and never shrink.
#[derive(Debug, Clone)]
pub struct BackoffState {
    attempts: u32,
    delay: Duration,
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl BackoffState {
    pub fn new(policy: &ReconnectPolicy) -> Self {
        let initial_delay = policy.initial_delay.max(Duration::from_millis(1));
        Self {
            attempts: 0,
            delay: initial_delay,
            initial_delay,
            max_delay: policy.max_delay.max(initial_delay),
            max_attempts: policy.max_attempts,
        }
    }

    /// Start a fresh run (after a successful connection).
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.delay = self.initial_delay;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Advance to the next attempt, updating the delay for the subsequent attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// once the budget is spent.
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let current_delay = self.delay;
        self.attempts += 1;
        self.delay = self.delay.mul_f64(BACKOFF_MULTIPLIER).min(self.max_delay);
        Some(current_delay)
    }
}
