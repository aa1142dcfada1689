//! Retry logic for the shadow path.
//!
//! # Responsibilities
//! - Decide after each shadow attempt whether to stop, retry or give up
//! - Hold the constant inter-attempt interval
//!
//! # Design Decisions
//! - Only 5xx responses are retried; any other status is final
//! - Transport errors are never retried (the dispatcher stops on them)
//! - Constant interval, no backoff or jitter

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::RetryConfig;

/// What to do after an attempt returned a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The response is final.
    Stop,
    /// Sleep for the interval and try again.
    Retry,
    /// Still failing on the last allowed attempt.
    GiveUp,
}

/// Bounded retry policy: `max_attempts` calls at most, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.interval())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide after `attempt` (1-based) returned `status`.
    pub fn decide(&self, status: StatusCode, attempt: u32) -> RetryDecision {
        if !is_retryable(status) {
            RetryDecision::Stop
        } else if attempt < self.max_attempts {
            RetryDecision::Retry
        } else {
            RetryDecision::GiveUp
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Returns true for statuses in `[500, 599]`.
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_server_errors_are_retryable() {
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_retryable(StatusCode::from_u16(599).unwrap()));

        assert!(!is_retryable(StatusCode::OK));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::MOVED_PERMANENTLY));
    }

    #[test]
    fn test_decisions() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        assert_eq!(policy.decide(StatusCode::OK, 1), RetryDecision::Stop);
        assert_eq!(policy.decide(StatusCode::BAD_REQUEST, 1), RetryDecision::Stop);
        assert_eq!(policy.decide(StatusCode::BAD_GATEWAY, 1), RetryDecision::Retry);
        assert_eq!(policy.decide(StatusCode::BAD_GATEWAY, 2), RetryDecision::Retry);
        assert_eq!(policy.decide(StatusCode::BAD_GATEWAY, 3), RetryDecision::GiveUp);
        assert_eq!(policy.decide(StatusCode::OK, 3), RetryDecision::Stop);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy::new(1, Duration::ZERO);
        assert_eq!(policy.decide(StatusCode::INTERNAL_SERVER_ERROR, 1), RetryDecision::GiveUp);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
