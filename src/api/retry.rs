//! Retry classification and backoff for tracker API calls.
//!
//! When a call fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - connection/timeout failures and 5xx statuses
//! - [`FailureType::RateLimited`] - HTTP 429 or a throttle-shaped envelope
//! - [`FailureType::Permanent`] - other 4xx, malformed payloads, configuration
//!
//! The [`RetryPolicy`] then decides whether to retry. Delays honor a numeric
//! `Retry-After` header and otherwise back off as 2, 4, 8 seconds.
//!
//! # Example
//!
//! ```
//! use crossupload_core::api::{ApiError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = ApiError::throttle_status("RED", "browse", 503, None);
//!
//! match policy.should_retry(classify_error(&error), 1, None) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay.as_secs(), 2);
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("{reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::ApiError;
use super::constants::{DEFAULT_MAX_ATTEMPTS, RETRYABLE_STATUSES};

/// Classification of API failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,
    /// Server-side throttling.
    RateLimited,
    /// Failure that won't succeed regardless of retries.
    Permanent,
}

/// Decision on whether to retry a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// The attempt number that will run next (1-indexed).
        attempt: u32,
    },
    /// Surface the error.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry configuration.
///
/// Delay for the retry after failed attempt `n` is `base_delay * 2^(n-1)`
/// unless the server sent a positive numeric `Retry-After`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(
        &self,
        failure_type: FailureType,
        attempt: u32,
        retry_after: Option<&str>,
    ) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = retry_after
            .and_then(parse_retry_after)
            .unwrap_or_else(|| self.backoff_delay(attempt));

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Exponential backoff: 2s, 4s, 8s with the default base.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Parses a numeric `Retry-After` value in seconds.
///
/// Accepts integers and floats (truncated). Zero, negative and non-numeric
/// values yield `None` so the caller falls back to backoff.
///
/// ```
/// use std::time::Duration;
/// use crossupload_core::api::parse_retry_after;
///
/// assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
/// assert_eq!(parse_retry_after("2.9"), Some(Duration::from_secs(2)));
/// assert_eq!(parse_retry_after("0"), None);
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds = value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 1.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(Duration::from_secs(seconds.trunc() as u64))
}

/// Classifies an API error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Throttle with 429 or no status | RateLimited |
/// | Throttle with 5xx | Transient |
/// | Network, Timeout | Transient |
/// | Protocol, Configuration | Permanent |
#[must_use]
pub fn classify_error(error: &ApiError) -> FailureType {
    match error {
        ApiError::Throttle { status, .. } => match status {
            Some(429) | None => FailureType::RateLimited,
            Some(s) if RETRYABLE_STATUSES.contains(s) => FailureType::Transient,
            Some(_) => FailureType::Permanent,
        },
        ApiError::Network { source, .. } => {
            if source.is_builder() || source.is_decode() {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        ApiError::Timeout { .. } => FailureType::Transient,
        ApiError::Protocol { .. }
        | ApiError::Configuration { .. }
        | ApiError::RetriesExhausted { .. } => FailureType::Permanent,
    }
}

/// Returns true when an HTTP status should be retried.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}
