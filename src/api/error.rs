//! Error types for tracker API calls.
//!
//! Errors carry enough context (tracker, action) to be logged without the
//! request at hand.

use thiserror::Error;

/// Errors that can occur while calling a tracker API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rate limited or transient server fault (HTTP 429/5xx, throttle-shaped envelope).
    #[error("[{tracker}] throttled on {action}: {reason}")]
    Throttle {
        /// Tracker display name.
        tracker: String,
        /// API action being called.
        action: String,
        /// What the server returned.
        reason: String,
        /// HTTP status, when the throttle came from a status code.
        status: Option<u16>,
        /// Raw Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// The server answered with a payload that violates the API contract.
    #[error("[{tracker}] protocol error on {action}: {reason}")]
    Protocol {
        /// Tracker display name.
        tracker: String,
        /// API action being called.
        action: String,
        /// What was wrong with the response.
        reason: String,
        /// HTTP status, when the error came from a status code.
        status: Option<u16>,
    },

    /// Transport-level failure (DNS, connection refused, TLS).
    #[error("[{tracker}] network error on {action}: {source}")]
    Network {
        /// Tracker display name.
        tracker: String,
        /// API action being called.
        action: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the client timeout.
    #[error("[{tracker}] timeout on {action}")]
    Timeout {
        /// Tracker display name.
        tracker: String,
        /// API action being called.
        action: String,
    },

    /// The client cannot be used as configured.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is missing or invalid.
        reason: String,
    },

    /// All attempts failed with retryable errors.
    #[error("[{tracker}] request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Tracker display name.
        tracker: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: Box<ApiError>,
    },
}

impl ApiError {
    /// Creates a throttle error from an HTTP status.
    pub fn throttle_status(
        tracker: impl Into<String>,
        action: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::Throttle {
            tracker: tracker.into(),
            action: action.into(),
            reason: format!("HTTP {status}"),
            status: Some(status),
            retry_after,
        }
    }

    /// Creates a throttle error from a malformed "failure" envelope.
    pub fn throttle_shape(
        tracker: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Throttle {
            tracker: tracker.into(),
            action: action.into(),
            reason: reason.into(),
            status: None,
            retry_after: None,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(
        tracker: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Protocol {
            tracker: tracker.into(),
            action: action.into(),
            reason: reason.into(),
            status: None,
        }
    }

    /// Creates a protocol error for a non-retryable HTTP status.
    pub fn protocol_status(tracker: impl Into<String>, action: impl Into<String>, status: u16) -> Self {
        Self::Protocol {
            tracker: tracker.into(),
            action: action.into(),
            reason: format!("HTTP {status}"),
            status: Some(status),
        }
    }

    /// Creates a network error.
    pub fn network(
        tracker: impl Into<String>,
        action: impl Into<String>,
        source: reqwest::Error,
    ) -> Self {
        Self::Network {
            tracker: tracker.into(),
            action: action.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(tracker: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Timeout {
            tracker: tracker.into(),
            action: action.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// HTTP status attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Throttle { status, .. } | Self::Protocol { status, .. } => *status,
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

// No From<reqwest::Error>: every variant needs the tracker/action context.
