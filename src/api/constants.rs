//! Constants for the tracker API client (timeouts, pacing, retries).

use std::time::Duration;

/// Default total timeout for one HTTP call (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default minimum interval between request starts to the same server.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(2000);

/// Sliding window used for per-tracker request ceilings.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(10);

/// Pacing waits longer than this are logged at info level.
pub const WAIT_LOG_THRESHOLD: Duration = Duration::from_millis(1750);

/// Default bound on concurrent in-flight requests per client.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// HTTP statuses worth retrying.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
