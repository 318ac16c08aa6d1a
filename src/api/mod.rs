//! Rate-limited, retrying access to Gazelle tracker APIs.
//!
//! # Features
//!
//! - Per-server pacing shared across clients ([`ServerPacer`]): minimum
//!   interval between request starts plus an optional sliding-window ceiling
//! - Bounded parallelism per client (counting semaphore)
//! - Retries for connection errors, timeouts and HTTP 429/5xx, honoring
//!   numeric `Retry-After`
//! - Envelope validation that treats throttle-shaped bodies as throttling
//!
//! # Example
//!
//! ```no_run
//! use crossupload_core::api::{BrowseParams, ClientOptions, TrackerClient};
//! use crossupload_core::tracker::TrackerConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = TrackerConfig::new("red", "https://redacted.example", "api-key");
//! let client = TrackerClient::new(tracker, ClientOptions::default())?;
//! let body = client
//!     .browse(&BrowseParams {
//!         artistname: Some("Boards of Canada".into()),
//!         ..BrowseParams::default()
//!     })
//!     .await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
pub mod envelope;
mod error;
pub mod rate_limiter;
mod retry;

pub use client::{BrowseParams, ClientOptions, TrackerClient};
pub use envelope::{ShapeError, response_payload};
pub use error::ApiError;
pub use rate_limiter::{ServerKey, ServerPacer, normalize_server_url};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error, parse_retry_after};
