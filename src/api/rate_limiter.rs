//! Per-server request pacing shared by every tracker client.
//!
//! This module provides the [`ServerPacer`] which enforces, per logical server,
//! a minimum interval between request *starts* and an optional sliding-window
//! ceiling (N requests per 10 seconds).
//!
//! # Overview
//!
//! A logical server is the normalized base URL (lowercased, trailing slash
//! stripped) plus the auth mode. Different servers never wait on each other.
//! Both constraints are checked while holding the server's mutex, and the
//! dispatch timestamp is recorded before the mutex is released, so concurrent
//! callers serialize their starts even though the HTTP transfers overlap.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use crossupload_core::api::ServerPacer;
//!
//! # async fn example() {
//! let pacer = Arc::new(ServerPacer::new());
//!
//! // First request proceeds immediately
//! pacer.acquire("https://red.example", "api_key", Duration::from_secs(2), Some(10)).await;
//!
//! // Second request to the same server waits out the interval
//! pacer.acquire("https://RED.example/", "api_key", Duration::from_secs(2), Some(10)).await;
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::constants::RATE_LIMIT_WINDOW;

/// Key identifying one logical server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerKey {
    /// Lowercased base URL without trailing slash.
    pub base_url: String,
    /// Lowercased auth mode (`api_key`, `standard`).
    pub auth_mode: String,
}

impl ServerKey {
    /// Builds a normalized key.
    ///
    /// ```
    /// use crossupload_core::api::ServerKey;
    ///
    /// let a = ServerKey::new("https://Red.Example/", "API_KEY");
    /// let b = ServerKey::new("https://red.example", "api_key");
    /// assert_eq!(a, b);
    /// ```
    #[must_use]
    pub fn new(base_url: &str, auth_mode: &str) -> Self {
        let auth_mode = auth_mode.trim().to_lowercase();
        Self {
            base_url: normalize_server_url(base_url),
            auth_mode: if auth_mode.is_empty() {
                "api_key".to_string()
            } else {
                auth_mode
            },
        }
    }
}

/// Lowercases a base URL and strips trailing slashes.
#[must_use]
pub fn normalize_server_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_lowercase()
}

/// Pacing state for one server.
#[derive(Debug, Default)]
struct Bucket {
    /// `None` until the first request (first request is immediate).
    last_request_started: Option<Instant>,
    /// Starts within the current window, oldest first.
    request_starts: VecDeque<Instant>,
}

impl Bucket {
    fn prune_window(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.request_starts.front() {
            if now.duration_since(*oldest) >= window {
                self.request_starts.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Process-wide or test-local registry of per-server pacing buckets.
///
/// Wrap in `Arc` and hand the same instance to every client that talks to the
/// same trackers. Buckets are created lazily and kept for the pacer lifetime.
#[derive(Debug)]
pub struct ServerPacer {
    window: Duration,
    /// Arc lets the `DashMap` shard lock be released before awaiting the bucket mutex.
    buckets: DashMap<ServerKey, Arc<Mutex<Bucket>>>,
}

impl Default for ServerPacer {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_PACER: OnceLock<Arc<ServerPacer>> = OnceLock::new();

impl ServerPacer {
    /// Creates an empty pacer using the standard 10 second window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(RATE_LIMIT_WINDOW)
    }

    /// Creates an empty pacer with a custom sliding window.
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            buckets: DashMap::new(),
        }
    }

    /// Shared process-wide pacer used when a client is built without one.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_PACER.get_or_init(|| Arc::new(Self::new())))
    }

    /// Number of servers with pacing state.
    #[must_use]
    pub fn server_count(&self) -> usize {
        self.buckets.len()
    }

    /// Waits until a request to `base_url` may start, then records the start.
    ///
    /// Returns the wait that was applied.
    #[instrument(skip(self), fields(server))]
    pub async fn acquire(
        &self,
        base_url: &str,
        auth_mode: &str,
        min_interval: Duration,
        request_limit: Option<usize>,
    ) -> Duration {
        let key = ServerKey::new(base_url, auth_mode);
        tracing::Span::current().record("server", key.base_url.as_str());

        let bucket = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Bucket::default())))
            .clone();

        let mut bucket = bucket.lock().await;
        let mut now = Instant::now();

        let min_wait = bucket
            .last_request_started
            .map_or(Duration::ZERO, |last| {
                min_interval.saturating_sub(now.duration_since(last))
            });

        let window_wait = match request_limit {
            Some(limit) if limit > 0 => {
                bucket.prune_window(now, self.window);
                if bucket.request_starts.len() >= limit {
                    bucket.request_starts.front().map_or(Duration::ZERO, |oldest| {
                        self.window.saturating_sub(now.duration_since(*oldest))
                    })
                } else {
                    Duration::ZERO
                }
            }
            _ => {
                bucket.request_starts.clear();
                Duration::ZERO
            }
        };

        let wait = min_wait.max(window_wait);
        if !wait.is_zero() {
            debug!(
                server = %key.base_url,
                min_wait_ms = min_wait.as_millis(),
                window_wait_ms = window_wait.as_millis(),
                "pacing request"
            );
            tokio::time::sleep(wait).await;
            now = Instant::now();
            if request_limit.is_some() {
                bucket.prune_window(now, self.window);
            }
        }

        bucket.last_request_started = Some(now);
        if request_limit.is_some_and(|limit| limit > 0) {
            bucket.request_starts.push_back(now);
        }
        wait
    }
}
