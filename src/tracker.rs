//! Tracker capability profiles and Authorization header formatting.
//!
//! Each supported Gazelle tracker has slightly different API policy: which
//! profile lists it exposes, how many requests it tolerates per pacing window,
//! and whether its API key must be sent with a `token ` prefix. Rules are kept
//! explicit per tracker rather than assuming all Gazelle variants agree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Static policy for one tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerProfile {
    /// Profile list types (`user_torrents` `type` values) in display order.
    pub list_types: &'static [&'static str],
    /// Requests allowed per sliding pacing window, if the tracker throttles harder.
    pub request_limit: Option<usize>,
    /// Whether the Authorization header needs a `token ` prefix.
    pub token_auth: bool,
}

const OPS_PROFILE: TrackerProfile = TrackerProfile {
    list_types: &["snatched", "uploaded", "seeding", "leeching"],
    request_limit: Some(5),
    token_auth: true,
};

const RED_PROFILE: TrackerProfile = TrackerProfile {
    list_types: &["seeding", "leeching", "uploaded", "snatched"],
    request_limit: Some(10),
    token_auth: false,
};

/// Names of all trackers with a known profile, sorted.
pub const SUPPORTED_TRACKERS: [&str; 2] = ["ops", "red"];

/// Raised when a tracker name has no known profile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported tracker '{name}'. Supported trackers: {supported}")]
pub struct UnsupportedTracker {
    /// The name as supplied by the caller.
    pub name: String,
    /// Upper-cased, comma-separated list of supported tracker names.
    pub supported: String,
}

/// Connection settings for one tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Short tracker name (`red`, `ops`).
    pub name: String,
    /// Site base URL, e.g. `https://redacted.sh`.
    pub url: String,
    /// API key; empty means "not configured".
    #[serde(default)]
    pub api_key: String,
}

impl TrackerConfig {
    /// Creates a tracker config.
    pub fn new(name: impl Into<String>, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Upper-cased display name used in logs and reports.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.to_uppercase()
    }

    /// URL of a torrent group page on this tracker.
    #[must_use]
    pub fn group_url(&self, group_id: i64) -> String {
        format!("{}/torrents.php?id={group_id}", self.base_url())
    }

    /// URL of a single torrent on this tracker.
    #[must_use]
    pub fn torrent_url(&self, torrent_id: i64) -> String {
        format!("{}/torrents.php?torrentid={torrent_id}", self.base_url())
    }
}

fn normalize_tracker_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Looks up the profile for a tracker name (case-insensitive).
///
/// # Errors
///
/// Returns [`UnsupportedTracker`] for names without a profile.
pub fn resolve_tracker_profile(name: &str) -> Result<TrackerProfile, UnsupportedTracker> {
    match normalize_tracker_name(name).as_str() {
        "ops" => Ok(OPS_PROFILE),
        "red" => Ok(RED_PROFILE),
        _ => Err(UnsupportedTracker {
            name: name.to_string(),
            supported: SUPPORTED_TRACKERS
                .iter()
                .map(|n| n.to_uppercase())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Returns the Authorization header value for a tracker.
///
/// Pure: the same `(tracker, key)` always produces the same header.
///
/// # Errors
///
/// Returns [`UnsupportedTracker`] for trackers without a profile.
pub fn build_tracker_auth_header(tracker: &str, api_key: &str) -> Result<String, UnsupportedTracker> {
    let profile = resolve_tracker_profile(tracker)?;
    let key = api_key.trim();
    if profile.token_auth && !key.to_lowercase().starts_with("token ") {
        return Ok(format!("token {key}"));
    }
    Ok(key.to_string())
}

/// Per-tracker sliding-window request ceiling for an auth mode.
///
/// `standard` session auth is stricter than API-key auth on RED; OPS only
/// supports API keys.
#[must_use]
pub fn window_request_limit(tracker: &str, auth_mode: &str) -> Option<usize> {
    let auth_mode = auth_mode.trim().to_lowercase();
    let auth_mode = if auth_mode.is_empty() { "api_key" } else { auth_mode.as_str() };
    match (normalize_tracker_name(tracker).as_str(), auth_mode) {
        ("red", "api_key") => RED_PROFILE.request_limit,
        ("red", "standard") => Some(5),
        ("ops", "api_key") => OPS_PROFILE.request_limit,
        _ => None,
    }
}
