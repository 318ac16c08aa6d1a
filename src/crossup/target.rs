//! Interpreting the CLI target: group id, group URL or collage URL.

use url::Url;

use crate::catalog::parse_collage_url;
use crate::tracker::TrackerConfig;

use super::CrossUploadError;

/// Tracker key assumed for a bare numeric group id.
pub const DEFAULT_SOURCE_TRACKER: &str = "red";

/// What to process, on which source tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One torrent group.
    Group { tracker: String, group_id: i64 },
    /// Every group of a collage, from `page` onward.
    Collage {
        tracker: String,
        collage_id: i64,
        page: u32,
    },
}

impl Target {
    /// Source tracker key.
    #[must_use]
    pub fn tracker(&self) -> &str {
        match self {
            Self::Group { tracker, .. } | Self::Collage { tracker, .. } => tracker,
        }
    }
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn is_group_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    lowered.contains("torrents.php") || lowered.contains("torrentgroup")
}

/// Finds the configured tracker serving `target_url`, by host or by prefix.
///
/// # Errors
///
/// [`CrossUploadError::UnknownTracker`] when no tracker matches.
pub fn find_tracker_by_url<'a>(
    trackers: &'a [TrackerConfig],
    target_url: &str,
) -> Result<&'a TrackerConfig, CrossUploadError> {
    let target_host = Url::parse(target_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    let lowered = target_url.to_lowercase();
    trackers
        .iter()
        .find(|tracker| {
            let host_matches = Url::parse(tracker.base_url())
                .ok()
                .and_then(|u| u.host_str().map(str::to_lowercase))
                .is_some_and(|host| !host.is_empty() && target_host.contains(&host));
            host_matches || lowered.starts_with(&tracker.base_url().to_lowercase())
        })
        .ok_or_else(|| CrossUploadError::UnknownTracker {
            url: target_url.to_string(),
        })
}

/// Parses the CLI target.
///
/// A bare number is a group id on `tracker_key` (default `red`). URLs are
/// matched against `trackers`; `torrents.php` paths are group pages and
/// anything else is treated as a collage.
///
/// # Errors
///
/// [`CrossUploadError::InvalidTarget`] for unparseable input,
/// [`CrossUploadError::UnknownTracker`] for URLs of unconfigured trackers,
/// [`CrossUploadError::Collage`] for malformed collage URLs.
pub fn parse_target(
    target: &str,
    tracker_key: Option<&str>,
    trackers: &[TrackerConfig],
) -> Result<Target, CrossUploadError> {
    let target = target.trim();
    if !is_url(target) {
        let group_id = target
            .parse::<i64>()
            .map_err(|_| CrossUploadError::invalid_target(target, "group id must be numeric"))?;
        let tracker = tracker_key
            .unwrap_or(DEFAULT_SOURCE_TRACKER)
            .trim()
            .to_lowercase();
        return Ok(Target::Group { tracker, group_id });
    }

    let tracker = find_tracker_by_url(trackers, target)?.name.clone();
    let url = Url::parse(target)
        .map_err(|e| CrossUploadError::invalid_target(target, e.to_string()))?;
    if is_group_path(url.path()) {
        let raw_id = url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                CrossUploadError::invalid_target(target, "group URL must include an id parameter")
            })?;
        let group_id = raw_id
            .parse::<i64>()
            .map_err(|_| CrossUploadError::invalid_target(target, "group id must be numeric"))?;
        return Ok(Target::Group { tracker, group_id });
    }

    let (collage_id, page) = parse_collage_url(target)?;
    Ok(Target::Collage {
        tracker,
        collage_id,
        page,
    })
}
