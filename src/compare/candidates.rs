//! Prioritized upload candidates.

use serde::Serialize;

use crate::catalog::{Group, Torrent};

use super::comparison::EditionComparison;

/// The release does not exist on the target at all.
pub const PRIORITY_MISSING_GROUP: u8 = 100;
/// The edition has no counterpart on the target.
pub const PRIORITY_NEW_EDITION: u8 = 50;
/// The media type is missing from the matched target edition.
pub const PRIORITY_NEW_MEDIA: u8 = 20;
/// Only the encoding is missing within a media the target already has.
pub const PRIORITY_NEW_ENCODING: u8 = 10;

/// Report label for a priority value.
#[must_use]
pub fn priority_label(priority: u8) -> &'static str {
    match priority {
        PRIORITY_MISSING_GROUP => "missing group",
        PRIORITY_NEW_EDITION => "new edition",
        PRIORITY_NEW_MEDIA => "new media",
        _ => "new encoding",
    }
}

/// A source torrent worth uploading to the target tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadCandidate {
    pub source_torrent: Torrent,
    pub edition_year: Option<i32>,
    pub edition_title: String,
    pub media: String,
    pub encoding: String,
    pub size: u64,
    pub priority: u8,
}

impl UploadCandidate {
    fn new(torrent: &Torrent, year: Option<i32>, title: &str, priority: u8) -> Self {
        Self {
            source_torrent: torrent.clone(),
            edition_year: year,
            edition_title: title.to_string(),
            media: torrent.media.clone(),
            encoding: torrent.encoding.clone(),
            size: torrent.size,
            priority,
        }
    }

    /// `{base_url}/torrents.php?torrentid={id}` on the source tracker.
    ///
    /// ```
    /// # use crossupload_core::compare::UploadCandidate;
    /// # use crossupload_core::catalog::Torrent;
    /// # let torrent = Torrent {
    /// #     torrent_id: 42, edition_id: None, media: "CD".into(), format: "FLAC".into(),
    /// #     encoding: "Lossless".into(), size: 1, remaster_year: None,
    /// #     remaster_title: String::new(), remaster_label: String::new(),
    /// #     remaster_catalog: String::new(),
    /// # };
    /// # let candidate = UploadCandidate {
    /// #     source_torrent: torrent, edition_year: None, edition_title: String::new(),
    /// #     media: "CD".into(), encoding: "Lossless".into(), size: 1, priority: 10,
    /// # };
    /// assert_eq!(
    ///     candidate.url("https://ops.example/"),
    ///     "https://ops.example/torrents.php?torrentid=42"
    /// );
    /// ```
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/torrents.php?torrentid={}",
            base_url.trim_end_matches('/'),
            self.source_torrent.torrent_id
        )
    }
}

/// Extracts candidates from comparisons, sorted by priority descending.
///
/// Ties keep encounter order (edition, then media, then encoding).
#[must_use]
pub fn find_upload_candidates(comparisons: &[EditionComparison]) -> Vec<UploadCandidate> {
    let mut candidates = Vec::new();
    for comparison in comparisons {
        let edition = &comparison.edition_match.source_edition;
        let matched = comparison.edition_match.is_matched();
        for media in &comparison.media_comparisons {
            let priority = if !matched && !comparison.pressing_on_target {
                PRIORITY_NEW_EDITION
            } else if !media.has_target_media() {
                PRIORITY_NEW_MEDIA
            } else {
                PRIORITY_NEW_ENCODING
            };
            candidates.extend(
                media
                    .encodings
                    .iter()
                    .filter(|e| e.is_upload_candidate())
                    .filter_map(|e| e.source_torrent.as_ref())
                    .map(|torrent| UploadCandidate::new(torrent, edition.year, &edition.title, priority)),
            );
        }
    }
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates
}

/// Every torrent of `source` at top priority, for releases the target lacks.
#[must_use]
pub fn missing_release_candidates(source: &Group) -> Vec<UploadCandidate> {
    source
        .editions
        .iter()
        .flat_map(|edition| {
            edition.torrents.iter().map(|torrent| {
                UploadCandidate::new(torrent, edition.year, &edition.title, PRIORITY_MISSING_GROUP)
            })
        })
        .collect()
}
