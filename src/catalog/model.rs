//! Normalized catalog entities shared by both trackers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::{int_field, str_field};

/// One uploaded file-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Torrent {
    /// Tracker-unique torrent id.
    pub torrent_id: i64,
    /// Tracker-assigned edition grouping key, when the payload carries one.
    pub edition_id: Option<i64>,
    /// Media type (`CD`, `WEB`, `Vinyl`, `SACD`, ...).
    pub media: String,
    /// Container/codec family (`FLAC`, `MP3`).
    pub format: String,
    /// Encoding (`Lossless`, `24bit Lossless`, `320`, `V0 (VBR)`).
    pub encoding: String,
    /// Size in bytes.
    pub size: u64,
    /// Remaster year; zero in the payload becomes `None`.
    pub remaster_year: Option<i32>,
    /// Remaster title.
    pub remaster_title: String,
    /// Remaster record label.
    pub remaster_label: String,
    /// Remaster catalogue number.
    pub remaster_catalog: String,
}

/// A pressing or remaster of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    /// Tracker edition id, if known.
    pub edition_id: Option<i64>,
    /// Edition year.
    pub year: Option<i32>,
    /// Edition title.
    pub title: String,
    /// Record label.
    pub label: String,
    /// Catalogue number.
    pub catalog: String,
    /// Torrents of this pressing, in payload order.
    pub torrents: Vec<Torrent>,
}

impl Edition {
    /// Distinct media types present in this edition, sorted.
    #[must_use]
    pub fn media_types(&self) -> std::collections::BTreeSet<&str> {
        self.torrents.iter().map(|t| t.media.as_str()).collect()
    }

    /// Number of media types shared with `other`.
    #[must_use]
    pub fn media_overlap(&self, other: &Edition) -> usize {
        self.media_types().intersection(&other.media_types()).count()
    }

    /// `(year, title, label, catalog)` with trimmed strings.
    #[must_use]
    pub fn metadata_tuple(&self) -> (Option<i32>, &str, &str, &str) {
        (
            self.year,
            self.title.trim(),
            self.label.trim(),
            self.catalog.trim(),
        )
    }

    /// One-line `ID / YEAR / TITLE / LABEL / CATALOG` description.
    #[must_use]
    pub fn describe(&self) -> String {
        let id = self
            .edition_id
            .map_or_else(|| "ID (none)".to_string(), |id| format!("ID {id}"));
        let year = self
            .year
            .map_or_else(|| "(no year)".to_string(), |y| y.to_string());
        let or_none = |value: &str, label: &str| {
            if value.is_empty() {
                format!("(no {label})")
            } else {
                value.to_string()
            }
        };
        format!(
            "{id} / {year} / {} / {} / {}",
            or_none(&self.title, "title"),
            or_none(&self.label, "label"),
            or_none(&self.catalog, "catalog")
        )
    }
}

/// A release as known to one tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Tracker group id.
    pub group_id: i64,
    /// Album name.
    pub name: String,
    /// Primary artist.
    pub artist: String,
    /// Original release year.
    pub year: Option<i32>,
    /// Release type as reported (numeric id or label).
    pub release_type: String,
    /// Editions in grouping-key order.
    pub editions: Vec<Edition>,
}

impl Group {
    /// All torrents across every edition.
    pub fn torrents(&self) -> impl Iterator<Item = &Torrent> {
        self.editions.iter().flat_map(|e| e.torrents.iter())
    }
}

/// A browse search result, kept with its raw payload.
///
/// The raw map is needed later: browse results carry `editionId` values that
/// some trackers omit from `torrentgroup` responses.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Group id of the hit.
    pub group_id: i64,
    /// Group (album) name.
    pub group_name: String,
    /// Artist as reported by browse.
    pub artist: String,
    /// Group year.
    pub group_year: Option<i32>,
    /// Raw browse result object.
    pub raw: Map<String, Value>,
}

impl SearchHit {
    /// Builds a hit from one `browse` result object.
    #[must_use]
    pub fn from_browse_result(result: &Map<String, Value>) -> Self {
        let group_id = ["groupId", "group_id", "groupID", "groupid"]
            .iter()
            .find_map(|key| int_field(result, &[key]))
            .unwrap_or(0);
        let artist = str_field(result, &["artist"]).unwrap_or_else(|| first_artist_name(result));
        let group_year = int_field(result, &["groupYear", "groupyear"])
            .filter(|y| *y > 0)
            .and_then(|y| i32::try_from(y).ok());
        Self {
            group_id,
            group_name: str_field(result, &["groupName", "groupname", "title", "name"])
                .unwrap_or_default(),
            artist,
            group_year,
            raw: result.clone(),
        }
    }
}

/// Name of the first entry of an `artists` array, or empty.
pub(crate) fn first_artist_name(result: &Map<String, Value>) -> String {
    result
        .get("artists")
        .and_then(Value::as_array)
        .and_then(|artists| artists.first())
        .and_then(Value::as_object)
        .and_then(|artist| str_field(artist, &["name"]))
        .unwrap_or_default()
}
