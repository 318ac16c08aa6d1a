//! Search context extraction from collage and torrentgroup entries.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::fields::{as_int, int_field, str_field};
use super::model::SearchHit;

const MAX_SIZE_KEYS: [&str; 3] = ["maxsize", "max_size", "maxSize"];

/// A collage URL could not be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollageUrlError {
    #[error("invalid collage URL '{url}'")]
    InvalidUrl { url: String },

    #[error("collage URL must include an id parameter")]
    MissingId,

    #[error("collage id must be numeric, got '{value}'")]
    NonNumericId { value: String },
}

/// Search terms for finding a release on another tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub artist: String,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub release_type: Option<i64>,
    pub media: Option<String>,
}

impl SearchQuery {
    /// Builds a query from a collage entry or `torrentgroup` response.
    ///
    /// The entry may be `{group, torrents}` or a bare group object. The
    /// artist is the first named artist, falling back to the album name.
    #[must_use]
    pub fn from_entry(entry: &Map<String, Value>) -> Self {
        let group = group_of(entry);
        let primary_artist = group
            .get("musicInfo")
            .and_then(|info| info.get("artists"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .find_map(|artist| str_field(artist, &["name"]));
        let album = str_field(group, &["name"]).or_else(|| str_field(entry, &["name"]));
        let media = entry
            .get("torrents")
            .and_then(Value::as_array)
            .and_then(|torrents| torrents.first())
            .and_then(Value::as_object)
            .and_then(|torrent| str_field(torrent, &["media"]));
        let year = int_field(group, &["year"])
            .filter(|y| *y > 0)
            .and_then(|y| i32::try_from(y).ok());

        Self {
            artist: primary_artist.or_else(|| album.clone()).unwrap_or_default(),
            album,
            year,
            release_type: int_field(group, &["releaseType"]).filter(|t| *t > 0),
            media,
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<String> = Vec::new();
        if !self.artist.is_empty() {
            items.push(format!("artist='{}'", self.artist));
        }
        if let Some(album) = self.album.as_deref().filter(|a| !a.is_empty()) {
            items.push(format!("album='{album}'"));
        }
        if let Some(year) = self.year {
            items.push(format!("year={year}"));
        }
        if let Some(release_type) = self.release_type {
            items.push(format!("releasetype={release_type}"));
        }
        if let Some(media) = self.media.as_deref().filter(|m| !m.is_empty()) {
            items.push(format!("media='{media}'"));
        }
        f.write_str(&items.join(", "))
    }
}

fn group_of(entry: &Map<String, Value>) -> &Map<String, Value> {
    entry
        .get("group")
        .and_then(Value::as_object)
        .unwrap_or(entry)
}

/// Group id of a collage entry or `torrentgroup` response.
#[must_use]
pub fn group_id(entry: &Map<String, Value>) -> Option<i64> {
    group_of(entry).get("id").and_then(as_int)
}

/// Parses `collages.php?id=N[&page=P]` into `(id, page)`; page defaults to 1.
///
/// # Errors
///
/// Returns [`CollageUrlError`] for unparseable URLs and missing or
/// non-numeric ids.
pub fn parse_collage_url(collage_url: &str) -> Result<(i64, u32), CollageUrlError> {
    let url = Url::parse(collage_url).map_err(|_| CollageUrlError::InvalidUrl {
        url: collage_url.to_string(),
    })?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };
    let raw_id = ["id", "Collage", "collage"]
        .iter()
        .find_map(|name| param(name))
        .filter(|value| !value.is_empty())
        .ok_or(CollageUrlError::MissingId)?;
    let collage_id = raw_id
        .parse::<i64>()
        .map_err(|_| CollageUrlError::NonNumericId { value: raw_id.clone() })?;
    let page = param("page")
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1);
    Ok((collage_id, page))
}

/// Largest torrent size of an entry: explicit max-size field, else the
/// maximum over its torrents.
#[must_use]
pub fn collage_max_size(entry: &Map<String, Value>) -> Option<i64> {
    int_field(group_of(entry), &MAX_SIZE_KEYS).or_else(|| {
        entry
            .get("torrents")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|torrent| torrent.get("size").and_then(as_int))
            .max()
    })
}

/// Max-size metadata carried by a search hit.
#[must_use]
pub fn extract_search_max(hit: &SearchHit) -> Option<i64> {
    int_field(&hit.raw, &MAX_SIZE_KEYS)
}
