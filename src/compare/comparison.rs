//! Per-media, per-encoding diff of matched (or unmatched) editions.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::catalog::{Edition, Group, Torrent};
use crate::matching::{EditionMatch, sizes_match};

use super::CompareError;

/// Outcome of one (media, encoding) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncodingStatus {
    /// Both sides, identical size.
    ExactSize,
    /// Both sides, size within 0.1 %.
    FuzzySize,
    /// Both sides, sizes differ.
    SizeMismatch,
    /// Source only, but the same media/encoding/size exists somewhere on target.
    Suppressed,
    /// Source only and lossy while the media already has lossless.
    Ignored,
    /// Source only; should be uploaded.
    Candidate,
    /// Target only.
    TargetOnly,
}

impl fmt::Display for EncodingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExactSize => "Exact size match",
            Self::FuzzySize => "Fuzzy size match",
            Self::SizeMismatch => "Size mismatch",
            Self::Suppressed => "Suppressed (same size exists in another target edition)",
            Self::Ignored => "Ignored (lossless already present)",
            Self::Candidate => "Upload candidate",
            Self::TargetOnly => "Target only",
        })
    }
}

/// One encoding within a media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingComparison {
    pub encoding: String,
    pub source_torrent: Option<Torrent>,
    pub target_torrent: Option<Torrent>,
    pub status: EncodingStatus,
}

impl EncodingComparison {
    #[must_use]
    pub fn is_upload_candidate(&self) -> bool {
        self.status == EncodingStatus::Candidate && self.source_torrent.is_some()
    }
}

/// One media type within an edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaComparison {
    pub media: String,
    pub encodings: Vec<EncodingComparison>,
    /// Lossless exists for this media on the source edition, the matched
    /// target edition or anywhere in the target release.
    pub has_lossless: bool,
}

impl MediaComparison {
    /// True when the matched target edition holds any torrent of this media.
    #[must_use]
    pub fn has_target_media(&self) -> bool {
        self.encodings.iter().any(|e| e.target_torrent.is_some())
    }
}

/// Full comparison for one source edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditionComparison {
    pub edition_match: EditionMatch,
    pub media_comparisons: Vec<MediaComparison>,
    /// Unmatched, but a target edition carries the same year, title, label
    /// and catalogue number: the target has this pressing in other media.
    pub pressing_on_target: bool,
}

impl EditionComparison {
    /// Confident match between editions sharing no media.
    #[must_use]
    pub fn has_warning(&self) -> bool {
        self.edition_match.media_mismatch_warning
    }
}

/// True for FLAC, lossless and 24bit encodings (case-insensitive).
#[must_use]
pub fn is_lossless(encoding: &str) -> bool {
    let lower = encoding.to_lowercase();
    ["flac", "lossless", "24bit"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn validate<'a>(torrents: impl IntoIterator<Item = &'a Torrent>) -> Result<(), CompareError> {
    for torrent in torrents {
        if torrent.media.trim().is_empty() {
            return Err(CompareError::InvalidTorrent {
                torrent_id: torrent.torrent_id,
                field: "media",
            });
        }
        if torrent.encoding.trim().is_empty() {
            return Err(CompareError::InvalidTorrent {
                torrent_id: torrent.torrent_id,
                field: "encoding",
            });
        }
    }
    Ok(())
}

/// Torrents of the target release used for duplicate suppression.
struct TargetPool<'a> {
    torrents: Vec<&'a Torrent>,
    editions: Vec<&'a Edition>,
}

impl<'a> TargetPool<'a> {
    fn build(matches: &'a [EditionMatch], target: Option<&'a Group>) -> Self {
        let mut editions: Vec<&Edition> = target.map(|g| g.editions.iter().collect()).unwrap_or_default();
        editions.extend(matches.iter().filter_map(|m| m.target_edition.as_ref()));
        let torrents = editions.iter().flat_map(|e| e.torrents.iter()).collect();
        Self { torrents, editions }
    }

    fn contains_size(&self, torrent: &Torrent) -> bool {
        self.torrents.iter().any(|t| {
            t.media == torrent.media
                && t.encoding == torrent.encoding
                && sizes_match(t.size, torrent.size)
        })
    }

    fn has_lossless(&self, media: &str) -> bool {
        self.torrents
            .iter()
            .any(|t| t.media == media && is_lossless(&t.encoding))
    }

    fn has_pressing(&self, edition: &Edition) -> bool {
        let wanted = edition.metadata_tuple();
        self.editions.iter().any(|e| e.metadata_tuple() == wanted)
    }
}

/// media -> encoding -> torrents, all sorted by key.
type Cells<'a> = BTreeMap<&'a str, BTreeMap<&'a str, Vec<&'a Torrent>>>;

fn cells(edition: Option<&Edition>) -> Cells<'_> {
    let mut cells: Cells<'_> = BTreeMap::new();
    for torrent in edition.into_iter().flat_map(|e| e.torrents.iter()) {
        cells
            .entry(torrent.media.as_str())
            .or_default()
            .entry(torrent.encoding.as_str())
            .or_default()
            .push(torrent);
    }
    cells
}

fn size_status(source: &Torrent, target: &[&Torrent]) -> (EncodingStatus, Torrent) {
    let best = target
        .iter()
        .find(|t| t.size == source.size)
        .map(|t| (EncodingStatus::ExactSize, *t))
        .or_else(|| {
            target
                .iter()
                .find(|t| sizes_match(t.size, source.size))
                .map(|t| (EncodingStatus::FuzzySize, *t))
        });
    match best {
        Some((status, t)) => (status, t.clone()),
        None => (EncodingStatus::SizeMismatch, target[0].clone()),
    }
}

fn compare_one(edition_match: &EditionMatch, pool: &TargetPool<'_>) -> EditionComparison {
    let source_cells = cells(Some(&edition_match.source_edition));
    let target_cells = cells(edition_match.target_edition.as_ref());

    let mut all_media: Vec<&str> = source_cells.keys().chain(target_cells.keys()).copied().collect();
    all_media.sort_unstable();
    all_media.dedup();

    let empty = BTreeMap::new();
    let media_comparisons = all_media
        .into_iter()
        .map(|media| {
            let source = source_cells.get(media).unwrap_or(&empty);
            let target = target_cells.get(media).unwrap_or(&empty);
            let has_lossless = source.keys().chain(target.keys()).any(|e| is_lossless(e))
                || pool.has_lossless(media);

            let mut encodings: Vec<&str> = source.keys().chain(target.keys()).copied().collect();
            encodings.sort_unstable();
            encodings.dedup();

            let mut rows = Vec::new();
            for encoding in encodings {
                let source_torrents = source.get(encoding).map_or(&[][..], Vec::as_slice);
                let target_torrents = target.get(encoding).map_or(&[][..], Vec::as_slice);

                if source_torrents.is_empty() {
                    rows.extend(target_torrents.iter().map(|t| EncodingComparison {
                        encoding: encoding.to_string(),
                        source_torrent: None,
                        target_torrent: Some((*t).clone()),
                        status: EncodingStatus::TargetOnly,
                    }));
                    continue;
                }

                for source_torrent in source_torrents {
                    let (status, target_torrent) = if target_torrents.is_empty() {
                        let status = if pool.contains_size(source_torrent) {
                            EncodingStatus::Suppressed
                        } else if has_lossless && !is_lossless(encoding) {
                            EncodingStatus::Ignored
                        } else {
                            EncodingStatus::Candidate
                        };
                        (status, None)
                    } else {
                        let (status, t) = size_status(source_torrent, target_torrents);
                        (status, Some(t))
                    };
                    rows.push(EncodingComparison {
                        encoding: encoding.to_string(),
                        source_torrent: Some((*source_torrent).clone()),
                        target_torrent,
                        status,
                    });
                }
            }

            MediaComparison {
                media: media.to_string(),
                encodings: rows,
                has_lossless,
            }
        })
        .collect();

    EditionComparison {
        edition_match: edition_match.clone(),
        media_comparisons,
        pressing_on_target: !edition_match.is_matched()
            && pool.has_pressing(&edition_match.source_edition),
    }
}

/// Compares every match, one [`EditionComparison`] per match in input order.
///
/// `target` is the whole target release; its torrents form the suppression
/// pool together with the matched target editions.
///
/// # Errors
///
/// [`CompareError::InvalidTorrent`] when a torrent lacks media or encoding.
pub fn compare_editions(
    matches: &[EditionMatch],
    target: Option<&Group>,
) -> Result<Vec<EditionComparison>, CompareError> {
    validate(matches.iter().flat_map(|m| {
        m.source_edition
            .torrents
            .iter()
            .chain(m.target_edition.iter().flat_map(|e| e.torrents.iter()))
    }))?;
    if let Some(group) = target {
        validate(group.torrents())?;
    }

    let pool = TargetPool::build(matches, target);
    Ok(matches.iter().map(|m| compare_one(m, &pool)).collect())
}
