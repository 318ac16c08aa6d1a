//! Pairing source editions with target editions.
//!
//! Every source/target pair is scored ([`scoring::score_pair`]), then a
//! maximum-weight assignment picks the globally best pairing so an early
//! strong match cannot steal the partner of a later one. Pairs below the
//! caller's threshold are unmatched, and confident pairs are re-checked for
//! swapped media (a CD edition paired with the SACD pressing and vice versa).

mod hungarian;
pub mod scoring;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Edition;

pub use hungarian::max_weight_assignment;
pub use scoring::{MAX_CONFIDENCE, PairScore, score_pair, sizes_match, string_similarity};

/// Default threshold below which an assigned pair is treated as unmatched.
pub const DEFAULT_MIN_CONFIDENCE: u32 = 25;
/// Matches at or above this confidence take part in cross-match correction.
pub const CORRECTION_THRESHOLD: u32 = 80;
/// Matches at or above this confidence without shared media are flagged.
pub const WARNING_THRESHOLD: u32 = 90;

/// Structurally invalid matcher input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("torrent {torrent_id} has no {field}")]
    InvalidTorrent {
        torrent_id: i64,
        field: &'static str,
    },
}

/// Outcome for one source edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditionMatch {
    pub source_edition: Edition,
    pub target_edition: Option<Edition>,
    /// `0..=150`; 0 when unmatched.
    pub confidence: u32,
    /// Per-component points; empty when unmatched.
    pub contributions: BTreeMap<String, u32>,
    /// Target edition was swapped to improve media alignment.
    pub cross_match_corrected: bool,
    /// Confident match whose editions share no media type.
    pub media_mismatch_warning: bool,
}

impl EditionMatch {
    fn unmatched(source: &Edition) -> Self {
        Self {
            source_edition: source.clone(),
            target_edition: None,
            confidence: 0,
            contributions: BTreeMap::new(),
            cross_match_corrected: false,
            media_mismatch_warning: false,
        }
    }

    /// True when a target edition was assigned.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.target_edition.is_some()
    }

    /// Shared media types between source and target; 0 when unmatched.
    #[must_use]
    pub fn media_overlap(&self) -> usize {
        self.target_edition
            .as_ref()
            .map_or(0, |target| self.source_edition.media_overlap(target))
    }
}

fn validate(editions: &[Edition]) -> Result<(), MatchError> {
    for torrent in editions.iter().flat_map(|e| e.torrents.iter()) {
        if torrent.media.trim().is_empty() {
            return Err(MatchError::InvalidTorrent {
                torrent_id: torrent.torrent_id,
                field: "media",
            });
        }
        if torrent.encoding.trim().is_empty() {
            return Err(MatchError::InvalidTorrent {
                torrent_id: torrent.torrent_id,
                field: "encoding",
            });
        }
    }
    Ok(())
}

/// Matches each source edition to at most one target edition.
///
/// Returns one [`EditionMatch`] per source edition, in source order. With no
/// target every edition is unmatched.
///
/// # Errors
///
/// [`MatchError::InvalidTorrent`] when any torrent on either side lacks a
/// media type or encoding.
pub fn match_editions(
    source: &[Edition],
    target: Option<&[Edition]>,
    min_confidence: u32,
) -> Result<Vec<EditionMatch>, MatchError> {
    validate(source)?;
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        return Ok(source.iter().map(EditionMatch::unmatched).collect());
    };
    validate(target)?;

    let scores: Vec<Vec<PairScore>> = source
        .iter()
        .map(|s| target.iter().map(|t| score_pair(s, t)).collect())
        .collect();
    let weights: Vec<Vec<i64>> = scores
        .iter()
        .map(|row| row.iter().map(|p| i64::from(p.confidence)).collect())
        .collect();
    let assignment = max_weight_assignment(&weights);

    let mut matches: Vec<EditionMatch> = source
        .iter()
        .zip(assignment)
        .enumerate()
        .map(|(i, (edition, column))| {
            let Some(j) = column else {
                return EditionMatch::unmatched(edition);
            };
            let pair = &scores[i][j];
            if pair.confidence < min_confidence {
                debug!(
                    source = %edition.describe(),
                    confidence = pair.confidence,
                    min_confidence,
                    "Assigned pair below threshold"
                );
                return EditionMatch::unmatched(edition);
            }
            EditionMatch {
                source_edition: edition.clone(),
                target_edition: Some(target[j].clone()),
                confidence: pair.confidence,
                contributions: pair.contributions.clone(),
                cross_match_corrected: false,
                media_mismatch_warning: false,
            }
        })
        .collect();

    correct_cross_matches(&mut matches);

    for m in &mut matches {
        if m.is_matched() && m.confidence >= WARNING_THRESHOLD && m.media_overlap() == 0 {
            m.media_mismatch_warning = true;
            warn!(
                source = %m.source_edition.describe(),
                confidence = m.confidence,
                "Matched editions share no media type"
            );
        }
    }

    Ok(matches)
}

/// Swaps target editions between confident matches when that strictly
/// increases their summed media overlap. Confidence and contributions stay
/// with the source edition.
fn correct_cross_matches(matches: &mut [EditionMatch]) {
    let candidates: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_matched() && m.confidence >= CORRECTION_THRESHOLD)
        .map(|(i, _)| i)
        .collect();

    for (pos, &a) in candidates.iter().enumerate() {
        for &b in &candidates[pos + 1..] {
            let (Some(target_a), Some(target_b)) =
                (&matches[a].target_edition, &matches[b].target_edition)
            else {
                continue;
            };
            let source_a = &matches[a].source_edition;
            let source_b = &matches[b].source_edition;
            let current = source_a.media_overlap(target_a) + source_b.media_overlap(target_b);
            let swapped = source_a.media_overlap(target_b) + source_b.media_overlap(target_a);
            if swapped <= current {
                continue;
            }

            debug!(
                first = %source_a.describe(),
                second = %source_b.describe(),
                current,
                swapped,
                "Swapping cross-matched target editions"
            );
            let taken_a = matches[a].target_edition.take();
            let taken_b = matches[b].target_edition.take();
            matches[a].target_edition = taken_b;
            matches[b].target_edition = taken_a;
            matches[a].cross_match_corrected = true;
            matches[b].cross_match_corrected = true;
        }
    }
}
