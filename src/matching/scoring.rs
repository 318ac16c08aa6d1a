//! Pairwise edition confidence.
//!
//! | Component | Points |
//! |---|---|
//! | year | 50 exact, 48 off by one |
//! | title | 25 × similarity, 5 when both empty |
//! | catalog | 15 × similarity, 15 when both empty |
//! | label | 10 × similarity, 10 when both empty |
//! | size bonus | +10 exact / +8 within 0.1 % per torrent, max 50 |
//!
//! Disjoint media sets veto the pair, as does a weak catalog and label.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::Edition;

/// Upper bound of a pair confidence.
pub const MAX_CONFIDENCE: u32 = 150;
const MAX_SIZE_BONUS: u32 = 50;
const SIZE_TOLERANCE: f64 = 0.001;

/// Score of one (source, target) edition pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairScore {
    pub confidence: u32,
    pub contributions: BTreeMap<String, u32>,
}

impl PairScore {
    fn vetoed() -> Self {
        Self::default()
    }
}

/// Similarity in `[0, 1]` of two strings, lowercased and trimmed.
///
/// Empty input on either side is 0; equal strings are exactly 1.
#[must_use]
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// True when sizes are equal or differ by less than 0.1 % of the larger.
#[must_use]
pub fn sizes_match(a: u64, b: u64) -> bool {
    if a == b {
        return true;
    }
    let larger = a.max(b);
    #[allow(clippy::cast_precision_loss)]
    let relative = a.abs_diff(b) as f64 / larger as f64;
    relative < SIZE_TOLERANCE
}

fn size_points(a: u64, b: u64) -> u32 {
    if a == b {
        10
    } else if sizes_match(a, b) {
        8
    } else {
        0
    }
}

/// Size bonus: each source torrent whose `(media, encoding)` exists on the
/// target earns points against that target torrent's size.
#[must_use]
pub fn size_bonus(source: &Edition, target: &Edition) -> u32 {
    let target_sizes: HashMap<(String, String), u64> = target
        .torrents
        .iter()
        .map(|t| ((t.media.to_lowercase(), t.encoding.to_lowercase()), t.size))
        .collect();
    let total: u32 = source
        .torrents
        .iter()
        .filter_map(|t| {
            target_sizes
                .get(&(t.media.to_lowercase(), t.encoding.to_lowercase()))
                .map(|size| size_points(t.size, *size))
        })
        .sum();
    total.min(MAX_SIZE_BONUS)
}

/// Weighted similarity; `both_empty` when neither side has a value, 0 when
/// only one does.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn text_points(a: &str, b: &str, weight: u32, both_empty: u32) -> u32 {
    match (a.trim().is_empty(), b.trim().is_empty()) {
        (true, true) => both_empty,
        (false, false) => (string_similarity(a, b) * f64::from(weight)).round_ties_even() as u32,
        _ => 0,
    }
}

/// Scores one edition pair.
#[must_use]
pub fn score_pair(source: &Edition, target: &Edition) -> PairScore {
    if source.media_overlap(target) == 0 {
        return PairScore::vetoed();
    }

    let year = match (source.year, target.year) {
        (Some(a), Some(b)) if a == b => 50,
        (Some(a), Some(b)) if a.abs_diff(b) == 1 => 48,
        _ => 0,
    };
    let title = text_points(&source.title, &target.title, 25, 5);
    let catalog = text_points(&source.catalog, &target.catalog, 15, 15);
    let label = text_points(&source.label, &target.label, 10, 10);

    if catalog <= 7 && label <= 5 {
        return PairScore::vetoed();
    }

    let size = size_bonus(source, target);
    let contributions: BTreeMap<String, u32> = [
        ("year", year),
        ("title", title),
        ("catalog", catalog),
        ("label", label),
        ("size_bonus", size),
    ]
    .into_iter()
    .map(|(name, points)| (name.to_string(), points))
    .collect();
    let confidence = contributions.values().sum::<u32>().min(MAX_CONFIDENCE);

    PairScore {
        confidence,
        contributions,
    }
}
