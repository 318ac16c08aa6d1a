//! Ranking of multiple browse hits against the caller's query.

use std::collections::HashSet;

use crate::catalog::{SearchHit, SearchQuery};

/// Extra album words that mark a different version of the same release.
pub const VERSION_INDICATORS: [&str; 12] = [
    "deluxe",
    "demo",
    "demos",
    "remaster",
    "remastered",
    "expanded",
    "edition",
    "anniversary",
    "special",
    "bonus",
    "live",
    "outtakes",
];

/// Extra album words that mark a compilation.
pub const COMPILATION_INDICATORS: [&str; 6] =
    ["collection", "compilation", "greatest", "hits", "best", "anthology"];

const ARTIST_WEIGHT: f64 = 40.0;
const ALBUM_WEIGHT: f64 = 40.0;
const VERSION_PENALTY: f64 = 15.0;
const COMPILATION_PENALTY: f64 = 60.0;

/// Normalized Levenshtein similarity of two lowercased strings.
fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Scores one hit; higher is better.
#[must_use]
pub fn score_hit(hit: &SearchHit, query: &SearchQuery) -> f64 {
    let mut score = 0.0;

    if !hit.artist.is_empty() && !query.artist.is_empty() {
        score += similarity(&hit.artist, &query.artist) * ARTIST_WEIGHT;
    }

    if let Some(album) = query.album.as_deref().filter(|a| !a.is_empty()) {
        if !hit.group_name.is_empty() {
            score += similarity(&hit.group_name, album) * ALBUM_WEIGHT;

            let hit_lower = hit.group_name.to_lowercase();
            let query_lower = album.to_lowercase();
            let query_words: HashSet<&str> = query_lower.split_whitespace().collect();
            let extra: HashSet<&str> = hit_lower
                .split_whitespace()
                .filter(|word| !query_words.contains(word))
                .collect();
            if VERSION_INDICATORS.iter().any(|w| extra.contains(w)) {
                score -= VERSION_PENALTY;
            }
            if COMPILATION_INDICATORS.iter().any(|w| extra.contains(w)) {
                score -= COMPILATION_PENALTY;
            }
        }
    }

    if let (Some(wanted), Some(actual)) = (query.year, hit.group_year) {
        score += match wanted.abs_diff(actual) {
            0 => 20.0,
            1 => 15.0,
            2 => 10.0,
            _ => 0.0,
        };
    }

    score
}

/// Picks the best-scoring hit; ties keep the earliest.
#[must_use]
pub fn select_best(hits: Vec<SearchHit>, query: &SearchQuery) -> Option<SearchHit> {
    let mut best: Option<(f64, SearchHit)> = None;
    for hit in hits {
        let score = score_hit(&hit, query);
        match &best {
            Some((best_score, _)) if score <= *best_score => {}
            _ => best = Some((score, hit)),
        }
    }
    best.map(|(_, hit)| hit)
}
