//! Batch results and their text rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::catalog::{Group, Torrent};
use crate::compare::{EditionComparison, UploadCandidate, priority_label};
use crate::matching::EditionMatch;
use crate::tracker::TrackerConfig;

/// Everything learned about one source release.
#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    pub source_group: Group,
    /// Matching release on the target tracker, if the search found one.
    pub target_group: Option<Group>,
    pub matches: Vec<EditionMatch>,
    pub comparisons: Vec<EditionComparison>,
    pub candidates: Vec<UploadCandidate>,
    /// Largest torrent size (bytes) of the source entry.
    pub source_max_size: Option<i64>,
    /// Largest torrent size (bytes) of the target release.
    pub target_max_size: Option<i64>,
}

impl EntryOutcome {
    /// True when any confident match pairs editions with no shared media.
    #[must_use]
    pub fn has_warning(&self) -> bool {
        self.comparisons.iter().any(EditionComparison::has_warning)
    }
}

/// An entry that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub group_id: Option<i64>,
    pub reason: String,
}

/// Result of [`CrossUploader::run`](super::CrossUploader::run).
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<EntryOutcome>,
    pub failures: Vec<FailedEntry>,
}

impl RunReport {
    /// All candidates grouped by priority, highest first, in run order
    /// within a priority.
    #[must_use]
    pub fn candidates_by_priority(&self) -> Vec<(u8, Vec<&UploadCandidate>)> {
        let mut grouped: BTreeMap<u8, Vec<&UploadCandidate>> = BTreeMap::new();
        for candidate in self.outcomes.iter().flat_map(|o| o.candidates.iter()) {
            grouped.entry(candidate.priority).or_default().push(candidate);
        }
        grouped.into_iter().rev().collect()
    }

    /// Total number of candidates.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.candidates.len()).sum()
    }
}

fn describe_group(group: &Group) -> String {
    match group.year {
        Some(year) => format!("{} - {} ({year})", group.artist, group.name),
        None => format!("{} - {}", group.artist, group.name),
    }
}

/// Detailed text for one entry: edition matches with score breakdown, then
/// the media/encoding comparison.
#[must_use]
pub fn render(outcome: &EntryOutcome, source: &TrackerConfig, target: &TrackerConfig) -> String {
    let mut out = String::new();
    let source_name = source.display_name();
    let target_name = target.display_name();

    let _ = writeln!(
        out,
        "{source_name} {}: {}",
        outcome.source_group.group_id,
        describe_group(&outcome.source_group)
    );
    match &outcome.target_group {
        Some(group) => {
            let _ = writeln!(out, "  -> {target_name} {}", target.group_url(group.group_id));
        }
        None => {
            let _ = writeln!(out, "  -> not found on {target_name}");
        }
    }
    if outcome.source_max_size.is_some() || outcome.target_max_size.is_some() {
        let _ = writeln!(
            out,
            "  Max size: {source_name} {}, {target_name} {}",
            size_cell(outcome.source_max_size),
            size_cell(outcome.target_max_size)
        );
    }

    let _ = writeln!(out, "  Edition matching:");
    for edition_match in &outcome.matches {
        let _ = writeln!(out, "    {}", edition_match.source_edition.describe());
        let Some(target_edition) = &edition_match.target_edition else {
            let _ = writeln!(out, "      unmatched");
            continue;
        };
        let breakdown = edition_match
            .contributions
            .iter()
            .map(|(name, points)| format!("{name}={points}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "      matched {} (confidence {}: {breakdown})",
            target_edition.describe(),
            edition_match.confidence
        );
        if edition_match.cross_match_corrected {
            let _ = writeln!(out, "      corrected for media alignment");
        }
        if edition_match.media_mismatch_warning {
            let _ = writeln!(out, "      WARNING: matched editions share no media type");
        }
    }

    let _ = writeln!(out, "  Media/encoding comparison:");
    for comparison in &outcome.comparisons {
        let _ = writeln!(out, "    {}", comparison.edition_match.source_edition.describe());
        if comparison.pressing_on_target {
            let _ = writeln!(out, "      same pressing exists on {target_name}");
        }
        for media in &comparison.media_comparisons {
            let lossless = if media.has_lossless { " [lossless present]" } else { "" };
            let _ = writeln!(out, "      {}{lossless}", media.media);
            for row in &media.encodings {
                let _ = writeln!(
                    out,
                    "        {:<16} {source_name} {:<20} {target_name} {:<20} {}",
                    row.encoding,
                    torrent_cell(row.source_torrent.as_ref()),
                    torrent_cell(row.target_torrent.as_ref()),
                    row.status
                );
            }
        }
    }
    out
}

fn size_cell(size: Option<i64>) -> String {
    size.map_or_else(|| "-".to_string(), |bytes| format!("{bytes} B"))
}

fn torrent_cell(torrent: Option<&Torrent>) -> String {
    torrent.map_or_else(|| "-".to_string(), |t| format!("#{} ({} B)", t.torrent_id, t.size))
}

/// End-of-run summary: candidate URLs by priority, then failures.
#[must_use]
pub fn render_report(report: &RunReport, source: &TrackerConfig) -> String {
    let mut out = String::new();
    let grouped = report.candidates_by_priority();
    if grouped.is_empty() {
        let _ = writeln!(out, "No upload candidates found.");
    } else {
        let _ = writeln!(out, "Explore the following for possible upload:");
        for (priority, candidates) in grouped {
            let _ = writeln!(out, "  [{}] ({})", priority_label(priority), candidates.len());
            for candidate in candidates {
                let _ = writeln!(
                    out,
                    "    {}  {} / {}",
                    candidate.url(source.base_url()),
                    candidate.media,
                    candidate.encoding
                );
            }
        }
    }
    if !report.failures.is_empty() {
        let _ = writeln!(out, "Failed entries ({}):", report.failures.len());
        for failure in &report.failures {
            let id = failure
                .group_id
                .map_or_else(|| "?".to_string(), |id| id.to_string());
            let _ = writeln!(out, "  group {id}: {}", failure.reason);
        }
    }
    out
}
