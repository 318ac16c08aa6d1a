//! End-to-end cross-upload discovery for one source tracker.
//!
//! [`CrossUploader`] drives the pipeline per release: fetch the source group
//! (plus its browse result for edition ids), find the release on the target
//! tracker, match editions, compare media and encodings, and extract upload
//! candidates. [`CrossUploader::run`] processes a batch sequentially and keeps
//! going past per-entry failures.

mod report;
mod target;

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::envelope::optional_list_of_objects;
use crate::api::{ApiError, BrowseParams, ShapeError, TrackerClient};
use crate::catalog::{
    CollageUrlError, Group, SearchQuery, as_int, collage_max_size, extract_search_max, group_id,
    parse_group_from_browse, parse_torrentgroup_response,
};
use crate::compare::{
    CompareError, compare_editions, find_upload_candidates, missing_release_candidates,
};
use crate::config::AppConfig;
use crate::matching::{DEFAULT_MIN_CONFIDENCE, MatchError, match_editions};
use crate::search::{ArtistVariations, MAX_TIER, SearchError, TieredSearch};

pub use report::{EntryOutcome, FailedEntry, RunReport, render, render_report};
pub use target::{DEFAULT_SOURCE_TRACKER, Target, find_tracker_by_url, parse_target};

/// Errors while loading or processing entries.
#[derive(Debug, Error)]
pub enum CrossUploadError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("no configured tracker matches URL '{url}'")]
    UnknownTracker { url: String },

    #[error("tracker '{key}' is not configured")]
    TrackerNotConfigured { key: String },

    #[error("no tracker other than '{key}' is configured")]
    NoOppositeTracker { key: String },

    #[error("entry has no group id")]
    MissingGroupId,

    #[error(transparent)]
    Collage(#[from] CollageUrlError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("malformed payload: {0}")]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Compare(#[from] CompareError),
}

impl CrossUploadError {
    pub(crate) fn invalid_target(target: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-run knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Assigned edition pairs below this confidence are unmatched.
    pub min_confidence: u32,
    /// Highest search tier to try.
    pub max_tier: u8,
    /// Exact matching only: tier 1 and no artist variations.
    pub strict: bool,
}

impl RunSettings {
    /// Highest tier the target search may use; strict runs stop at tier 1.
    #[must_use]
    pub fn search_tier(&self) -> u8 {
        if self.strict { 1 } else { self.max_tier }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_tier: MAX_TIER,
            strict: false,
        }
    }
}

/// Cross-upload pipeline from one source tracker to one target tracker.
pub struct CrossUploader {
    source: TrackerClient,
    target: TrackerClient,
    search: TieredSearch,
    settings: RunSettings,
}

impl std::fmt::Debug for CrossUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossUploader")
            .field("source", &self.source.tracker().name)
            .field("target", &self.target.tracker().name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn has_torrents(response: &Map<String, Value>) -> bool {
    response
        .get("torrents")
        .and_then(Value::as_array)
        .is_some_and(|torrents| !torrents.is_empty())
}

impl CrossUploader {
    /// Creates a pipeline; the target client also backs the search cascade.
    #[must_use]
    pub fn new(source: TrackerClient, target: TrackerClient, settings: RunSettings) -> Self {
        let search = TieredSearch::new(Arc::new(target.clone()));
        Self {
            source,
            target,
            search,
            settings,
        }
    }

    /// Builds clients for `source_key` and its opposite tracker from config.
    ///
    /// # Errors
    ///
    /// [`CrossUploadError::TrackerNotConfigured`] or
    /// [`CrossUploadError::NoOppositeTracker`] for bad tracker keys, and
    /// [`CrossUploadError::Api`] when a client cannot be constructed.
    pub fn from_config(
        config: &AppConfig,
        source_key: &str,
        strict: bool,
    ) -> Result<Self, CrossUploadError> {
        let source = config
            .tracker(source_key)
            .ok_or_else(|| CrossUploadError::TrackerNotConfigured {
                key: source_key.to_string(),
            })?;
        let target = config.opposite_tracker(source_key).ok_or_else(|| {
            CrossUploadError::NoOppositeTracker {
                key: source_key.to_string(),
            }
        })?;
        let options = config.client_options();
        let settings = RunSettings {
            min_confidence: config.matching.min_confidence,
            max_tier: if strict { 1 } else { config.matching.max_tier },
            strict,
        };

        let mut uploader = Self::new(
            TrackerClient::new(source, options.clone())?,
            TrackerClient::new(target, options)?,
            settings,
        );
        if let Some(aliases) = config.artist_variations() {
            uploader = uploader.with_variations(Arc::new(aliases));
        }
        Ok(uploader)
    }

    /// Enables the artist-variation search fallback.
    #[must_use]
    pub fn with_variations(mut self, variations: Arc<dyn ArtistVariations>) -> Self {
        self.search = self.search.with_variations(variations);
        self
    }

    /// Source tracker client.
    #[must_use]
    pub fn source(&self) -> &TrackerClient {
        &self.source
    }

    /// Target tracker client.
    #[must_use]
    pub fn target(&self) -> &TrackerClient {
        &self.target
    }

    /// Fetches the entries named by `target` from the source tracker.
    ///
    /// A group target yields its `torrentgroup` response; a collage target
    /// yields every `torrentgroups` entry from the requested page onward.
    ///
    /// # Errors
    ///
    /// [`CrossUploadError::InvalidTarget`] when `target` names a different
    /// source tracker, otherwise API and payload-shape errors.
    #[instrument(skip(self), fields(source = %self.source.tracker().name))]
    pub async fn load_entries(
        &self,
        target: &Target,
    ) -> Result<Vec<Map<String, Value>>, CrossUploadError> {
        let source_name = &self.source.tracker().name;
        if !target.tracker().eq_ignore_ascii_case(source_name) {
            return Err(CrossUploadError::invalid_target(
                target.tracker(),
                format!("source tracker is '{source_name}'"),
            ));
        }

        match target {
            Target::Group { group_id, .. } => {
                let response = self.source.get_group(*group_id).await?;
                Ok(vec![response])
            }
            Target::Collage {
                collage_id, page, ..
            } => self.collage_entries(*collage_id, *page).await,
        }
    }

    async fn collage_entries(
        &self,
        collage_id: i64,
        start_page: u32,
    ) -> Result<Vec<Map<String, Value>>, CrossUploadError> {
        let mut entries = Vec::new();
        let mut page = start_page.max(1);
        loop {
            let response = self.source.get_collage(collage_id, page).await?;
            let page_entries =
                optional_list_of_objects(&response, "torrentgroups", "collage.response")?;
            if page_entries.is_empty() {
                break;
            }
            entries.extend(page_entries.into_iter().cloned());
            let total_pages = response.get("pages").and_then(as_int).filter(|p| *p > 0);
            debug!(collage_id, page, ?total_pages, entries = entries.len(), "Fetched collage page");
            match total_pages {
                Some(total) if i64::from(page) < total => page += 1,
                _ => break,
            }
        }
        info!(collage_id, entries = entries.len(), "Loaded collage entries");
        Ok(entries)
    }

    /// Source `torrentgroup` response for an entry, reusing the entry when
    /// it already is one.
    async fn source_response(
        &self,
        entry: &Map<String, Value>,
        group_id: i64,
    ) -> Result<Map<String, Value>, CrossUploadError> {
        if entry.get("group").is_some_and(Value::is_object) {
            return Ok(entry.clone());
        }
        Ok(self.source.get_group(group_id).await?)
    }

    async fn parse_source(
        &self,
        response: &Map<String, Value>,
        query: &SearchQuery,
        group_id: i64,
    ) -> Result<Group, CrossUploadError> {
        let browse_hits = self
            .source
            .search(&BrowseParams {
                artistname: Some(query.artist.clone()),
                groupname: query.album.clone(),
                year: query.year,
                ..BrowseParams::default()
            })
            .await?;
        let browse = browse_hits
            .iter()
            .find(|hit| hit.group_id == group_id)
            .map(|hit| &hit.raw);
        debug!(
            hits = browse_hits.len(),
            browse_match = browse.is_some(),
            "Fetched source browse result"
        );

        let group = match browse {
            Some(browse) if !has_torrents(response) => parse_group_from_browse(browse)?,
            _ => parse_torrentgroup_response(response, browse)?,
        };
        Ok(group)
    }

    async fn fetch_target(
        &self,
        hit_group_id: i64,
        hit_raw: &Map<String, Value>,
    ) -> Result<Group, CrossUploadError> {
        let response = self.target.get_group(hit_group_id).await?;
        let group = if has_torrents(&response) {
            parse_torrentgroup_response(&response, Some(hit_raw))?
        } else {
            parse_group_from_browse(hit_raw)?
        };
        Ok(group)
    }

    /// Runs the full pipeline for one collage entry or `torrentgroup`
    /// response.
    ///
    /// # Errors
    ///
    /// [`CrossUploadError::MissingGroupId`] for entries without an id, and
    /// any API, search, payload, matching or comparison failure.
    #[instrument(skip_all, fields(group_id = tracing::field::Empty))]
    pub async fn process_entry(
        &self,
        entry: &Map<String, Value>,
    ) -> Result<EntryOutcome, CrossUploadError> {
        let source_id = group_id(entry).ok_or(CrossUploadError::MissingGroupId)?;
        tracing::Span::current().record("group_id", source_id);

        let response = self.source_response(entry, source_id).await?;
        let source_max_size = collage_max_size(entry).or_else(|| collage_max_size(&response));
        let query = SearchQuery {
            release_type: None,
            media: None,
            ..SearchQuery::from_entry(&response)
        };
        info!(query = %query, "Processing entry");

        let source_group = self.parse_source(&response, &query, source_id).await?;
        let hit = self
            .search
            .find_with_variations(&query, self.settings.search_tier(), self.settings.strict)
            .await?;

        let Some(hit) = hit else {
            let matches =
                match_editions(&source_group.editions, None, self.settings.min_confidence)?;
            let comparisons = compare_editions(&matches, None)?;
            let candidates = missing_release_candidates(&source_group);
            info!(
                candidates = candidates.len(),
                target = %self.target.tracker().display_name(),
                "No matching group found"
            );
            return Ok(EntryOutcome {
                source_group,
                target_group: None,
                matches,
                comparisons,
                candidates,
                source_max_size,
                target_max_size: None,
            });
        };

        let target_max_size = extract_search_max(&hit);
        let target_group = self.fetch_target(hit.group_id, &hit.raw).await?;
        let target_max_size = target_max_size.or_else(|| {
            target_group
                .torrents()
                .filter_map(|t| i64::try_from(t.size).ok())
                .max()
        });
        let matches = match_editions(
            &source_group.editions,
            Some(&target_group.editions),
            self.settings.min_confidence,
        )?;
        let comparisons = compare_editions(&matches, Some(&target_group))?;
        let candidates = find_upload_candidates(&comparisons);

        if comparisons.iter().any(|c| c.has_warning()) {
            warn!(
                target_group = target_group.group_id,
                "Matched editions with different media types; verify carefully"
            );
        }
        info!(
            target_group = target_group.group_id,
            matched = matches.iter().filter(|m| m.is_matched()).count(),
            candidates = candidates.len(),
            "Found matching group"
        );

        Ok(EntryOutcome {
            source_group,
            target_group: Some(target_group),
            matches,
            comparisons,
            candidates,
            source_max_size,
            target_max_size,
        })
    }

    /// Processes `entries` in order; failures are logged and recorded.
    pub async fn run(&self, entries: &[Map<String, Value>]) -> RunReport {
        let mut report = RunReport::default();
        for (index, entry) in entries.iter().enumerate() {
            debug!(index, total = entries.len(), "Starting entry");
            match self.process_entry(entry).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(error) => {
                    let group_id = group_id(entry);
                    warn!(?group_id, error = %error, "Failed to process entry");
                    report.failures.push(FailedEntry {
                        group_id,
                        reason: error.to_string(),
                    });
                }
            }
        }
        info!(
            processed = report.outcomes.len(),
            failed = report.failures.len(),
            candidates = report.candidate_count(),
            "Run complete"
        );
        report
    }
}
