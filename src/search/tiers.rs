//! Progressive-relaxation search cascade.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument};

use crate::api::BrowseParams;
use crate::catalog::{SearchHit, SearchQuery};

use super::normalize::{
    aggressive, html_unescape, remove_volume_indicators, strip_disambiguator,
    strip_leading_article,
};
use super::scoring::select_best;
use super::variations::ArtistVariations;
use super::{CatalogSearch, SearchError};

/// Highest tier of the text-normalization cascade.
pub const MAX_TIER: u8 = 4;

/// Runs the search cascade against one tracker.
pub struct TieredSearch {
    backend: Arc<dyn CatalogSearch>,
    variations: Option<Arc<dyn ArtistVariations>>,
    variation_cache: Mutex<HashMap<String, Vec<String>>>,
}

impl TieredSearch {
    /// Creates a cascade over `backend` without artist variations.
    #[must_use]
    pub fn new(backend: Arc<dyn CatalogSearch>) -> Self {
        Self {
            backend,
            variations: None,
            variation_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Enables the artist-variation fallback tried after all tiers miss.
    #[must_use]
    pub fn with_variations(mut self, variations: Arc<dyn ArtistVariations>) -> Self {
        self.variations = Some(variations);
        self
    }

    /// Finds the best hit for `query`, trying tiers `1..=max_tier` in order.
    ///
    /// Hits are always ranked against the caller's `query`, never against
    /// the normalized form that produced them.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidMaxTier`] when `max_tier` is outside `1..=4`
    /// (no request is issued), or [`SearchError::Api`] on a failed call.
    #[instrument(skip(self, query), fields(query = %query))]
    pub async fn find(
        &self,
        query: &SearchQuery,
        max_tier: u8,
    ) -> Result<Option<SearchHit>, SearchError> {
        if !(1..=MAX_TIER).contains(&max_tier) {
            return Err(SearchError::InvalidMaxTier(max_tier));
        }

        let artist = query.artist.as_str();
        let album = query.album.as_deref().filter(|a| !a.is_empty());

        let exact = BrowseParams {
            artistname: Some(artist.to_string()),
            groupname: album.map(str::to_string),
            year: query.year,
            release_type: query.release_type,
            media: query.media.clone(),
            ..BrowseParams::default()
        };
        if let Some(hit) = self.attempt(1, exact.clone(), query).await? {
            return Ok(Some(hit));
        }

        let without_article = strip_leading_article(artist);
        if !without_article.is_empty() && without_article.to_lowercase() != artist.to_lowercase() {
            let params = BrowseParams {
                artistname: Some(without_article),
                ..exact
            };
            if let Some(hit) = self.attempt(1, params, query).await? {
                return Ok(Some(hit));
            }
        }
        if max_tier == 1 {
            return Ok(None);
        }

        let params = BrowseParams {
            artistname: Some(strip_disambiguator(&html_unescape(artist).to_lowercase())),
            groupname: album.map(|a| html_unescape(a).to_lowercase()),
            year: query.year,
            ..BrowseParams::default()
        };
        if let Some(hit) = self.attempt(2, params, query).await? {
            return Ok(Some(hit));
        }
        if max_tier == 2 {
            return Ok(None);
        }

        let artist_t3 = aggressive(artist);
        let params = BrowseParams {
            artistname: Some(artist_t3.clone()),
            groupname: album.map(|a| remove_volume_indicators(&aggressive(a))),
            ..BrowseParams::default()
        };
        if let Some(hit) = self.attempt(3, params, query).await? {
            return Ok(Some(hit));
        }
        if max_tier == 3 {
            return Ok(None);
        }

        let unescaped_album = album.map(html_unescape);
        if let Some((left, right)) = unescaped_album.as_deref().and_then(|a| a.split_once(':')) {
            for half in [left, right] {
                let groupname = remove_volume_indicators(&aggressive(half.trim()));
                if groupname.is_empty() {
                    continue;
                }
                let params = BrowseParams {
                    artistname: Some(artist_t3.clone()),
                    groupname: Some(groupname),
                    ..BrowseParams::default()
                };
                if let Some(hit) = self.attempt(4, params, query).await? {
                    return Ok(Some(hit));
                }
            }
        }

        Ok(None)
    }

    /// Runs [`find`](Self::find), then retries with alternate artist
    /// spellings unless `strict` is set.
    ///
    /// Variation lookups are cached per `artist|album` for the lifetime of
    /// this searcher.
    ///
    /// # Errors
    ///
    /// Same as [`find`](Self::find).
    pub async fn find_with_variations(
        &self,
        query: &SearchQuery,
        max_tier: u8,
        strict: bool,
    ) -> Result<Option<SearchHit>, SearchError> {
        if let Some(hit) = self.find(query, max_tier).await? {
            return Ok(Some(hit));
        }
        let Some(source) = self.variations.as_ref().filter(|_| !strict) else {
            return Ok(None);
        };

        for variant in self.variations_for(source.as_ref(), query).await {
            if variant.eq_ignore_ascii_case(&query.artist) {
                continue;
            }
            info!(variant = %variant, "Trying artist variation");
            let varied = SearchQuery {
                artist: variant,
                ..query.clone()
            };
            if let Some(hit) = self.find(&varied, max_tier).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    async fn variations_for(
        &self,
        source: &dyn ArtistVariations,
        query: &SearchQuery,
    ) -> Vec<String> {
        let key = format!(
            "{}|{}",
            query.artist.to_lowercase(),
            query.album.as_deref().unwrap_or_default().to_lowercase()
        );
        if let Some(cached) = self.cached_variations(&key) {
            return cached;
        }
        let found = source
            .variations(&query.artist, query.album.as_deref())
            .await;
        self.variation_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, found.clone());
        found
    }

    fn cached_variations(&self, key: &str) -> Option<Vec<String>> {
        self.variation_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    async fn attempt(
        &self,
        tier: u8,
        params: BrowseParams,
        original: &SearchQuery,
    ) -> Result<Option<SearchHit>, SearchError> {
        debug!(
            tier,
            artist = params.artistname.as_deref().unwrap_or_default(),
            album = params.groupname.as_deref().unwrap_or_default(),
            year = ?params.year,
            "Searching"
        );
        let hits = self.backend.search(&params).await?;
        if hits.is_empty() {
            return Ok(None);
        }
        let count = hits.len();
        let best = select_best(hits, original);
        if let Some(hit) = &best {
            info!(tier, hits = count, group_id = hit.group_id, "Search matched");
        }
        Ok(best)
    }
}
