//! Finding a release on the opposite tracker.
//!
//! [`TieredSearch`] issues progressively looser `browse` queries until one
//! returns hits, then ranks the hits against the caller's query. The backend
//! is the [`CatalogSearch`] trait so the cascade runs without a network in
//! tests.

pub mod normalize;
pub mod scoring;
mod tiers;
mod variations;

use async_trait::async_trait;
use thiserror::Error;

use crate::api::{ApiError, BrowseParams, TrackerClient};
use crate::catalog::SearchHit;

pub use scoring::{score_hit, select_best};
pub use tiers::{MAX_TIER, TieredSearch};
pub use variations::{ArtistVariations, StaticArtistVariations};

/// Errors from the search cascade.
#[derive(Debug, Error)]
pub enum SearchError {
    /// `max_tier` was outside `1..=4`.
    #[error("max_tier must be between 1 and {MAX_TIER}, got {0}")]
    InvalidMaxTier(u8),

    /// A browse call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A `browse` backend.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Runs one browse query and returns its hits in server order.
    async fn search(&self, params: &BrowseParams) -> Result<Vec<SearchHit>, ApiError>;
}

#[async_trait]
impl CatalogSearch for TrackerClient {
    async fn search(&self, params: &BrowseParams) -> Result<Vec<SearchHit>, ApiError> {
        TrackerClient::search(self, params).await
    }
}
