//! Alternate artist spellings tried when every search tier misses.

use std::collections::HashMap;

use async_trait::async_trait;

/// Source of alternate artist names (aliases, name variations).
#[async_trait]
pub trait ArtistVariations: Send + Sync {
    /// Alternate spellings of `artist`, best first. Empty when unknown.
    async fn variations(&self, artist: &str, album: Option<&str>) -> Vec<String>;
}

/// Alias table loaded from configuration, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticArtistVariations {
    aliases: HashMap<String, Vec<String>>,
}

impl StaticArtistVariations {
    /// Builds the table; keys are lowercased and trimmed.
    #[must_use]
    pub fn new(aliases: HashMap<String, Vec<String>>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(artist, names)| (artist.trim().to_lowercase(), names))
            .collect();
        Self { aliases }
    }

    /// True when no aliases are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[async_trait]
impl ArtistVariations for StaticArtistVariations {
    async fn variations(&self, artist: &str, _album: Option<&str>) -> Vec<String> {
        self.aliases
            .get(&artist.trim().to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}
