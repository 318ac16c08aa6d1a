//! TOML configuration: tracker credentials, HTTP pacing and matching knobs.
//!
//! ```toml
//! [trackers.red]
//! url = "https://redacted.example"
//! api_key = "..."
//!
//! [trackers.ops]
//! url = "https://orpheus.example"
//! api_key = "..."
//!
//! [http]
//! timeout_secs = 10
//! max_concurrency = 3
//! min_interval_ms = 2000
//!
//! [matching]
//! min_confidence = 25
//!
//! [artist_aliases]
//! "Prince" = ["The Artist Formerly Known as Prince"]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::api::constants::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENCY, DEFAULT_MIN_INTERVAL, DEFAULT_TIMEOUT_SECS,
};
use crate::api::{ClientOptions, RetryPolicy};
use crate::matching::{DEFAULT_MIN_CONFIDENCE, MAX_CONFIDENCE};
use crate::search::{MAX_TIER, StaticArtistVariations};
use crate::tracker::{TrackerConfig, resolve_tracker_profile};

/// File name looked up in each config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "crossupload";

/// Errors while locating, reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file found (searched: {searched})")]
    NotFound { searched: String },

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// One `[trackers.<key>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerEntry {
    /// Profile name; defaults to the table key.
    pub name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

/// `[http]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_concurrency: usize,
    pub min_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            min_interval_ms: u64::try_from(DEFAULT_MIN_INTERVAL.as_millis()).unwrap_or(u64::MAX),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// `[matching]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingSettings {
    pub min_confidence: u32,
    pub max_tier: u8,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_tier: MAX_TIER,
        }
    }
}

/// Parsed and validated configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Trackers by key, in key order.
    pub trackers: BTreeMap<String, TrackerEntry>,
    pub http: HttpSettings,
    pub matching: MatchingSettings,
    /// Alternate artist spellings tried when search misses.
    pub artist_aliases: HashMap<String, Vec<String>>,
}

impl AppConfig {
    /// Reads, parses and validates `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`], [`ConfigError::Parse`] or
    /// [`ConfigError::Invalid`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), trackers = config.trackers.len(), "Loaded config");
        Ok(config)
    }

    /// Checks tracker completeness and value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trackers.len() < 2 {
            return Err(ConfigError::invalid(
                "trackers",
                format!("at least two trackers are required, found {}", self.trackers.len()),
            ));
        }
        for (key, entry) in &self.trackers {
            let name = entry.name.as_deref().unwrap_or(key);
            resolve_tracker_profile(name)
                .map_err(|e| ConfigError::invalid(format!("trackers.{key}.name"), e.to_string()))?;
            if entry.url.trim().is_empty() {
                return Err(ConfigError::invalid(format!("trackers.{key}.url"), "missing"));
            }
            url::Url::parse(entry.url.trim()).map_err(|e| {
                ConfigError::invalid(format!("trackers.{key}.url"), e.to_string())
            })?;
            if entry.api_key.trim().is_empty() {
                return Err(ConfigError::invalid(format!("trackers.{key}.api_key"), "missing"));
            }
        }

        check_range("http.timeout_secs", self.http.timeout_secs, 1, 3600)?;
        check_range("http.max_concurrency", self.http.max_concurrency, 1, 32)?;
        check_range("http.min_interval_ms", self.http.min_interval_ms, 0, 60_000)?;
        check_range("http.max_attempts", self.http.max_attempts, 1, 10)?;
        check_range(
            "matching.min_confidence",
            self.matching.min_confidence,
            0,
            MAX_CONFIDENCE,
        )?;
        check_range("matching.max_tier", self.matching.max_tier, 1, MAX_TIER)?;
        Ok(())
    }

    /// Tracker config for `key`, if configured.
    #[must_use]
    pub fn tracker(&self, key: &str) -> Option<TrackerConfig> {
        let key = key.trim();
        self.trackers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(name, entry)| to_tracker(name, entry))
    }

    /// All trackers in key order.
    #[must_use]
    pub fn trackers(&self) -> Vec<TrackerConfig> {
        self.trackers
            .iter()
            .map(|(key, entry)| to_tracker(key, entry))
            .collect()
    }

    /// First configured tracker whose key differs from `source_key`.
    #[must_use]
    pub fn opposite_tracker(&self, source_key: &str) -> Option<TrackerConfig> {
        let source_key = source_key.trim();
        self.trackers
            .iter()
            .find(|(key, _)| !key.eq_ignore_ascii_case(source_key))
            .map(|(key, entry)| to_tracker(key, entry))
    }

    /// Client options derived from `[http]`.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.http.timeout_secs),
            max_concurrency: self.http.max_concurrency,
            min_interval: Duration::from_millis(self.http.min_interval_ms),
            retry_policy: RetryPolicy::new(self.http.max_attempts, Duration::from_secs(2)),
            ..ClientOptions::default()
        }
    }

    /// Alias table, or `None` when no aliases are configured.
    #[must_use]
    pub fn artist_variations(&self) -> Option<StaticArtistVariations> {
        let table = StaticArtistVariations::new(self.artist_aliases.clone());
        (!table.is_empty()).then_some(table)
    }
}

fn to_tracker(key: &str, entry: &TrackerEntry) -> TrackerConfig {
    let name = entry.name.clone().unwrap_or_else(|| key.to_string());
    TrackerConfig::new(name.trim().to_lowercase(), entry.url.trim(), entry.api_key.trim())
}

fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: {min}..={max}"),
        ));
    }
    Ok(())
}

/// Candidate config locations in lookup order.
///
/// 1. `./config.toml`
/// 2. `$XDG_CONFIG_HOME/crossupload/config.toml`
/// 3. `$HOME/.config/crossupload/config.toml`
#[must_use]
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(xdg) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join(APP_DIR).join(CONFIG_FILE_NAME));
    }
    if let Some(home) = env_var_non_empty_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join(APP_DIR)
                .join(CONFIG_FILE_NAME),
        );
    }
    paths
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Resolves the config file to load.
///
/// An explicit path wins; a directory means `<dir>/config.toml`. Otherwise
/// the first existing entry of [`default_config_paths`] is used.
///
/// # Errors
///
/// [`ConfigError::NotFound`] when nothing exists at the resolved location(s).
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let candidates = match explicit {
        Some(path) if path.is_dir() => vec![path.join(CONFIG_FILE_NAME)],
        Some(path) => vec![path.to_path_buf()],
        None => default_config_paths(),
    };
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| ConfigError::NotFound {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    const VALID: &str = r#"
[trackers.red]
url = "https://red.example/"
api_key = "red-key"

[trackers.ops]
url = "https://ops.example"
api_key = "ops-key"
"#;

    fn parse(raw: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = toml::from_str(raw).unwrap();
        config.validate().map(|()| config)
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(VALID).unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.max_concurrency, 3);
        assert_eq!(config.http.min_interval_ms, 2000);
        assert_eq!(config.matching.min_confidence, 25);
        assert_eq!(config.matching.max_tier, 4);
        assert!(config.artist_variations().is_none());
    }

    #[test]
    fn test_tracker_lookup_and_opposite() {
        let config = parse(VALID).unwrap();
        let red = config.tracker("RED").unwrap();
        assert_eq!(red.base_url(), "https://red.example");
        assert_eq!(config.opposite_tracker("red").unwrap().name, "ops");
        assert_eq!(config.opposite_tracker("ops").unwrap().name, "red");
        assert_eq!(config.trackers().len(), 2);
    }

    #[test]
    fn test_requires_two_trackers() {
        let raw = "[trackers.red]\nurl = \"https://red.example\"\napi_key = \"k\"\n";
        let err = parse(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "trackers"));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let raw = VALID.replace("api_key = \"ops-key\"", "");
        let err = parse(&raw).unwrap_err();
        assert!(err.to_string().contains("trackers.ops.api_key"));
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let raw = format!("{VALID}\n[trackers.btn]\nurl = \"https://btn.example\"\napi_key = \"k\"\n");
        let err = parse(&raw).unwrap_err();
        assert!(err.to_string().contains("trackers.btn.name"));
    }

    #[test]
    fn test_ranges_enforced() {
        let raw = format!("{VALID}\n[http]\nmax_concurrency = 0\n");
        assert!(parse(&raw).unwrap_err().to_string().contains("http.max_concurrency"));
        let raw = format!("{VALID}\n[matching]\nmin_confidence = 151\n");
        assert!(parse(&raw).unwrap_err().to_string().contains("matching.min_confidence"));
        let raw = format!("{VALID}\n[http]\ntimeout_secs = 3601\n");
        assert!(parse(&raw).unwrap_err().to_string().contains("http.timeout_secs"));
    }

    #[test]
    fn test_client_options_from_http_settings() {
        let raw = format!("{VALID}\n[http]\ntimeout_secs = 30\nmin_interval_ms = 500\n");
        let options = parse(&raw).unwrap().client_options();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.min_interval, Duration::from_millis(500));
        assert_eq!(options.max_concurrency, 3);
    }

    #[test]
    fn test_artist_aliases_loaded() {
        let raw = format!("{VALID}\n[artist_aliases]\n\"Prince\" = [\"The Artist\"]\n");
        assert!(parse(&raw).unwrap().artist_variations().is_some());
    }

    #[test]
    fn test_load_and_resolve_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::File::create(&path)
            .unwrap()
            .write_all(VALID.as_bytes())
            .unwrap();

        let resolved = resolve_config_path(Some(dir.path())).unwrap();
        assert_eq!(resolved, path);
        let config = AppConfig::load(&resolved).unwrap();
        assert_eq!(config.trackers.len(), 2);
    }

    #[test]
    fn test_resolve_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_config_path(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "trackers = 5").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
