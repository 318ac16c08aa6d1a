//! Crossupload Core Library
//!
//! Finds releases that exist on one Gazelle music tracker and are missing,
//! in whole or in part, from another.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Rate-limited, retrying `ajax.php` client
//! - [`tracker`] - Per-tracker profiles and auth headers
//! - [`catalog`] - Group/edition/torrent model and payload parsing
//! - [`search`] - Tiered fuzzy search on the opposite tracker
//! - [`matching`] - Optimal edition pairing by confidence
//! - [`compare`] - Media/encoding diff and upload candidates
//! - [`crossup`] - Per-release pipeline and batch runs
//! - [`config`] - TOML configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod crossup;
pub mod matching;
pub mod search;
pub mod tracker;
mod user_agent;

// Re-export commonly used types
pub use api::{ApiError, BrowseParams, ClientOptions, RetryPolicy, ServerPacer, TrackerClient};
pub use catalog::{Edition, Group, SearchHit, SearchQuery, Torrent};
pub use compare::{EditionComparison, EncodingStatus, UploadCandidate};
pub use config::{AppConfig, ConfigError};
pub use crossup::{CrossUploadError, CrossUploader, RunReport, RunSettings, Target};
pub use matching::{EditionMatch, match_editions};
pub use search::{SearchError, TieredSearch};
pub use tracker::TrackerConfig;
