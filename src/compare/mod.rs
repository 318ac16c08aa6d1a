//! Turning edition matches into upload candidates.
//!
//! [`compare_editions`] diffs each match per media and encoding, suppressing
//! source torrents whose size already exists anywhere on the target release
//! and lossy torrents superseded by lossless. [`find_upload_candidates`] then
//! flattens the remaining candidates into a priority-ordered list.

mod candidates;
mod comparison;

use thiserror::Error;

pub use candidates::{
    PRIORITY_MISSING_GROUP, PRIORITY_NEW_EDITION, PRIORITY_NEW_ENCODING, PRIORITY_NEW_MEDIA,
    UploadCandidate, find_upload_candidates, missing_release_candidates, priority_label,
};
pub use comparison::{
    EditionComparison, EncodingComparison, EncodingStatus, MediaComparison, compare_editions,
    is_lossless,
};

/// Structurally invalid comparison input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompareError {
    #[error("torrent {torrent_id} has no {field}")]
    InvalidTorrent {
        torrent_id: i64,
        field: &'static str,
    },
}
