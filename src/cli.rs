//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Find cross-upload candidates between two Gazelle music trackers.
///
/// TARGET is a group id on the source tracker, a `torrents.php?id=` group URL
/// or a collage URL. Releases are looked up on the opposite tracker and every
/// edition, media and encoding the target lacks is reported.
#[derive(Parser, Debug)]
#[command(name = "crossupload")]
#[command(author, version, about)]
pub struct Args {
    /// Group id, group URL or collage URL on the source tracker
    pub target: String,

    /// Source tracker key for a bare group id (default: red)
    #[arg(short, long)]
    pub tracker: Option<String>,

    /// Exact matching only: no fuzzy search tiers or artist variations
    #[arg(long)]
    pub strict: bool,

    /// Config file or directory containing config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print edition matching and media/encoding comparison per release
    #[arg(long)]
    pub verbose_report: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
