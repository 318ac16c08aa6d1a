//! CLI entry point for crossupload.

use anyhow::{Context, Result};
use clap::Parser;
use crossupload_core::config::{AppConfig, resolve_config_path};
use crossupload_core::crossup::{CrossUploader, parse_target, render, render_report};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config_path = resolve_config_path(args.config.as_deref())?;
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Cannot load config '{}'", config_path.display()))?;

    let trackers = config.trackers();
    let target = parse_target(&args.target, args.tracker.as_deref(), &trackers)
        .with_context(|| format!("Cannot interpret target '{}'", args.target))?;

    let uploader = CrossUploader::from_config(&config, target.tracker(), args.strict)?;
    let source = uploader.source().tracker().clone();
    let opposite = uploader.target().tracker().clone();
    info!(
        source = %source.display_name(),
        target = %opposite.display_name(),
        "Searching for cross-upload candidates"
    );

    let entries = uploader
        .load_entries(&target)
        .await
        .with_context(|| format!("Cannot load entries from {}", source.display_name()))?;
    info!(entries = entries.len(), "Loaded entries");

    let report = uploader.run(&entries).await;

    if args.verbose_report {
        for outcome in &report.outcomes {
            println!("{}", render(outcome, &source, &opposite));
        }
    }
    print!("{}", render_report(&report, &source));

    Ok(())
}
