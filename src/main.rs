//! marginalia - comments anchored inside markdown documents
//!
//! marginalia provides:
//! - A hidden, self-contained comment block stored in each document
//! - Anchors that are re-located after edits, or marked orphaned
//! - HTML previews with anchored text highlighted
//! - Unified output format (jsonl/json/md/raw)

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod backends;
mod cli;
mod core;
mod preview;
mod reconcile;
mod store;

/// Environment variable holding an env-filter directive
const LOG_ENV: &str = "MARGINALIA_LOG";

fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    cli::run(cli)
}
