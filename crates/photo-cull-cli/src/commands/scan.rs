//! Scan command - triage new trip folders by resolution.

use anyhow::{Context, Result};
use clap::Args;
use photo_cull_adapters::{clock, JsonlJournal, LibraryScanner};
use tracing::info;

use super::Globals;
use crate::config;
use crate::output::{JsonOutput, OutputFormat, ProgressBar, Reporter};

/// Arguments for the scan command
#[derive(Args)]
pub struct ScanArgs {
    /// Re-scan folders already recorded in the ledger
    #[arg(long)]
    pub rescan: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Run the scan command.
pub fn run(args: &ScanArgs, globals: Globals<'_>) -> Result<()> {
    let mut settings = config::load(globals.config)?;
    if args.rescan {
        settings.rescan_all = true;
    }
    info!(base = %settings.base_dir.display(), rescan_all = settings.rescan_all, "Scanning library");

    let journal_path = settings.journal_path();
    let journal = JsonlJournal::append_to(&journal_path)
        .with_context(|| format!("Failed to open pool journal {}", journal_path.display()))?;
    let bar = ProgressBar::new(globals.quiet);
    let output = JsonOutput::stdout(args.format);
    let reporter = Reporter::new(&bar, &output);

    let summary = LibraryScanner::new(&settings, &journal, &reporter).run(&clock::today())?;
    output.finish(&summary)
}
