//! Quality command - move weak images out of the Selected pool.

use anyhow::Result;
use clap::Args;
use photo_cull_adapters::{run_quality_pass, JsonlJournal};
use photo_cull_core::QualityGate;
use tracing::info;

use super::Globals;
use crate::config;
use crate::output::{JsonOutput, OutputFormat, ProgressBar, Reporter};

/// Arguments for the quality command
#[derive(Args)]
pub struct QualityArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Run the quality command.
pub fn run(args: &QualityArgs, globals: Globals<'_>) -> Result<()> {
    let settings = config::load(globals.config)?;
    let gate = QualityGate::new(&settings.quality);
    let checks: Vec<&str> = gate.check_names().collect();
    info!(
        pool = %settings.selected_dir.display(),
        checks = %checks.join(", "),
        "Running quality pass"
    );

    let journal = JsonlJournal::append_to(&settings.journal_path())?;
    let bar = ProgressBar::new(globals.quiet);
    let output = JsonOutput::stdout(args.format);
    let reporter = Reporter::new(&bar, &output);

    let summary = run_quality_pass(&settings, &gate, &journal, &reporter)?;
    output.finish(&summary)
}
