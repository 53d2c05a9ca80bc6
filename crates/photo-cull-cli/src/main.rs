//! Photo Cull CLI - Trip-folder photo culling.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let globals = cli.globals();
    let result = match &cli.command {
        Commands::Scan(args) => commands::scan::run(args, globals),
        Commands::Quality(args) => commands::quality::run(args, globals),
        Commands::Content(args) => commands::content::run(args, globals),
        Commands::Models(args) => commands::models::run(args, globals),
        Commands::Doctor => commands::doctor::run(globals),
    };

    let exit_code = match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    };

    exit_code.into()
}
