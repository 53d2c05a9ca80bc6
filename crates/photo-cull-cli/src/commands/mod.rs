//! CLI command definitions and handlers.

pub mod content;
pub mod doctor;
pub mod models;
pub mod quality;
pub mod scan;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

/// Photo Cull - Trip-folder photo culling
#[derive(Parser)]
#[command(name = "photo-cull")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings document (default: config/info.json searched upward, then the user config)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Options shared by every command.
    #[must_use]
    pub fn globals(&self) -> Globals<'_> {
        Globals {
            config: self.config.as_deref(),
            quiet: self.quiet,
        }
    }
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Copy new trip folders into the Selected and needs-edit pools
    Scan(scan::ScanArgs),
    /// Move blurry, flat or badly exposed images out of the Selected pool
    Quality(quality::QualityArgs),
    /// Delete Selected images showing faces, objects or landmarks
    Content(content::ContentArgs),
    /// Manage ML models
    Models(models::ModelsArgs),
    /// Report on configuration, models and inference device
    Doctor,
}

/// Global options.
#[derive(Debug, Clone, Copy)]
pub struct Globals<'a> {
    /// Explicit settings document.
    pub config: Option<&'a Path>,
    /// Hide progress output.
    pub quiet: bool,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// The command completed.
    Success = 0,
    /// The command failed.
    Error = 1,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
