//! Models command - manage ML models.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use photo_cull_adapters::{ModelStore, MODELS};
use tracing::debug;

use super::Globals;
use crate::config;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// Download required models from a mirror
    Fetch {
        /// Download again even if the file exists
        #[arg(long)]
        force: bool,

        /// Base URL serving the model files by name
        #[arg(long, value_name = "URL")]
        from: Option<String>,
    },
    /// List installed models
    List,
    /// Print model directory path
    Path,
}

/// Run the models command.
pub fn run(args: &ModelsArgs, globals: Globals<'_>) -> Result<()> {
    let store = ModelStore::resolve(
        args.models_dir.as_deref(),
        configured_dir(globals)?.as_deref(),
    );
    match &args.command {
        ModelsCommand::Fetch { force, from } => {
            fetch_models(&store, *force, from.as_deref(), globals.quiet)
        }
        ModelsCommand::List => {
            list_models(&store);
            Ok(())
        }
        ModelsCommand::Path => {
            println!("{}", store.dir().display());
            Ok(())
        }
    }
}

/// Models directory from the settings document.
///
/// The document is optional here unless `--config` names one explicitly.
fn configured_dir(globals: Globals<'_>) -> Result<Option<PathBuf>> {
    match config::load(globals.config) {
        Ok(settings) => Ok(settings.content.models_dir),
        Err(e) if globals.config.is_none() => {
            debug!("No usable config for models directory: {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn fetch_models(store: &ModelStore, force: bool, mirror: Option<&str>, quiet: bool) -> Result<()> {
    let spinner = if quiet || !std::io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Fetching models into {}", store.dir().display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let fetched = match store.fetch(force, mirror) {
        Ok(fetched) => fetched,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    if fetched.is_empty() {
        spinner.finish_with_message("All models already installed");
    } else {
        spinner.finish_with_message(format!("Downloaded: {}", fetched.join(", ")));
    }
    Ok(())
}

fn list_models(store: &ModelStore) {
    let models = store.list();

    println!("Models directory: {}", store.dir().display());
    println!();

    for status in &models {
        let mark = if status.installed { "✓" } else { "✗" };
        let filename = MODELS
            .iter()
            .find(|m| m.name == status.name)
            .map_or("unknown", |m| m.filename);
        println!("  {mark} {} ({filename})", status.name);
    }

    println!();
    let installed_count = models.iter().filter(|s| s.installed).count();
    println!("{}/{} models installed", installed_count, models.len());
}
