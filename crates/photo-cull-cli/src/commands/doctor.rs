//! Doctor command - environment report.

use anyhow::Result;
use photo_cull_adapters::ModelStore;
use photo_cull_core::inference::{describe_device, select_device};

use super::Globals;
use crate::config;

/// Run the doctor command.
///
/// Prints the report on stdout and fails when the configuration is missing
/// or invalid, or a model is not installed.
pub fn run(globals: Globals<'_>) -> Result<()> {
    let mut problems = 0usize;

    println!("photo-cull {}", env!("CARGO_PKG_VERSION"));
    println!(
        "platform: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    if let Some(user) = config::user_config_path() {
        println!("user config: {}", user.display());
    }

    let mut configured_models = None;
    match config::locate(globals.config) {
        Ok(located) => {
            println!(
                "config: {} ({})",
                located.path.display(),
                located.origin
            );
            match config::load_file(&located.path) {
                Ok(settings) => {
                    println!("  valid: yes");
                    println!("  library: {}", settings.base_dir.display());
                    println!("  selected: {}", settings.selected_dir.display());
                    println!("  ledger: {}", settings.ledger_path().display());
                    configured_models = settings.content.models_dir;
                }
                Err(e) => {
                    problems += 1;
                    println!("  valid: no ({e})");
                }
            }
        }
        Err(e) => {
            problems += 1;
            println!("config: missing ({e})");
        }
    }

    let store = ModelStore::resolve(None, configured_models.as_deref());
    println!("models: {}", store.dir().display());
    for status in store.list() {
        let state = if status.installed {
            "installed"
        } else {
            problems += 1;
            "missing"
        };
        println!("  {}: {state}", status.name);
    }

    println!("device: {}", describe_device(&select_device()));

    if problems > 0 {
        anyhow::bail!("{problems} problem(s) found");
    }
    Ok(())
}
