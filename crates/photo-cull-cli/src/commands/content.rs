//! Content command - delete Selected images that show people or things.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use photo_cull_adapters::{models, run_content_pass, JsonlJournal, ModelStore};
use photo_cull_core::inference::{BlazeFaceDetector, YoloDetector};
use photo_cull_core::ContentGate;
use tracing::info;

use super::Globals;
use crate::config;
use crate::output::{JsonOutput, OutputFormat, ProgressBar, Reporter};

/// Arguments for the content command
#[derive(Args)]
pub struct ContentArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Run the content command.
///
/// Fails before touching the Selected pool when a model file is missing.
pub fn run(args: &ContentArgs, globals: Globals<'_>) -> Result<()> {
    let settings = config::load(globals.config)?;
    let store = ModelStore::resolve(
        args.models_dir.as_deref(),
        settings.content.models_dir.as_deref(),
    );
    store.require_all()?;

    let face_path = model_path(&store, "blazeface")?;
    let object_path = model_path(&store, "yolov8s")?;
    info!(models = %store.dir().display(), "Running content pass");

    let gate = ContentGate::new(
        Box::new(BlazeFaceDetector::new(
            face_path,
            settings.content.min_face_confidence,
        )),
        Box::new(YoloDetector::new(object_path)),
        settings.content.clone(),
    );

    let journal = JsonlJournal::append_to(&settings.journal_path())?;
    let bar = ProgressBar::new(globals.quiet);
    let output = JsonOutput::stdout(args.format);
    let reporter = Reporter::new(&bar, &output);

    let summary = run_content_pass(&settings, &gate, &journal, &reporter)?;
    output.finish(&summary)
}

fn model_path(store: &ModelStore, name: &str) -> Result<PathBuf> {
    store
        .path(name)
        .with_context(|| format!("Unknown model {name}; known: {}", known_models()))
}

fn known_models() -> String {
    models::MODELS
        .iter()
        .map(|m| m.name)
        .collect::<Vec<_>>()
        .join(", ")
}
