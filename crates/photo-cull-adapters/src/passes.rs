//! Gate passes over the Selected pool.
//!
//! Each pass lists the pool once, evaluates every image in name order and
//! applies the decision before moving on to the next image.

use std::path::Path;

use anyhow::{Context, Result};
use photo_cull_core::{
    ContentGate, ContentVerdict, Pool, PoolEvent, PoolJournal, ProgressEvent, ProgressSink,
    QualityGate, QualityVerdict, Settings, Stage,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::clock;
use crate::fs;

/// Tally of one pass over the Selected pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Images evaluated.
    pub checked: usize,
    /// Images left in the Selected pool.
    pub kept: usize,
    /// Images moved to the needs-edit pool.
    pub moved: usize,
    /// Images deleted.
    pub removed: usize,
    /// Decisions whose file operation failed.
    pub failed_actions: usize,
}

/// What a verdict asks the pass to do with the file.
enum Action {
    Keep,
    MoveToEdit(String),
    Remove(String),
}

struct Pass<'a> {
    stage: Stage,
    settings: &'a Settings,
    journal: &'a dyn PoolJournal,
    progress: &'a dyn ProgressSink,
    summary: PassSummary,
}

impl Pass<'_> {
    fn images(&self) -> Result<Vec<std::path::PathBuf>> {
        std::fs::create_dir_all(&self.settings.needs_edit_dir).with_context(|| {
            format!(
                "Failed to create {}",
                self.settings.needs_edit_dir.display()
            )
        })?;
        fs::pool_images(&self.settings.selected_dir, self.settings)
    }

    fn apply(&mut self, path: &Path, action: Action) {
        self.summary.checked += 1;
        let source = path.display().to_string();

        let outcome = match action {
            Action::Keep => {
                self.summary.kept += 1;
                Ok((None, Pool::Selected, None))
            }
            Action::MoveToEdit(reason) => fs::move_into(path, &self.settings.needs_edit_dir)
                .map(|dest| {
                    self.summary.moved += 1;
                    (Some(dest.display().to_string()), Pool::NeedsEdit, Some(reason))
                }),
            Action::Remove(reason) => fs::remove_image(path).map(|()| {
                self.summary.removed += 1;
                (None, Pool::Removed, Some(reason))
            }),
        };

        match outcome {
            Ok((destination, pool, reason)) => {
                let event = PoolEvent {
                    timestamp: clock::timestamp(),
                    stage: self.stage,
                    source,
                    destination,
                    pool,
                    reason,
                };
                if let Err(e) = self.journal.record(&event) {
                    warn!(error = %e, "failed to record pool event");
                }
                self.progress.on_event(ProgressEvent::Decided { event });
            }
            Err(e) => {
                warn!(path = %source, error = %format!("{e:#}"), "failed to apply decision");
                self.summary.failed_actions += 1;
                self.progress.on_event(ProgressEvent::Skipped {
                    path: source,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    fn finish(self) -> PassSummary {
        if let Err(e) = self.journal.flush() {
            warn!(error = %e, "failed to flush pool journal");
        }
        self.progress.on_event(ProgressEvent::Finished {
            processed: self.summary.checked - self.summary.failed_actions,
            skipped: self.summary.failed_actions,
        });
        info!(
            stage = ?self.stage,
            checked = self.summary.checked,
            kept = self.summary.kept,
            moved = self.summary.moved,
            removed = self.summary.removed,
            failed = self.summary.failed_actions,
            "pass complete"
        );
        self.summary
    }

    fn run(mut self, mut decide: impl FnMut(&Path) -> Action) -> Result<PassSummary> {
        let images = self.images()?;
        let total = images.len();
        for (index, path) in images.iter().enumerate() {
            self.progress.on_event(ProgressEvent::Started {
                path: path.display().to_string(),
                index,
                total: Some(total),
            });
            let action = decide(path);
            self.apply(path, action);
        }
        Ok(self.finish())
    }
}

/// Runs the quality gate over the Selected pool.
///
/// Failing images are moved (not copied) to the needs-edit pool; passing
/// images stay.
///
/// # Errors
///
/// Returns an error if the Selected pool cannot be listed or the needs-edit
/// directory cannot be created. Per-image failures are counted.
pub fn run_quality_pass(
    settings: &Settings,
    gate: &QualityGate,
    journal: &dyn PoolJournal,
    progress: &dyn ProgressSink,
) -> Result<PassSummary> {
    let pass = Pass {
        stage: Stage::Quality,
        settings,
        journal,
        progress,
        summary: PassSummary::default(),
    };
    pass.run(|path| match gate.evaluate_path(path) {
        QualityVerdict::Pass => Action::Keep,
        QualityVerdict::Fail(failure) => {
            info!(path = %path.display(), %failure, "quality check failed");
            Action::MoveToEdit(failure.to_string())
        }
    })
}

/// Runs the content gate over the Selected pool.
///
/// Flagged images are deleted. Images that could not be verified go to the
/// needs-edit pool for manual review. Clear images stay.
///
/// # Errors
///
/// Returns an error if the Selected pool cannot be listed or the needs-edit
/// directory cannot be created. Per-image failures are counted.
pub fn run_content_pass(
    settings: &Settings,
    gate: &ContentGate,
    journal: &dyn PoolJournal,
    progress: &dyn ProgressSink,
) -> Result<PassSummary> {
    let pass = Pass {
        stage: Stage::Content,
        settings,
        journal,
        progress,
        summary: PassSummary::default(),
    };
    pass.run(|path| match gate.evaluate_path(path) {
        ContentVerdict::Clear => Action::Keep,
        ContentVerdict::Flagged { hits } => {
            let reason = hits
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            info!(path = %path.display(), %reason, "content flagged, removing");
            Action::Remove(reason)
        }
        ContentVerdict::Unverified { reason } => {
            warn!(path = %path.display(), %reason, "content unverified, moving to needs_edit");
            Action::MoveToEdit(format!("unverified: {reason}"))
        }
    })
}
