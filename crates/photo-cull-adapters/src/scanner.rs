//! Trip-folder scanner.
//!
//! Walks the trip folders under the library root, copies images that meet
//! the minimum resolution into the Selected pool and everything else into
//! the needs-edit pool, and records processed folders in the ledger.

use std::path::Path;

use anyhow::Result;
use photo_cull_core::{
    Pool, PoolEvent, PoolJournal, ProcessedLedger, ProgressEvent, ProgressSink, Settings, Stage,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock;
use crate::fs::{self, CopyOutcome};
use crate::ledger::LedgerStore;

/// Result of processing one trip folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderSummary {
    /// Folder name.
    pub folder: String,
    /// Files copied into the Selected pool.
    pub selected: usize,
    /// Files copied into the needs-edit pool.
    pub edit: usize,
    /// Files that could not be copied.
    pub failed: usize,
    /// Whether the folder was recorded in the ledger.
    pub marked: bool,
    /// Why the folder could not be processed at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a whole scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Date recorded in the ledger for processed folders.
    pub date: String,
    /// Folders processed in this run, in name order.
    pub folders: Vec<FolderSummary>,
    /// Folders skipped because the ledger already lists them.
    pub skipped: Vec<String>,
    /// Files copied into the Selected pool.
    pub total_selected: usize,
    /// Files copied into the needs-edit pool.
    pub total_edit: usize,
    /// Files that could not be copied.
    pub total_failed: usize,
}

/// Where one file went and why.
struct Routing {
    pool: Pool,
    reason: Option<String>,
}

/// Scans the library once.
pub struct LibraryScanner<'a> {
    settings: &'a Settings,
    journal: &'a dyn PoolJournal,
    progress: &'a dyn ProgressSink,
}

impl<'a> LibraryScanner<'a> {
    /// Creates a scanner reporting to `journal` and `progress`.
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        journal: &'a dyn PoolJournal,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            settings,
            journal,
            progress,
        }
    }

    /// Runs a scan, marking processed folders with `date` (`YYYY-MM-DD`).
    ///
    /// The ledger is read once before the first folder and written once after
    /// the last.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool directories cannot be created, the base
    /// directory cannot be listed, or the ledger cannot be read or written.
    /// Per-file copy failures are counted, not returned.
    pub fn run(&self, date: &str) -> Result<ScanSummary> {
        fs::ensure_pool_dirs(self.settings)?;
        let store = LedgerStore::new(self.settings.ledger_path());
        let mut ledger = store.load()?;

        let mut summary = ScanSummary {
            date: date.to_string(),
            ..ScanSummary::default()
        };

        for (name, dir) in fs::trip_folders(self.settings)? {
            if !self.settings.rescan_all && ledger.contains(&name) {
                debug!(folder = %name, "already processed");
                self.progress
                    .on_event(ProgressEvent::FolderSkipped { folder: name.clone() });
                summary.skipped.push(name);
                continue;
            }

            let folder = self.scan_folder(&name, &dir, &mut ledger, date);
            summary.total_selected += folder.selected;
            summary.total_edit += folder.edit;
            summary.total_failed += folder.failed;
            summary.folders.push(folder);
        }

        store.save(&ledger)?;
        if let Err(e) = self.journal.flush() {
            warn!(error = %e, "failed to flush pool journal");
        }

        self.progress.on_event(ProgressEvent::Finished {
            processed: summary.total_selected + summary.total_edit,
            skipped: summary.total_failed,
        });
        info!(
            folders = summary.folders.len(),
            skipped = summary.skipped.len(),
            selected = summary.total_selected,
            edit = summary.total_edit,
            "scan complete"
        );
        Ok(summary)
    }

    fn scan_folder(
        &self,
        name: &str,
        dir: &Path,
        ledger: &mut ProcessedLedger,
        date: &str,
    ) -> FolderSummary {
        let mut summary = FolderSummary {
            folder: name.to_string(),
            ..FolderSummary::default()
        };

        let files = match fs::trip_files(dir, self.settings) {
            Ok(files) => files,
            Err(e) => {
                warn!(folder = %name, error = %format!("{e:#}"), "cannot list folder");
                summary.error = Some(format!("{e:#}"));
                return summary;
            }
        };

        info!(folder = %name, files = files.len(), "processing folder");
        self.progress.on_event(ProgressEvent::FolderStarted {
            folder: name.to_string(),
            files: files.len(),
        });

        for file in &files {
            let routing = self.classify(file);
            let target = match routing.pool {
                Pool::Selected => &self.settings.selected_dir,
                _ => &self.settings.needs_edit_dir,
            };

            match fs::copy_into(file, target) {
                Ok(CopyOutcome::Copied(dest)) => {
                    match routing.pool {
                        Pool::Selected => summary.selected += 1,
                        _ => summary.edit += 1,
                    }
                    self.record(PoolEvent {
                        timestamp: clock::timestamp(),
                        stage: Stage::Scan,
                        source: file.display().to_string(),
                        destination: Some(dest.display().to_string()),
                        pool: routing.pool,
                        reason: routing.reason,
                    });
                }
                Ok(CopyOutcome::SameFile) => {
                    self.progress.on_event(ProgressEvent::Skipped {
                        path: file.display().to_string(),
                        reason: "source and destination are the same file".to_string(),
                    });
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %format!("{e:#}"), "copy failed");
                    summary.failed += 1;
                    self.progress.on_event(ProgressEvent::Skipped {
                        path: file.display().to_string(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        if summary.failed == 0 {
            ledger.mark(name, date);
            summary.marked = true;
        } else {
            warn!(folder = %name, failed = summary.failed, "folder left unmarked for retry");
        }

        self.progress.on_event(ProgressEvent::FolderFinished {
            folder: name.to_string(),
            selected: summary.selected,
            edit: summary.edit,
        });
        summary
    }

    fn classify(&self, file: &Path) -> Routing {
        match fs::read_dimensions(file) {
            Ok((width, height)) if self.settings.meets_resolution(width, height) => Routing {
                pool: Pool::Selected,
                reason: None,
            },
            Ok((width, height)) => Routing {
                pool: Pool::NeedsEdit,
                reason: Some(format!(
                    "resolution {width}x{height} below {}x{}",
                    self.settings.min_width, self.settings.min_height
                )),
            },
            Err(e) => {
                debug!(path = %file.display(), error = %format!("{e:#}"), "unreadable image");
                Routing {
                    pool: Pool::NeedsEdit,
                    reason: Some(format!("unreadable: {e:#}")),
                }
            }
        }
    }

    fn record(&self, event: PoolEvent) {
        if let Err(e) = self.journal.record(&event) {
            warn!(error = %e, "failed to record pool event");
        }
        self.progress.on_event(ProgressEvent::Decided { event });
    }
}
