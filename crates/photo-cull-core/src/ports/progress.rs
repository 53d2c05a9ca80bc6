//! Progress reporting port for UI integration.

use crate::domain::PoolEvent;

/// Events emitted while scanning the library or running a gate pass.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A trip folder is about to be processed.
    FolderStarted {
        /// Folder name.
        folder: String,
        /// Number of candidate files in the folder.
        files: usize,
    },
    /// A trip folder was skipped because the ledger already lists it.
    FolderSkipped {
        /// Folder name.
        folder: String,
    },
    /// A trip folder has been processed.
    FolderFinished {
        /// Folder name.
        folder: String,
        /// Files copied into the Selected pool.
        selected: usize,
        /// Files copied into the Edit pool.
        edit: usize,
    },
    /// A gate pass is about to evaluate an image.
    Started {
        /// Path to the image.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch, if known.
        total: Option<usize>,
    },
    /// A decision was applied to an image.
    Decided {
        /// The recorded transition.
        event: PoolEvent,
    },
    /// An image was skipped due to an error.
    Skipped {
        /// Path to the image.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// The scan or pass is complete.
    Finished {
        /// Images handled.
        processed: usize,
        /// Images skipped.
        skipped: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
