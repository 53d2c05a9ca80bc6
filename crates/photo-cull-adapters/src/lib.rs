//! Photo Cull Adapters - Filesystem and network adapters for photo-cull.
//!
//! This crate provides:
//! - Pool directory listing, copying and moving
//! - The trip-folder scanner and its processed-folder ledger
//! - Quality and content passes over the Selected pool
//! - The JSON Lines pool journal
//! - Model downloading and lookup

pub mod clock;
pub mod fs;
pub mod journal;
pub mod ledger;
pub mod models;
pub mod passes;
pub mod scanner;

pub use journal::JsonlJournal;
pub use ledger::LedgerStore;
pub use models::{ModelInfo, ModelStatus, ModelStore, MODELS};
pub use passes::{run_content_pass, run_quality_pass, PassSummary};
pub use scanner::{FolderSummary, LibraryScanner, ScanSummary};
