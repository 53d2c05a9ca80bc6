//! Core domain types for photo culling.

mod event;
mod image;
mod ledger;
mod settings;
mod verdict;

pub use event::{Pool, PoolEvent, Stage};
pub use image::{image_dimensions, ImageInfo};
pub use ledger::ProcessedLedger;
pub use settings::{
    ContentSection, ContentSettings, QualitySection, QualitySettings, Settings, SettingsDocument,
    JOURNAL_FILE, NEEDS_EDIT_DIR,
};
pub use verdict::{ContentHit, ContentVerdict, Detection, FaceRegion, QualityFailure, QualityVerdict};
