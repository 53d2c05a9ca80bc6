//! Test support utilities for photo-cull.
//!
//! Provides synthetic images, throwaway photo libraries, stub detectors and
//! recording sinks for testing the culling pipeline.
//!
//! # Example
//!
//! ```
//! use photo_cull_test_support::{LibraryBuilder, SyntheticImageBuilder};
//!
//! let library = LibraryBuilder::new();
//! library.image("Paris2023", "a.jpg", 64, 48);
//! let settings = library.settings();
//!
//! let sharp = SyntheticImageBuilder::sharp_image();
//! assert!(settings.base_dir.join("Paris2023/a.jpg").exists());
//! assert_eq!(sharp.width, 128);
//! ```

mod builders;
mod mocks;

pub use builders::{LibraryBuilder, SyntheticImageBuilder};
pub use mocks::{
    FailingDetector, MockJournal, MockProgressSink, StubFaceDetector, StubObjectDetector,
};
