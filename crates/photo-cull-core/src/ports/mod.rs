//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod detector;
mod journal;
mod progress;

pub use detector::{FaceDetector, ObjectDetector};
pub use journal::PoolJournal;
pub use progress::{ProgressEvent, ProgressSink};
