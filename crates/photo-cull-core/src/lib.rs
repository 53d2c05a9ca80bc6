//! Photo Cull Core - Domain logic, quality checks and content gates
//!
//! This crate contains the settings model, the processed-folder ledger, the
//! ports consumed by the gates, the greyscale quality checks (sharpness,
//! noise, exposure) and the face / object detectors behind the content gate.

pub mod checks;
pub mod domain;
pub mod error;
pub mod gates;
pub mod inference;
pub mod ports;

pub use checks::{ExposureCheck, Histogram, NoiseCheck, QualityCheck, SharpnessCheck};
pub use domain::{
    image_dimensions, ContentHit, ContentSettings, ContentVerdict, Detection, FaceRegion,
    ImageInfo, Pool, PoolEvent, ProcessedLedger, QualityFailure, QualitySettings, QualityVerdict,
    Settings, Stage,
};
pub use error::{ConfigError, InferenceError};
pub use gates::{ContentGate, QualityGate};
pub use ports::{FaceDetector, ObjectDetector, PoolJournal, ProgressEvent, ProgressSink};
