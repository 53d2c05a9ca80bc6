//! Detection model ports consumed by the content gate.

use image::{DynamicImage, GrayImage};

use crate::domain::{Detection, FaceRegion};
use crate::error::InferenceError;

/// Finds face regions in a greyscale image.
pub trait FaceDetector: Send + Sync {
    /// Returns the name of the backing model.
    fn name(&self) -> &'static str;

    /// Detects faces.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or inference fails.
    fn detect_faces(&self, image: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError>;
}

/// Labels objects in an image.
pub trait ObjectDetector: Send + Sync {
    /// Returns the name of the backing model.
    fn name(&self) -> &'static str;

    /// Runs one inference and returns every detection with its confidence.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or inference fails.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError>;
}
