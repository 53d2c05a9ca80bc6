//! Greyscale quality checks.
//!
//! Each check implements [`QualityCheck`] for one heuristic. The quality gate
//! runs them in order and stops at the first failure.

mod exposure;
mod noise;
mod sharpness;

use image::GrayImage;

use crate::domain::QualityFailure;

pub use exposure::{ExposureCheck, Histogram};
pub use noise::NoiseCheck;
pub use sharpness::{laplacian_variance, SharpnessCheck};

/// A single threshold heuristic over a greyscale image.
pub trait QualityCheck: Send + Sync {
    /// Returns the name of this check.
    fn name(&self) -> &'static str;

    /// Evaluates the image.
    ///
    /// # Returns
    ///
    /// `None` when the image passes, otherwise the failure.
    fn check(&self, luma: &GrayImage) -> Option<QualityFailure>;
}
