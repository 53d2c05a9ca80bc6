//! Noise / contrast check.
//!
//! Very low intensity spread means a flat, washed-out or blank frame.

use image::GrayImage;

use super::{Histogram, QualityCheck};
use crate::domain::QualityFailure;

/// Flags images whose greyscale standard deviation is under a threshold.
#[derive(Debug, Clone)]
pub struct NoiseCheck {
    threshold: f64,
}

impl NoiseCheck {
    /// Creates a noise check with the given minimum standard deviation.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for NoiseCheck {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl QualityCheck for NoiseCheck {
    fn name(&self) -> &'static str {
        "noise"
    }

    fn check(&self, luma: &GrayImage) -> Option<QualityFailure> {
        let std_dev = Histogram::from_luma(luma).std_dev();
        (std_dev < self.threshold).then_some(QualityFailure::TooFlat {
            std_dev,
            threshold: self.threshold,
        })
    }
}
