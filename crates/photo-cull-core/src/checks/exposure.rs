//! Exposure check.
//!
//! Mean greyscale intensity must sit inside an inclusive window.

use image::GrayImage;

use super::QualityCheck;
use crate::domain::QualityFailure;

/// 256-bin histogram of luminance values.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Histogram {
    /// Compute histogram from grayscale image.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut bins = [0u64; 256];
        for pixel in image.pixels() {
            bins[usize::from(pixel.0[0])] += 1;
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Returns the total pixel count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Mean luminance; zero for an empty image.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .bins
            .iter()
            .zip(0u64..)
            .map(|(&count, level)| level * count)
            .sum();
        sum as f64 / self.total as f64
    }

    /// Population standard deviation of luminance.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let variance: f64 = self
            .bins
            .iter()
            .zip(0u32..)
            .map(|(&count, level)| {
                let diff = f64::from(level) - mean;
                diff * diff * (count as f64)
            })
            .sum::<f64>()
            / (self.total as f64);
        variance.sqrt()
    }
}

/// Flags images whose mean intensity falls outside `[min, max]`.
#[derive(Debug, Clone)]
pub struct ExposureCheck {
    min: f64,
    max: f64,
}

impl ExposureCheck {
    /// Creates an exposure check with an inclusive mean-intensity window.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Default for ExposureCheck {
    fn default() -> Self {
        Self::new(50.0, 200.0)
    }
}

impl QualityCheck for ExposureCheck {
    fn name(&self) -> &'static str {
        "exposure"
    }

    fn check(&self, luma: &GrayImage) -> Option<QualityFailure> {
        let mean = Histogram::from_luma(luma).mean();
        if mean < self.min {
            Some(QualityFailure::Underexposed {
                mean,
                min: self.min,
            })
        } else if mean > self.max {
            Some(QualityFailure::Overexposed {
                mean,
                max: self.max,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn two_tone(a: u8, b: u8) -> GrayImage {
        GrayImage::from_fn(32, 32, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Luma([a])
            } else {
                Luma([b])
            }
        })
    }

    #[test]
    fn test_histogram_uniform() {
        let img = GrayImage::from_pixel(10, 10, Luma([128u8]));
        let hist = Histogram::from_luma(&img);
        assert_eq!(hist.total(), 100);
        assert!((hist.mean() - 128.0).abs() < f64::EPSILON);
        assert!(hist.std_dev().abs() < f64::EPSILON);
    }

    #[test]
    fn test_histogram_two_tone() {
        let hist = Histogram::from_luma(&two_tone(0, 100));
        assert!((hist.mean() - 50.0).abs() < 1e-9);
        assert!((hist.std_dev() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_empty() {
        let hist = Histogram::from_luma(&GrayImage::new(0, 0));
        assert_eq!(hist.total(), 0);
        assert!(hist.mean().abs() < f64::EPSILON);
        assert!(hist.std_dev().abs() < f64::EPSILON);
    }

    #[test]
    fn test_dark_image_is_underexposed() {
        let failure = ExposureCheck::default().check(&two_tone(0, 60));
        match failure {
            Some(QualityFailure::Underexposed { mean, min }) => {
                assert!((mean - 30.0).abs() < 1e-9);
                assert!((min - 50.0).abs() < f64::EPSILON);
            }
            other => panic!("expected underexposed, got {other:?}"),
        }
    }

    #[test]
    fn test_bright_image_is_overexposed() {
        let failure = ExposureCheck::default().check(&two_tone(200, 255));
        assert!(matches!(failure, Some(QualityFailure::Overexposed { .. })));
    }

    #[test]
    fn test_window_is_inclusive() {
        let check = ExposureCheck::default();
        assert!(check
            .check(&GrayImage::from_pixel(8, 8, Luma([50u8])))
            .is_none());
        assert!(check
            .check(&GrayImage::from_pixel(8, 8, Luma([200u8])))
            .is_none());
        assert!(check
            .check(&GrayImage::from_pixel(8, 8, Luma([201u8])))
            .is_some());
    }
}
