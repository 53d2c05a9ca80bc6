//! Sharpness check.
//!
//! Variance of the Laplacian (second-derivative edge response) over the
//! greyscale image. Flat or defocused images have little edge energy and a
//! low variance.

use image::GrayImage;

use super::QualityCheck;
use crate::domain::QualityFailure;

/// Flags images whose Laplacian variance is under a fixed threshold.
#[derive(Debug, Clone)]
pub struct SharpnessCheck {
    threshold: f64,
}

impl SharpnessCheck {
    /// Creates a sharpness check with the given minimum variance.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for SharpnessCheck {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl QualityCheck for SharpnessCheck {
    fn name(&self) -> &'static str {
        "sharpness"
    }

    fn check(&self, luma: &GrayImage) -> Option<QualityFailure> {
        let variance = laplacian_variance(luma);
        (variance < self.threshold).then_some(QualityFailure::TooBlurry {
            variance,
            threshold: self.threshold,
        })
    }
}

/// Population variance of the 3x3 Laplacian response.
///
/// Kernel `[0,1,0; 1,-4,1; 0,1,0]`; borders mirror without repeating the
/// edge pixel (`dcb|abcd|cba`).
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
#[must_use]
pub fn laplacian_variance(luma: &GrayImage) -> f64 {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let at = |x: i64, y: i64| -> f64 {
        let x = reflect(x, width);
        let y = reflect(y, height);
        f64::from(luma.get_pixel(x, y).0[0])
    };

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 0..i64::from(height) {
        for x in 0..i64::from(width) {
            let response =
                at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let count = f64::from(width) * f64::from(height);
    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn reflect(i: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }
    let mirrored = if i < 0 {
        -i
    } else if i >= len {
        2 * len - 2 - i
    } else {
        i
    };
    mirrored.clamp(0, len - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_module_name() {
        assert_eq!(SharpnessCheck::default().name(), "sharpness");
    }

    #[test]
    fn test_uniform_image_has_zero_variance() {
        let img = GrayImage::from_pixel(64, 64, Luma([128u8]));
        assert!(laplacian_variance(&img).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uniform_image_fails() {
        let img = GrayImage::from_pixel(64, 64, Luma([128u8]));
        let failure = SharpnessCheck::default().check(&img);
        assert!(matches!(failure, Some(QualityFailure::TooBlurry { .. })));
    }

    #[test]
    fn test_checkerboard_passes() {
        let img = GrayImage::from_fn(64, 64, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Luma([60u8])
            } else {
                Luma([190u8])
            }
        });
        assert!(laplacian_variance(&img) > 1000.0);
        assert!(SharpnessCheck::default().check(&img).is_none());
    }

    #[test]
    fn test_single_pixel_image() {
        let img = GrayImage::from_pixel(1, 1, Luma([42u8]));
        assert!(laplacian_variance(&img).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_edge_response() {
        // One bright pixel in the middle of a dark 3x3 patch:
        // centre -4*255, four neighbours +255, corners 0.
        let mut img = GrayImage::from_pixel(3, 3, Luma([0u8]));
        img.put_pixel(1, 1, Luma([255u8]));

        let responses = [0.0, 255.0, 0.0, 255.0, -1020.0, 255.0, 0.0, 255.0, 0.0];
        let mean: f64 = responses.iter().sum::<f64>() / 9.0;
        let expected: f64 =
            responses.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / 9.0;

        assert!((laplacian_variance(&img) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_borders() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
        assert_eq!(reflect(-1, 1), 0);
    }
}
