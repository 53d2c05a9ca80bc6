//! Decoded image handed to the gates.
//!
//! Files are opened by content, not by extension: a PNG saved as `.jpg` is
//! still readable.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, ImageReader, ImageResult, Luma};

/// Fixed-point BT.601 luma weights (R, G, B), scaled by `1 << LUMA_SHIFT`.
const LUMA_WEIGHTS: [u32; 3] = [4899, 9617, 1868];
const LUMA_SHIFT: u32 = 14;

/// A decoded image and the path it was read from.
///
/// Never cached across gates: each gate decodes the file again.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Path to the image file.
    pub path: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Decoded image data.
    pub image: DynamicImage,
}

impl ImageInfo {
    /// Wraps an already decoded image.
    #[must_use]
    pub fn new(path: impl Into<String>, image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            path: path.into(),
            width,
            height,
            image,
        }
    }

    /// Opens and decodes a file, guessing the format from its contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn open(path: &Path) -> ImageResult<Self> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(Self::new(path.display().to_string(), image))
    }

    /// Greyscale conversion with BT.601 weights.
    ///
    /// Colour pixels use `(4899 R + 9617 G + 1868 B + 8192) >> 14`; alpha is
    /// ignored. Greyscale sources are returned unchanged.
    #[must_use]
    pub fn to_luma8(&self) -> GrayImage {
        match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => self.image.to_luma8(),
            other => {
                let rgb = other.to_rgb8();
                GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    Luma([bt601(rgb.get_pixel(x, y).0)])
                })
            }
        }
    }
}

/// Width and height from the image header, without decoding pixels.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its header is invalid.
pub fn image_dimensions(path: &Path) -> ImageResult<(u32, u32)> {
    ImageReader::open(path)?.with_guessed_format()?.into_dimensions()
}

fn bt601([r, g, b]: [u8; 3]) -> u8 {
    let weighted = LUMA_WEIGHTS[0] * u32::from(r)
        + LUMA_WEIGHTS[1] * u32::from(g)
        + LUMA_WEIGHTS[2] * u32::from(b);
    let luma = (weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
    u8::try_from(luma).unwrap_or(u8::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_bt601_weights() {
        assert_eq!(bt601([255, 0, 0]), 76);
        assert_eq!(bt601([100, 0, 0]), 30);
        assert_eq!(bt601([0, 255, 0]), 150);
        assert_eq!(bt601([0, 0, 255]), 29);
        assert_eq!(bt601([255, 255, 255]), 255);
        assert_eq!(bt601([0, 0, 0]), 0);
    }

    #[test]
    fn test_colour_luma_uses_bt601() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let luma = ImageInfo::new("red.png", DynamicImage::ImageRgb8(rgb)).to_luma8();
        assert!(luma.pixels().all(|p| p.0 == [76]));
    }

    #[test]
    fn test_alpha_is_ignored() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 10]));
        let luma = ImageInfo::new("green.png", DynamicImage::ImageRgba8(rgba)).to_luma8();
        assert!(luma.pixels().all(|p| p.0 == [150]));
    }

    #[test]
    fn test_grey_source_unchanged() {
        let gray = GrayImage::from_pixel(3, 1, Luma([77]));
        let luma = ImageInfo::new("g.png", DynamicImage::ImageLuma8(gray.clone())).to_luma8();
        assert_eq!(luma, gray);
    }

    #[test]
    fn test_open_sniffs_mislabelled_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actually_png.jpg");
        GrayImage::from_pixel(64, 48, Luma([90]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        assert_eq!(image_dimensions(&path).unwrap(), (64, 48));
        let info = ImageInfo::open(&path).unwrap();
        assert_eq!((info.width, info.height), (64, 48));
    }

    #[test]
    fn test_open_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        assert!(ImageInfo::open(&path).is_err());
        assert!(image_dimensions(&path).is_err());
    }
}
