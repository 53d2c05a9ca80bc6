//! Synthetic images and temporary photo libraries.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use photo_cull_core::domain::{ContentSection, QualitySection, SettingsDocument};
use photo_cull_core::{ImageInfo, Settings};
use tempfile::TempDir;

/// Builder for creating synthetic test images.
///
/// Each constructor targets one verdict of the quality gate with its default
/// thresholds.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Checkerboard in two grey levels.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32, cell: u32, dark: u8, light: u8) -> ImageInfo {
        let cell = cell.max(1);
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([dark])
            } else {
                Luma([light])
            }
        });
        ImageInfo::new("synthetic://checkerboard", DynamicImage::ImageLuma8(img))
    }

    /// Sharp, contrasty, well exposed: passes every quality check.
    #[must_use]
    pub fn good(width: u32, height: u32) -> ImageInfo {
        Self::checkerboard(width, height, 8, 60, 190)
    }

    /// Uniform grey (no edges, fails sharpness).
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> ImageInfo {
        let img = GrayImage::from_pixel(width, height, Luma([value]));
        ImageInfo::new("synthetic://uniform_gray", DynamicImage::ImageLuma8(img))
    }

    /// Fine pattern with little spread (sharp, but fails the noise check).
    #[must_use]
    pub fn low_contrast(width: u32, height: u32) -> ImageInfo {
        Self::checkerboard(width, height, 1, 120, 140)
    }

    /// Sharp but dark (fails exposure, under).
    #[must_use]
    pub fn dark(width: u32, height: u32) -> ImageInfo {
        Self::checkerboard(width, height, 4, 0, 60)
    }

    /// Sharp but bright (fails exposure, over).
    #[must_use]
    pub fn bright(width: u32, height: u32) -> ImageInfo {
        Self::checkerboard(width, height, 4, 200, 255)
    }

    /// Creates an RGB color image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> ImageInfo {
        let img = RgbImage::from_pixel(width, height, image::Rgb([r, g, b]));
        ImageInfo::new("synthetic://rgb_uniform", DynamicImage::ImageRgb8(img))
    }

    /// Returns a standard sharp test image (128x128).
    #[must_use]
    pub fn sharp_image() -> ImageInfo {
        Self::good(128, 128)
    }

    /// Encodes the image to `path`; the format follows the extension.
    ///
    /// # Panics
    ///
    /// Panics if the image cannot be written.
    #[allow(clippy::expect_used)]
    pub fn save(info: &ImageInfo, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create image directory");
        }
        // JPEG has no alpha and no 16-bit support; RGB8 encodes everywhere.
        DynamicImage::ImageRgb8(info.image.to_rgb8())
            .save(path)
            .expect("encode synthetic image");
    }
}

/// A throwaway photo library on disk.
///
/// Layout: `<root>/library` is the base directory (trip folders, `Selected`,
/// `meta`, `needs_edit`); `<root>/config/info.json` is written on request.
/// Minimum resolution is 1920x1080, valid extensions `jpg`, `jpeg`, `png`.
pub struct LibraryBuilder {
    root: TempDir,
    min_width: u32,
    min_height: u32,
}

impl LibraryBuilder {
    /// Creates an empty library.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(root.path().join("library")).expect("create library dir");
        Self {
            root,
            min_width: 1920,
            min_height: 1080,
        }
    }

    /// Overrides the minimum resolution.
    #[must_use]
    pub const fn with_min_resolution(mut self, width: u32, height: u32) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    /// Temporary root holding the library and the config directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Library base directory.
    #[must_use]
    pub fn base(&self) -> PathBuf {
        self.root.path().join("library")
    }

    /// Selected pool directory.
    #[must_use]
    pub fn selected(&self) -> PathBuf {
        self.base().join("Selected")
    }

    /// Needs-edit pool directory.
    #[must_use]
    pub fn needs_edit(&self) -> PathBuf {
        self.base().join("needs_edit")
    }

    /// Writes a sharp, well-exposed image into a trip folder.
    pub fn image(&self, trip: &str, file: &str, width: u32, height: u32) -> PathBuf {
        let path = self.base().join(trip).join(file);
        SyntheticImageBuilder::save(&SyntheticImageBuilder::good(width, height), &path);
        path
    }

    /// Writes an image directly into the Selected pool.
    pub fn selected_image(&self, file: &str, image: &ImageInfo) -> PathBuf {
        let path = self.selected().join(file);
        SyntheticImageBuilder::save(image, &path);
        path
    }

    /// Writes raw bytes relative to the base directory.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[allow(clippy::expect_used)]
    pub fn file(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.base().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, bytes).expect("write file");
        path
    }

    /// The settings document describing this library.
    #[must_use]
    pub fn document(&self) -> SettingsDocument {
        SettingsDocument {
            base_photo_dir: self.base(),
            selected_photo_dir: PathBuf::from("Selected"),
            meta_dir: PathBuf::from("meta"),
            processed_log_file: "processed.json".to_string(),
            min_width: self.min_width,
            min_height: self.min_height,
            valid_extensions: ["jpg", "jpeg", "png"].map(String::from).to_vec(),
            rescan_all: false,
            quality: QualitySection::default(),
            content: ContentSection::default(),
        }
    }

    /// Validated settings for this library.
    ///
    /// # Panics
    ///
    /// Panics if the document does not validate.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings::from_document(self.document()).expect("valid test settings")
    }

    /// Writes `<root>/config/info.json` and returns its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[allow(clippy::expect_used)]
    pub fn write_config(&self) -> PathBuf {
        let document = self.document();
        let json = serde_json::json!({
            "base_photo_dir": document.base_photo_dir,
            "selected_photo_dir": document.selected_photo_dir,
            "meta_dir": document.meta_dir,
            "processed_log_file": document.processed_log_file,
            "min_width": document.min_width,
            "min_height": document.min_height,
            "valid_extensions": document.valid_extensions,
        });
        let dir = self.root.path().join("config");
        fs::create_dir_all(&dir).expect("create config dir");
        let path = dir.join("info.json");
        fs::write(&path, serde_json::to_vec_pretty(&json).expect("serialize config"))
            .expect("write config");
        path
    }

    /// Lists file names directly inside `dir`, sorted.
    #[must_use]
    pub fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for LibraryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
