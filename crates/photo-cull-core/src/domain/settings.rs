//! Pipeline settings.
//!
//! A settings document is deserialized into [`SettingsDocument`] and then
//! validated into a [`Settings`] value. The validated value is built once per
//! run and handed to every stage explicitly.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the pool directory for images that need manual attention.
pub const NEEDS_EDIT_DIR: &str = "needs_edit";

/// File name of the pool journal inside the metadata directory.
pub const JOURNAL_FILE: &str = "pool_events.jsonl";

/// Raw settings document as written by the user.
///
/// Required keys have no serde default, so a missing key surfaces as a
/// parse error naming that key.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsDocument {
    /// Library root containing the trip folders.
    pub base_photo_dir: PathBuf,
    /// Selected pool, relative to the library root unless absolute.
    pub selected_photo_dir: PathBuf,
    /// Metadata directory, relative to the library root unless absolute.
    pub meta_dir: PathBuf,
    /// Ledger file name inside the metadata directory.
    pub processed_log_file: String,
    /// Minimum accepted width in pixels.
    pub min_width: u32,
    /// Minimum accepted height in pixels.
    pub min_height: u32,
    /// Accepted extensions, with or without the leading dot.
    pub valid_extensions: Vec<String>,
    /// Re-scan folders already present in the ledger.
    #[serde(default)]
    pub rescan_all: bool,
    /// Quality gate overrides.
    #[serde(default)]
    pub quality: QualitySection,
    /// Content gate overrides.
    #[serde(default)]
    pub content: ContentSection,
}

/// Optional quality threshold overrides.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct QualitySection {
    /// Minimum Laplacian variance.
    pub sharpness_threshold: Option<f64>,
    /// Minimum greyscale standard deviation.
    pub noise_threshold: Option<f64>,
    /// Lowest acceptable mean intensity.
    pub min_mean_intensity: Option<f64>,
    /// Highest acceptable mean intensity.
    pub max_mean_intensity: Option<f64>,
}

/// Optional content gate overrides.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    /// Detection confidence above which an object counts as a hit.
    pub confidence_threshold: Option<f32>,
    /// Minimum face detector score.
    pub min_face_confidence: Option<f32>,
    /// Labels treated as landmarks. Empty means every label.
    pub landmark_labels: Vec<String>,
    /// Directory holding detector weights.
    pub models_dir: Option<PathBuf>,
}

/// Thresholds used by the quality gate.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySettings {
    /// Images with a Laplacian variance below this are too blurry.
    pub sharpness_threshold: f64,
    /// Images with an intensity standard deviation below this are too flat.
    pub noise_threshold: f64,
    /// Mean intensity below this is underexposed.
    pub min_mean_intensity: f64,
    /// Mean intensity above this is overexposed.
    pub max_mean_intensity: f64,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            sharpness_threshold: 100.0,
            noise_threshold: 20.0,
            min_mean_intensity: 50.0,
            max_mean_intensity: 200.0,
        }
    }
}

/// Settings used by the content gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSettings {
    /// Object / landmark detections must score strictly above this.
    pub confidence_threshold: f32,
    /// Face regions scoring below this are discarded by the face detector.
    pub min_face_confidence: f32,
    /// Lowercase labels counted as landmarks; empty counts every label.
    pub landmark_labels: BTreeSet<String>,
    /// Detector weights directory override.
    pub models_dir: Option<PathBuf>,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            min_face_confidence: 0.75,
            landmark_labels: BTreeSet::new(),
            models_dir: None,
        }
    }
}

/// Validated pipeline settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Library root.
    pub base_dir: PathBuf,
    /// Selected pool directory.
    pub selected_dir: PathBuf,
    /// Metadata directory (ledger, journal).
    pub meta_dir: PathBuf,
    /// NeedsEdit pool directory.
    pub needs_edit_dir: PathBuf,
    /// Ledger file name inside `meta_dir`.
    pub processed_log_file: String,
    /// Minimum accepted width in pixels.
    pub min_width: u32,
    /// Minimum accepted height in pixels.
    pub min_height: u32,
    /// Lowercase extensions without the leading dot.
    pub valid_extensions: BTreeSet<String>,
    /// Re-scan folders already in the ledger.
    pub rescan_all: bool,
    /// Quality gate thresholds.
    pub quality: QualitySettings,
    /// Content gate settings.
    pub content: ContentSettings,
    reserved_folders: BTreeSet<String>,
}

impl Settings {
    /// Parses and validates a JSON settings document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or a missing key and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let document: SettingsDocument =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    /// Parses and validates a TOML settings document.
    ///
    /// # Errors
    ///
    /// Same as [`Settings::from_json_str`].
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let document: SettingsDocument = toml::from_str(text).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::from_document(document)
    }

    /// Validates a deserialized document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn from_document(document: SettingsDocument) -> Result<Self, ConfigError> {
        require_path("base_photo_dir", &document.base_photo_dir)?;
        require_path("selected_photo_dir", &document.selected_photo_dir)?;
        require_path("meta_dir", &document.meta_dir)?;
        if document.processed_log_file.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "processed_log_file",
                reason: "must not be empty".to_string(),
            });
        }

        let valid_extensions = normalize_extensions(&document.valid_extensions)?;
        let quality = quality_settings(&document.quality)?;
        let content = content_settings(document.content)?;

        let base_dir = document.base_photo_dir;
        let selected_dir = base_dir.join(&document.selected_photo_dir);
        let meta_dir = base_dir.join(&document.meta_dir);
        let needs_edit_dir = base_dir.join(NEEDS_EDIT_DIR);

        let reserved_folders = [
            folder_key(&base_dir, &selected_dir),
            folder_key(&base_dir, &meta_dir),
            Some(NEEDS_EDIT_DIR.to_string()),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(Self {
            base_dir,
            selected_dir,
            meta_dir,
            needs_edit_dir,
            processed_log_file: document.processed_log_file,
            min_width: document.min_width,
            min_height: document.min_height,
            valid_extensions,
            rescan_all: document.rescan_all,
            quality,
            content,
            reserved_folders,
        })
    }

    /// Path of the processed-folder ledger.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.meta_dir.join(&self.processed_log_file)
    }

    /// Path of the pool journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.meta_dir.join(JOURNAL_FILE)
    }

    /// Returns true when the path carries one of the configured extensions.
    #[must_use]
    pub fn has_valid_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|e| self.valid_extensions.contains(&e))
    }

    /// Returns true when a base-directory entry is one of the pool folders.
    #[must_use]
    pub fn is_reserved_folder(&self, name: &str) -> bool {
        self.reserved_folders.contains(&name.to_lowercase())
    }

    /// Returns true when both dimensions meet the configured minimum.
    #[must_use]
    pub const fn meets_resolution(&self, width: u32, height: u32) -> bool {
        width >= self.min_width && height >= self.min_height
    }
}

fn require_path(key: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Lowercase name of the base-directory entry that holds `path`.
///
/// `pools/Selected` reserves `pools`. Paths outside the base directory
/// reserve nothing.
fn folder_key(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(name) => return Some(name.to_string_lossy().to_lowercase()),
            _ => return None,
        }
    }
    None
}

fn normalize_extensions(raw: &[String]) -> Result<BTreeSet<String>, ConfigError> {
    let mut extensions = BTreeSet::new();
    for ext in raw {
        let normalized = ext.trim().trim_start_matches('.').to_lowercase();
        if normalized.is_empty() {
            return Err(ConfigError::Invalid {
                key: "valid_extensions",
                reason: format!("'{ext}' is not an extension"),
            });
        }
        extensions.insert(normalized);
    }
    if extensions.is_empty() {
        return Err(ConfigError::Invalid {
            key: "valid_extensions",
            reason: "at least one extension is required".to_string(),
        });
    }
    Ok(extensions)
}

fn quality_settings(section: &QualitySection) -> Result<QualitySettings, ConfigError> {
    let defaults = QualitySettings::default();
    let settings = QualitySettings {
        sharpness_threshold: section
            .sharpness_threshold
            .unwrap_or(defaults.sharpness_threshold),
        noise_threshold: section.noise_threshold.unwrap_or(defaults.noise_threshold),
        min_mean_intensity: section
            .min_mean_intensity
            .unwrap_or(defaults.min_mean_intensity),
        max_mean_intensity: section
            .max_mean_intensity
            .unwrap_or(defaults.max_mean_intensity),
    };

    for (key, value) in [
        ("quality.sharpness_threshold", settings.sharpness_threshold),
        ("quality.noise_threshold", settings.noise_threshold),
        ("quality.min_mean_intensity", settings.min_mean_intensity),
        ("quality.max_mean_intensity", settings.max_mean_intensity),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Invalid {
                key,
                reason: format!("must be a non-negative number, got {value}"),
            });
        }
    }

    if settings.min_mean_intensity > settings.max_mean_intensity {
        return Err(ConfigError::Invalid {
            key: "quality.min_mean_intensity",
            reason: format!(
                "{} exceeds quality.max_mean_intensity {}",
                settings.min_mean_intensity, settings.max_mean_intensity
            ),
        });
    }

    Ok(settings)
}

fn content_settings(section: ContentSection) -> Result<ContentSettings, ConfigError> {
    let defaults = ContentSettings::default();
    let confidence_threshold = section
        .confidence_threshold
        .unwrap_or(defaults.confidence_threshold);
    let min_face_confidence = section
        .min_face_confidence
        .unwrap_or(defaults.min_face_confidence);

    for (key, value) in [
        ("content.confidence_threshold", confidence_threshold),
        ("content.min_face_confidence", min_face_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Invalid {
                key,
                reason: format!("must be 0.0-1.0, got {value}"),
            });
        }
    }

    Ok(ContentSettings {
        confidence_threshold,
        min_face_confidence,
        landmark_labels: section
            .landmark_labels
            .iter()
            .map(|label| label.trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect(),
        models_dir: section.models_dir,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINIMAL_JSON: &str = r#"{
        "base_photo_dir": "/photos",
        "selected_photo_dir": "Selected",
        "meta_dir": "meta",
        "processed_log_file": "processed_folders.json",
        "min_width": 1920,
        "min_height": 1080,
        "valid_extensions": [".jpg", ".JPEG", "png"]
    }"#;

    #[test]
    fn test_parse_minimal_json() {
        let settings = Settings::from_json_str(MINIMAL_JSON, "<inline>").expect("valid");

        assert_eq!(settings.base_dir, PathBuf::from("/photos"));
        assert_eq!(settings.selected_dir, PathBuf::from("/photos/Selected"));
        assert_eq!(settings.meta_dir, PathBuf::from("/photos/meta"));
        assert_eq!(settings.needs_edit_dir, PathBuf::from("/photos/needs_edit"));
        assert_eq!(
            settings.ledger_path(),
            PathBuf::from("/photos/meta/processed_folders.json")
        );
        assert_eq!(settings.min_width, 1920);
        assert_eq!(settings.min_height, 1080);
        assert!(!settings.rescan_all);
        assert_eq!(settings.quality, QualitySettings::default());
        assert_eq!(settings.content, ContentSettings::default());
    }

    #[test]
    fn test_extensions_are_case_insensitive() {
        let settings = Settings::from_json_str(MINIMAL_JSON, "<inline>").expect("valid");

        assert!(settings.has_valid_extension(Path::new("a.jpg")));
        assert!(settings.has_valid_extension(Path::new("a.JPG")));
        assert!(settings.has_valid_extension(Path::new("a.jpeg")));
        assert!(settings.has_valid_extension(Path::new("a.Png")));
        assert!(!settings.has_valid_extension(Path::new("photo.GIF")));
        assert!(!settings.has_valid_extension(Path::new("README")));
    }

    #[test]
    fn test_reserved_folders() {
        let settings = Settings::from_json_str(MINIMAL_JSON, "<inline>").expect("valid");

        assert!(settings.is_reserved_folder("Selected"));
        assert!(settings.is_reserved_folder("selected"));
        assert!(settings.is_reserved_folder("META"));
        assert!(settings.is_reserved_folder("Needs_Edit"));
        assert!(!settings.is_reserved_folder("Paris2023"));
    }

    #[test]
    fn test_absolute_selected_dir_overrides_base() {
        let json = MINIMAL_JSON.replace("\"Selected\"", "\"/stock/selected\"");
        let settings = Settings::from_json_str(&json, "<inline>").expect("valid");

        assert_eq!(settings.selected_dir, PathBuf::from("/stock/selected"));
        // Outside the library, so no trip folder is shadowed.
        assert!(!settings.is_reserved_folder("selected"));
        assert!(!settings.is_reserved_folder("stock"));
        assert!(settings.is_reserved_folder("meta"));
    }

    #[test]
    fn test_nested_pool_reserves_top_folder() {
        let json = MINIMAL_JSON
            .replace("\"Selected\"", "\"pools/Selected\"")
            .replace("\"meta\"", "\"./state/meta\"");
        let settings = Settings::from_json_str(&json, "<inline>").expect("valid");

        assert_eq!(settings.selected_dir, PathBuf::from("/photos/pools/Selected"));
        assert!(settings.is_reserved_folder("pools"));
        assert!(settings.is_reserved_folder("State"));
        assert!(!settings.is_reserved_folder("selected"));
        assert!(!settings.is_reserved_folder("meta"));
    }

    #[test]
    fn test_absolute_pool_inside_base_is_reserved() {
        let json = MINIMAL_JSON.replace("\"Selected\"", "\"/photos/Keepers/best\"");
        let settings = Settings::from_json_str(&json, "<inline>").expect("valid");

        assert!(settings.is_reserved_folder("keepers"));
        assert!(!settings.is_reserved_folder("best"));
    }

    #[test]
    fn test_missing_required_key_names_it() {
        let json = MINIMAL_JSON.replace("\"min_height\": 1080,", "");
        let err = Settings::from_json_str(&json, "<inline>").unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("min_height"), "{err}");
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let json = MINIMAL_JSON.replace("1920", "-1");
        let err = Settings::from_json_str(&json, "<inline>").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = Settings::from_json_str("{ not json", "<inline>").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_empty_extension_list_rejected() {
        let json = MINIMAL_JSON.replace(r#"[".jpg", ".JPEG", "png"]"#, "[]");
        let err = Settings::from_json_str(&json, "<inline>").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "valid_extensions",
                ..
            }
        ));
    }

    #[test]
    fn test_rescan_all_parsed() {
        let json = MINIMAL_JSON.replace("\"min_width\"", "\"rescan_all\": true, \"min_width\"");
        let settings = Settings::from_json_str(&json, "<inline>").expect("valid");
        assert!(settings.rescan_all);
    }

    #[test]
    fn test_parse_toml_with_sections() {
        let toml = r#"
base_photo_dir = "/photos"
selected_photo_dir = "Selected"
meta_dir = "meta"
processed_log_file = "processed.json"
min_width = 100
min_height = 50
valid_extensions = ["jpg"]

[quality]
sharpness_threshold = 150.0
max_mean_intensity = 220.0

[content]
confidence_threshold = 0.6
landmark_labels = ["Clock", " tower "]
"#;
        let settings = Settings::from_toml_str(toml, "<inline>").expect("valid");

        assert!((settings.quality.sharpness_threshold - 150.0).abs() < f64::EPSILON);
        assert!((settings.quality.noise_threshold - 20.0).abs() < f64::EPSILON);
        assert!((settings.quality.max_mean_intensity - 220.0).abs() < f64::EPSILON);
        assert!((settings.content.confidence_threshold - 0.6).abs() < f32::EPSILON);
        assert!(settings.content.landmark_labels.contains("clock"));
        assert!(settings.content.landmark_labels.contains("tower"));
    }

    #[test]
    fn test_inverted_exposure_window_rejected() {
        let json = MINIMAL_JSON.replace(
            "\"min_width\"",
            r#""quality": {"min_mean_intensity": 210.0}, "min_width""#,
        );
        let err = Settings::from_json_str(&json, "<inline>").unwrap_err();

        assert!(err.to_string().contains("quality.min_mean_intensity"), "{err}");
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let json = MINIMAL_JSON.replace(
            "\"min_width\"",
            r#""content": {"confidence_threshold": 1.5}, "min_width""#,
        );
        let err = Settings::from_json_str(&json, "<inline>").unwrap_err();

        assert!(err.to_string().contains("content.confidence_threshold"), "{err}");
    }

    #[test]
    fn test_meets_resolution() {
        let settings = Settings::from_json_str(MINIMAL_JSON, "<inline>").expect("valid");

        assert!(settings.meets_resolution(4000, 3000));
        assert!(settings.meets_resolution(1920, 1080));
        assert!(!settings.meets_resolution(1919, 3000));
        assert!(!settings.meets_resolution(4000, 1079));
    }
}
