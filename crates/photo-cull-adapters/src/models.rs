//! Model downloading and lookup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Model metadata.
///
/// No weights are published with the tool. `fetch` downloads from a mirror
/// the user names; otherwise the files are produced locally as `export_hint`
/// describes.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name/identifier.
    pub name: &'static str,
    /// Expected SHA256 hash; `None` skips verification.
    pub sha256: Option<&'static str>,
    /// Filename in models directory.
    pub filename: &'static str,
    /// How to produce the file without a mirror.
    pub export_hint: &'static str,
}

/// Known models.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "blazeface",
        sha256: None,
        filename: "blazeface.safetensors",
        export_hint: "convert the hollance/BlazeFace-PyTorch front-camera weights \
                      (blazeface.pth, BatchNorm folded) to safetensors",
    },
    ModelInfo {
        name: "yolov8s",
        sha256: None,
        filename: "yolov8s.onnx",
        export_hint: "run `yolo export model=yolov8s.pt format=onnx` (Ultralytics)",
    },
];

/// Installation state of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    /// Model name.
    pub name: &'static str,
    /// Expected location.
    pub path: PathBuf,
    /// Whether the file is present.
    pub installed: bool,
}

/// A directory holding model files.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the first configured directory, else the default one.
    #[must_use]
    pub fn resolve(cli_override: Option<&Path>, configured: Option<&Path>) -> Self {
        cli_override
            .or(configured)
            .map_or_else(|| Self::new(default_dir()), Self::new)
    }

    /// Models directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a known model, installed or not.
    #[must_use]
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        MODELS
            .iter()
            .find(|m| m.name == name)
            .map(|m| self.dir.join(m.filename))
    }

    /// Installation state of every known model.
    #[must_use]
    pub fn list(&self) -> Vec<ModelStatus> {
        MODELS
            .iter()
            .map(|m| {
                let path = self.dir.join(m.filename);
                ModelStatus {
                    name: m.name,
                    installed: path.is_file(),
                    path,
                }
            })
            .collect()
    }

    /// Fails with a message naming every missing model file.
    ///
    /// # Errors
    ///
    /// Returns an error if any known model is not installed.
    pub fn require_all(&self) -> Result<()> {
        let missing: Vec<String> = self
            .list()
            .into_iter()
            .filter(|s| !s.installed)
            .map(|s| s.path.display().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "model file(s) not found: {}. Run `photo-cull models fetch` to install them.",
                missing.join(", ")
            )
        }
    }

    /// Downloads every model that is missing, or all of them with `force`,
    /// from `mirror` (a base URL serving the files by name).
    ///
    /// Returns the names of the models that were downloaded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A model is needed but no mirror was given
    /// - The models directory cannot be created
    /// - A model download fails
    /// - A model's checksum doesn't match
    pub fn fetch(&self, force: bool, mirror: Option<&str>) -> Result<Vec<&'static str>> {
        let wanted: Vec<&ModelInfo> = MODELS
            .iter()
            .filter(|m| {
                let installed = self.dir.join(m.filename).is_file();
                if installed && !force {
                    debug!("Model {} already exists", m.name);
                }
                force || !installed
            })
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let Some(mirror) = mirror else {
            let steps: Vec<String> = wanted
                .iter()
                .map(|m| {
                    format!(
                        "  {}: {}, then place it at {}",
                        m.name,
                        m.export_hint,
                        self.dir.join(m.filename).display()
                    )
                })
                .collect();
            anyhow::bail!(
                "no download source for model weights; pass `--from <URL>` naming a mirror, \
                 or install them by hand:\n{}",
                steps.join("\n")
            );
        };

        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create models directory {}", self.dir.display())
        })?;

        let mut fetched = Vec::new();
        for model in wanted {
            let url = model_url(mirror, model);
            download_model(model, &url, &self.dir.join(model.filename))?;
            fetched.push(model.name);
        }
        Ok(fetched)
    }
}

/// Returns the default models directory.
///
/// Uses `XDG_DATA_HOME/photo-cull/models` or `~/.local/share/photo-cull/models`.
#[must_use]
pub fn default_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-cull")
        .join("models")
}

/// Checks `bytes` against a SHA-256 hex digest; `None` always passes.
///
/// # Errors
///
/// Returns an error on mismatch.
pub fn verify_checksum(name: &str, bytes: &[u8], expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        debug!("Skipping checksum verification for {name} (no pinned hash)");
        return Ok(());
    };
    let hash = format!("{:x}", Sha256::digest(bytes));
    if hash.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        anyhow::bail!("Checksum mismatch for {name}: expected {expected}, got {hash}")
    }
}

fn model_url(mirror: &str, model: &ModelInfo) -> String {
    format!("{}/{}", mirror.trim_end_matches('/'), model.filename)
}

fn download_model(model: &ModelInfo, url: &str, path: &Path) -> Result<()> {
    info!("Downloading model {} from {url}", model.name);

    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to download {}", model.name))?;
    if !response.status().is_success() {
        anyhow::bail!(
            "Download of {} failed with status: {}",
            model.name,
            response.status()
        );
    }
    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read response for {}", model.name))?;

    verify_checksum(model.name, &bytes, model.sha256)?;

    let partial = path.with_extension("part");
    fs::write(&partial, &bytes).with_context(|| format!("Failed to write {}", model.name))?;
    fs::rename(&partial, path)
        .with_context(|| format!("Failed to install {}", path.display()))?;

    info!("Downloaded {} ({} bytes)", model.name, bytes.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dir() {
        assert!(default_dir().ends_with("photo-cull/models"));
    }

    #[test]
    fn test_resolve_prefers_cli_override() {
        let store = ModelStore::resolve(Some(Path::new("/cli")), Some(Path::new("/cfg")));
        assert_eq!(store.dir(), Path::new("/cli"));
        let store = ModelStore::resolve(None, Some(Path::new("/cfg")));
        assert_eq!(store.dir(), Path::new("/cfg"));
        let store = ModelStore::resolve(None, None);
        assert_eq!(store.dir(), default_dir());
    }

    #[test]
    fn test_model_path() {
        let store = ModelStore::new("/models");
        assert_eq!(
            store.path("yolov8s"),
            Some(PathBuf::from("/models/yolov8s.onnx"))
        );
        assert!(store.path("unknown").is_none());
    }

    #[test]
    fn test_list_and_require() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(store.list().iter().all(|s| !s.installed));

        let err = store.require_all().unwrap_err().to_string();
        assert!(err.contains("blazeface.safetensors"));
        assert!(err.contains("yolov8s.onnx"));

        fs::write(dir.path().join("blazeface.safetensors"), b"x").unwrap();
        fs::write(dir.path().join("yolov8s.onnx"), b"x").unwrap();
        assert!(store.require_all().is_ok());
    }

    #[test]
    fn test_fetch_skips_installed() {
        let dir = tempfile::tempdir().unwrap();
        for model in MODELS {
            fs::write(dir.path().join(model.filename), b"x").unwrap();
        }
        let fetched = ModelStore::new(dir.path()).fetch(false, None).unwrap();
        assert!(fetched.is_empty());
    }

    #[test]
    fn test_fetch_without_mirror_explains_export() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blazeface.safetensors"), b"x").unwrap();

        let err = ModelStore::new(dir.path())
            .fetch(false, None)
            .unwrap_err()
            .to_string();
        assert!(err.contains("--from"));
        assert!(err.contains("yolo export model=yolov8s.pt format=onnx"));
        assert!(err.contains(&dir.path().join("yolov8s.onnx").display().to_string()));
        assert!(!err.contains("blazeface:"));
    }

    #[test]
    fn test_force_without_mirror_names_every_model() {
        let dir = tempfile::tempdir().unwrap();
        for model in MODELS {
            fs::write(dir.path().join(model.filename), b"x").unwrap();
        }
        let err = ModelStore::new(dir.path())
            .fetch(true, None)
            .unwrap_err()
            .to_string();
        assert!(err.contains("blazeface:") && err.contains("yolov8s:"));
    }

    #[test]
    fn test_model_url_joins_mirror() {
        let yolo = &MODELS[1];
        assert_eq!(
            model_url("https://mirror.invalid/weights/", yolo),
            "https://mirror.invalid/weights/yolov8s.onnx"
        );
        assert_eq!(
            model_url("file-server:8080", yolo),
            "file-server:8080/yolov8s.onnx"
        );
    }

    #[test]
    fn test_verify_checksum() {
        let hello = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert!(verify_checksum("m", b"hello", Some(hello)).is_ok());
        assert!(verify_checksum("m", b"hello", Some(&hello.to_uppercase())).is_ok());
        assert!(verify_checksum("m", b"other", Some(hello)).is_err());
        assert!(verify_checksum("m", b"anything", None).is_ok());
    }
}
