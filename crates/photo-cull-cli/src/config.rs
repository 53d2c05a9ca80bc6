//! Configuration discovery and loading for photo-cull.
//!
//! The settings document is looked up in this order:
//! - `--config PATH` (an explicit path must exist)
//! - Project-local: `config/info.json` (searched up the directory tree)
//! - User config: `~/.config/photo-cull/config.toml`
//!
//! `.toml` files are parsed as TOML, anything else as JSON.

use std::fmt;
use std::path::{Path, PathBuf};

use photo_cull_core::{ConfigError, Settings};
use tracing::{debug, info};

/// Project-local settings document, relative to a search directory.
pub const PROJECT_CONFIG: &str = "config/info.json";

/// How a settings document was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Passed with `--config`.
    Flag,
    /// Found by searching up from the working directory.
    Project,
    /// The per-user config file.
    User,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flag => "--config",
            Self::Project => "project",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

/// A located settings document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Document path.
    pub path: PathBuf,
    /// How it was found.
    pub origin: Origin,
}

/// Finds the settings document for this run.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] listing every location tried.
pub fn locate(explicit: Option<&Path>) -> Result<Located, ConfigError> {
    let cwd = std::env::current_dir().ok();
    locate_from(explicit, cwd.as_deref(), user_config_path())
}

/// Finds and loads the settings document.
///
/// # Errors
///
/// Returns a [`ConfigError`] if no document is found or it is invalid.
pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let located = locate(explicit)?;
    info!(path = %located.path.display(), origin = %located.origin, "Loading config");
    load_file(&located.path)
}

/// Parses and validates one settings document.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file cannot be read, otherwise the
/// parse or validation error.
pub fn load_file(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let origin = path.display().to_string();
    if is_toml(path) {
        Settings::from_toml_str(&text, &origin)
    } else {
        Settings::from_json_str(&text, &origin)
    }
}

/// Get the per-user config file path.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("photo-cull").join("config.toml"))
}

fn locate_from(
    explicit: Option<&Path>,
    cwd: Option<&Path>,
    user: Option<PathBuf>,
) -> Result<Located, ConfigError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Located {
                path: path.to_path_buf(),
                origin: Origin::Flag,
            });
        }
        return Err(ConfigError::NotFound {
            searched: path.display().to_string(),
        });
    }

    let mut searched = Vec::new();

    if let Some(cwd) = cwd {
        if let Some(path) = find_config_in_parents(cwd) {
            return Ok(Located {
                path,
                origin: Origin::Project,
            });
        }
        searched.push(format!("{} and its parents", cwd.join(PROJECT_CONFIG).display()));
    }

    if let Some(path) = user {
        if path.is_file() {
            return Ok(Located {
                path,
                origin: Origin::User,
            });
        }
        debug!("User config not found: {}", path.display());
        searched.push(path.display().to_string());
    }

    Err(ConfigError::NotFound {
        searched: searched.join(", "),
    })
}

/// Search for `config/info.json` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG);
        if config_path.is_file() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
