//! Filesystem adapter for the library and its pools.
//!
//! Pools are plain directories; copying, moving or deleting a file is the
//! pool transition.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filetime::FileTime;
use photo_cull_core::Settings;
use tracing::{debug, warn};

/// Outcome of copying a file into a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The file now exists at this destination.
    Copied(PathBuf),
    /// Source and destination are the same file; nothing was written.
    SameFile,
}

/// Creates the Selected, metadata and needs-edit directories.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn ensure_pool_dirs(settings: &Settings) -> Result<()> {
    for dir in [
        &settings.selected_dir,
        &settings.meta_dir,
        &settings.needs_edit_dir,
    ] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Trip-folder candidates: immediate subdirectories of the base directory
/// that are not pool folders, in name order.
///
/// # Errors
///
/// Returns an error if the base directory cannot be listed.
pub fn trip_folders(settings: &Settings) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(&settings.base_dir).with_context(|| {
        format!(
            "Failed to read base directory {}",
            settings.base_dir.display()
        )
    })?;

    let mut folders: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if settings.is_reserved_folder(&name) {
                debug!(folder = %name, "skipping pool folder");
                None
            } else {
                Some((name, e.path()))
            }
        })
        .collect();
    folders.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(folders)
}

/// Files in a trip folder carrying a valid extension, in name order.
///
/// # Errors
///
/// Returns an error if the folder cannot be listed.
pub fn trip_files(dir: &Path, settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read folder {}", dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && settings.has_valid_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Images in a pool directory: regular, non-hidden files with a valid
/// extension, in name order. Subdirectories are ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn pool_images(dir: &Path, settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read pool {}", dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_hidden(p) && settings.has_valid_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Returns true for dot-files.
#[must_use]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Width and height from the image header, without decoding pixels.
///
/// The format is guessed from the file contents.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its header is invalid.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    photo_cull_core::image_dimensions(path)
        .with_context(|| format!("Failed to read image header: {}", path.display()))
}

fn destination(src: &Path, dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("No file name in {}", src.display()))?;
    Ok(dir.join(name))
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copies `src` into `dir`, keeping its file name and modification time and
/// replacing any file of the same name.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn copy_into(src: &Path, dir: &Path) -> Result<CopyOutcome> {
    let dest = destination(src, dir)?;
    if src.parent().is_some_and(|parent| same_directory(parent, dir)) {
        warn!(path = %src.display(), "source and destination are the same file, skipping");
        return Ok(CopyOutcome::SameFile);
    }

    fs::copy(src, &dest).with_context(|| {
        format!("Failed to copy {} to {}", src.display(), dest.display())
    })?;
    copy_times(src, &dest)?;
    Ok(CopyOutcome::Copied(dest))
}

fn copy_times(src: &Path, dest: &Path) -> Result<()> {
    let meta = fs::metadata(src).with_context(|| format!("Failed to stat {}", src.display()))?;
    filetime::set_file_times(
        dest,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .with_context(|| format!("Failed to set times on {}", dest.display()))
}

/// Moves `src` into `dir`, keeping its file name.
///
/// Falls back to copy and delete when a rename is not possible, for example
/// across filesystems.
///
/// # Errors
///
/// Returns an error if the file could not be moved.
pub fn move_into(src: &Path, dir: &Path) -> Result<PathBuf> {
    let dest = destination(src, dir)?;
    match fs::rename(src, &dest) {
        Ok(()) => Ok(dest),
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            debug!(error = %e, "rename failed, copying instead");
            fs::copy(src, &dest).with_context(|| {
                format!("Failed to move {} to {}", src.display(), dest.display())
            })?;
            copy_times(src, &dest)?;
            fs::remove_file(src)
                .with_context(|| format!("Failed to remove {} after copy", src.display()))?;
            Ok(dest)
        }
        Err(e) => Err(e)
            .with_context(|| format!("Failed to move {} to {}", src.display(), dest.display())),
    }
}

/// Deletes a file from its pool.
///
/// # Errors
///
/// Returns an error if the file cannot be removed.
pub fn remove_image(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))
}
