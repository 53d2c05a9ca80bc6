//! On-disk store for the processed-folder ledger.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use photo_cull_core::ProcessedLedger;
use tracing::debug;

/// Reads and writes the ledger file as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Creates a store for the ledger at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the ledger; a missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<ProcessedLedger> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no ledger yet, starting empty");
            return Ok(ProcessedLedger::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read ledger {}", self.path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse ledger {}", self.path.display()))
    }

    /// Replaces the ledger file with `ledger`.
    ///
    /// Writes a sibling temporary file first and renames it over the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, ledger: &ProcessedLedger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(ledger).context("Failed to serialize ledger")?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write ledger {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace ledger {}", self.path.display()))?;
        debug!(path = %self.path.display(), folders = ledger.len(), "ledger saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("processed.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("meta/processed.json"));

        let mut ledger = ProcessedLedger::new();
        ledger.mark("Paris2023", "2024-06-01");
        store.save(&ledger).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"Paris2023\": \"2024-06-01\""));
        assert_eq!(store.load().unwrap(), ledger);
        assert!(!dir.path().join("meta/processed.tmp").exists());
    }

    #[test]
    fn test_corrupt_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = LedgerStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse ledger"));
    }
}
