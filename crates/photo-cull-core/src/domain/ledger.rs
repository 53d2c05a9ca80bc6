//! Processed-folder ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Trip folders already ingested, keyed by folder name.
///
/// Values are the `YYYY-MM-DD` date of the last run that processed the
/// folder. Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedLedger {
    folders: BTreeMap<String, String>,
}

impl ProcessedLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the folder has been processed before.
    #[must_use]
    pub fn contains(&self, folder: &str) -> bool {
        self.folders.contains_key(folder)
    }

    /// Date the folder was last processed.
    #[must_use]
    pub fn processed_on(&self, folder: &str) -> Option<&str> {
        self.folders.get(folder).map(String::as_str)
    }

    /// Records the folder as processed on `date`, replacing an older entry.
    pub fn mark(&mut self, folder: impl Into<String>, date: impl Into<String>) {
        self.folders.insert(folder.into(), date.into());
    }

    /// Number of recorded folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Returns true when no folder has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Iterates `(folder, date)` pairs in folder-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.folders.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
