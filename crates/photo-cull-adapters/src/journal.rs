//! JSON Lines pool journal.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use photo_cull_core::{PoolEvent, PoolJournal};

/// Appends one JSON object per pool transition.
pub struct JsonlJournal {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonlJournal {
    /// Journal writing to an arbitrary sink.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Opens `path` for appending, creating it and its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn append_to(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open journal {}", path.display()))?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }
}

impl PoolJournal for JsonlJournal {
    fn record(&self, event: &PoolEvent) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, event)?;
        writeln!(writer)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use photo_cull_core::{Pool, Stage};

    fn event(source: &str) -> PoolEvent {
        PoolEvent {
            timestamp: "2024-06-01T12:00:00Z".into(),
            stage: Stage::Content,
            source: source.into(),
            destination: None,
            pool: Pool::Removed,
            reason: Some("1 face(s)".into()),
        }
    }

    #[test]
    fn test_appends_lines_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta/pool_events.jsonl");

        for source in ["a.jpg", "b.jpg"] {
            let journal = JsonlJournal::append_to(&path).unwrap();
            journal.record(&event(source)).unwrap();
            journal.flush().unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let events: Vec<PoolEvent> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events, [event("a.jpg"), event("b.jpg")]);
    }
}
