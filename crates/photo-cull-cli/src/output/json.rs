//! JSON report on stdout.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use clap::ValueEnum;
use photo_cull_core::PoolEvent;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines: one event per line, then a summary line
    #[default]
    Jsonl,
    /// Single JSON object with `events` and `summary`
    Json,
}

/// Writes pool events and the run summary.
///
/// In JSON Lines mode events are streamed as they happen. In JSON mode they
/// are collected and written together with the summary.
pub struct JsonOutput {
    format: OutputFormat,
    writer: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<Vec<PoolEvent>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, Box::new(io::stdout()))
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(format: OutputFormat, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            writer: Mutex::new(writer),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Reports one decision. Write failures are logged, not returned.
    pub fn record(&self, event: &PoolEvent) {
        match self.format {
            OutputFormat::Jsonl => {
                if let Err(e) = self.write_line(event) {
                    warn!(error = %e, "failed to write event");
                }
            }
            OutputFormat::Json => self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone()),
        }
    }

    /// Writes the summary (and buffered events) and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn finish<S: Serialize>(&self, summary: &S) -> Result<()> {
        match self.format {
            OutputFormat::Jsonl => self.write_line(&json!({ "summary": summary }))?,
            OutputFormat::Json => {
                let events = std::mem::take(
                    &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
                );
                let report = json!({ "events": events, "summary": summary });
                let text = serde_json::to_string_pretty(&report)?;
                let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
                writeln!(writer, "{text}")?;
            }
        }
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }

    fn write_line<T: Serialize>(&self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")?;
        Ok(())
    }
}
