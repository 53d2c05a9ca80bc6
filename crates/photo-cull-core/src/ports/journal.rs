//! Pool journal port for recording pool transitions.

use crate::domain::PoolEvent;

/// Port for appending pool transition records.
pub trait PoolJournal: Send + Sync {
    /// Records a single event.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn record(&self, event: &PoolEvent) -> anyhow::Result<()>;

    /// Flushes any buffered records.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}
