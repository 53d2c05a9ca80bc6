//! Output formatting for CLI.

mod json;
mod progress;

pub use json::{JsonOutput, OutputFormat};
pub use progress::ProgressBar;

use photo_cull_core::{ProgressEvent, ProgressSink};

/// Sends every event to the progress bar and decisions to the report.
pub struct Reporter<'a> {
    bar: &'a ProgressBar,
    output: &'a JsonOutput,
}

impl<'a> Reporter<'a> {
    #[must_use]
    pub const fn new(bar: &'a ProgressBar, output: &'a JsonOutput) -> Self {
        Self { bar, output }
    }
}

impl ProgressSink for Reporter<'_> {
    fn on_event(&self, event: ProgressEvent) {
        if let ProgressEvent::Decided { event } = &event {
            self.output.record(event);
        }
        self.bar.on_event(event);
    }
}
