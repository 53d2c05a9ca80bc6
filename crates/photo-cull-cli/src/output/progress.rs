//! Progress bar adapter using indicatif.

use std::io::IsTerminal;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use photo_cull_core::{ProgressEvent, ProgressSink};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a progress bar on stderr.
    ///
    /// The bar is only drawn when stderr is a terminal; `quiet` also
    /// silences skip warnings.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_bar(quiet, !quiet && std::io::stderr().is_terminal())
    }

    fn with_bar(quiet: bool, show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let bar = IndicatifBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self { bar, quiet }
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::FolderStarted { folder, files } => {
                if let Some(bar) = &self.bar {
                    bar.inc_length(files as u64);
                    bar.set_message(folder);
                }
            }
            ProgressEvent::FolderSkipped { folder } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(format!("{folder} (already processed)"));
                }
            }
            ProgressEvent::FolderFinished {
                folder,
                selected,
                edit,
            } => {
                let line = format!("{folder}: {selected} selected, {edit} need edit");
                match &self.bar {
                    Some(bar) => bar.println(line),
                    None => eprintln!("{line}"),
                }
            }
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Decided { .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
            ProgressEvent::Skipped { path, reason } => {
                let line = format!("WARN: Skipping {path}: {reason}");
                match &self.bar {
                    Some(bar) => {
                        bar.inc(1);
                        bar.println(line);
                    }
                    None => eprintln!("{line}"),
                }
            }
            ProgressEvent::Finished { processed, skipped } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!(
                        "Done: {processed} processed, {skipped} skipped"
                    ));
                }
            }
        }
    }
}
