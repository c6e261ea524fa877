use crate::errors::{SdltError, SdltResult};
use crate::scoring::{BatchEntry, BatchOutcome};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for batch scoring.
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    pub fn new(total: u64, quiet: bool) -> SdltResult<Self> {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total)
        };

        let bar_style = ProgressStyle::with_template(
            "{prefix} {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
        )
        .map_err(|e| SdltError::Ui(e.to_string()))?
        .progress_chars("█▉▊▋▌▍▎▏  ");

        bar.set_style(bar_style);
        bar.set_prefix(style("SCORING").green().bold().to_string());

        Ok(Self { bar })
    }

    /// Record one finished submission. Safe to call from worker threads.
    pub fn record(&self, entry: &BatchEntry) {
        if let BatchOutcome::Failed { .. } = entry.outcome {
            self.bar.println(format!(
                "{} {}",
                style("FAILED").red().bold(),
                style(&entry.submission).yellow()
            ));
        }
        self.bar.set_message(entry.submission.clone());
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}
