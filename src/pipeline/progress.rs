use indicatif::{ProgressBar, ProgressStyle};

use super::JobOutcome;

/// Batch-level progress bar handed to the scheduler
#[derive(Clone)]
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// Visible bar over `total` jobs
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    /// Bar that draws nothing, for `--quiet` and tests
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn job_started(&self, reference: &str) {
        self.bar.set_message(format!("processing {}", reference));
    }

    pub fn job_finished(&self, reference: &str, outcome: &JobOutcome) {
        let status = match outcome {
            JobOutcome::Skipped { .. } => "skipped",
            JobOutcome::Completed { .. } => "done",
            JobOutcome::Failed(_) => "failed",
        };
        self.bar.set_message(format!("{} {}", status, reference));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Batch complete");
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}
