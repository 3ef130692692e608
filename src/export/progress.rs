//! Progress tracking for export jobs
//!
//! Reports coarse stages per job (validated, projected, encoded) on a
//! shared progress bar so users get feedback while several exports run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Stages an export goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Validated,
    Projected,
    Encoded,
}

impl ExportStage {
    /// Number of stages reported per job
    pub const COUNT: u64 = 3;

    pub fn label(&self) -> &'static str {
        match self {
            ExportStage::Validated => "validated",
            ExportStage::Projected => "projected",
            ExportStage::Encoded => "encoded",
        }
    }
}

/// Progress tracker for export jobs
///
/// Advances one step per stage of every job. The bar can be disabled, in
/// which case only the step counter is kept.
pub struct ProgressTracker {
    /// Stages completed so far, across all jobs
    completed: AtomicU64,
    /// Start time of the run
    start_time: Instant,
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `jobs` - Number of export jobs in this run
    /// * `enable_bar` - Whether to display a progress bar
    ///
    /// # Returns
    /// * `Self` - New progress tracker instance
    pub fn new(jobs: u64, enable_bar: bool) -> Self {
        let bar = if enable_bar {
            let bar = ProgressBar::new(jobs * ExportStage::COUNT);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            None
        };

        Self {
            completed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Record that a job reached a stage
    ///
    /// # Arguments
    /// * `job` - Job name shown next to the bar
    /// * `stage` - Stage the job just completed
    pub fn advance(&self, job: &str, stage: ExportStage) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(ref bar) = self.bar {
            bar.inc(1);
            bar.set_message(format!("{job}: {}", stage.label()));
        }
    }

    /// Stages completed so far
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Time since the tracker was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
