//! Injected progress reporting

use crate::{JobResult, JobStatus};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Snapshot of batch progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub completed: u64,
    pub total: u64,
    pub elapsed: Duration,
    /// Estimated time remaining, when at least one job finished
    pub eta: Option<Duration>,
}

impl BatchProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Receives job and batch events.
///
/// `job_started` is called on the worker thread running the job, so calls
/// can overlap. `job_finished` and `batch_progress` are called on the
/// thread that collects results, in completion order.
pub trait ProgressReporter: Send + Sync + fmt::Debug {
    fn job_started(&self, _index: usize, _source: &Path) {}

    fn job_finished(&self, _index: usize, _result: &JobResult) {}

    fn batch_progress(&self, _progress: &BatchProgress) {}
}

/// Emits every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn job_started(&self, index: usize, source: &Path) {
        tracing::debug!(job = index, source = %source.display(), "job started");
    }

    fn job_finished(&self, index: usize, result: &JobResult) {
        let output = result.output_path.display();
        match result.status {
            JobStatus::Success => {
                tracing::info!(job = index, %output, frames = result.frames_written, "video written")
            }
            JobStatus::Skipped => tracing::info!(
                job = index,
                %output,
                reason = result.detail.as_deref().unwrap_or(""),
                "skipped"
            ),
            JobStatus::Failed => tracing::warn!(
                job = index,
                %output,
                error = result.detail.as_deref().unwrap_or(""),
                "job failed"
            ),
        }
    }

    fn batch_progress(&self, progress: &BatchProgress) {
        tracing::info!(
            completed = progress.completed,
            total = progress.total,
            percent = format_args!("{:.1}", progress.percent()),
            elapsed = ?progress.elapsed,
            eta = ?progress.eta,
            "batch progress"
        );
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
