//! Parallel batch rendering
//!
//! Admission runs on the calling thread. Images whose output already
//! exists are skipped first; parameter validation and the codec gate run
//! only if something is left to render. Admitted jobs go to a fixed pool
//! of worker threads over a channel; each worker renders one image end to end and
//! sends back `(index, JobResult)`, so results are reassembled in
//! submission order whatever order they finish in.

use crate::{CodecGate, Error, ProgressTracker, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use stillmotion_core::{
    CancelPolicy, CodecChoice, EncodingJob, JobResult, JobStatus, RenderConfig,
};
use stillmotion_encoder::{stitch, StitchManifest};

/// Counts of job outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchTally {
    pub fn from_results(results: &[JobResult]) -> Self {
        results.iter().fold(Self::default(), |mut tally, result| {
            match result.status {
                JobStatus::Success => tally.succeeded += 1,
                JobStatus::Skipped => tally.skipped += 1,
                JobStatus::Failed => tally.failed += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Outcome of a batch: `results[i]` belongs to the i-th submitted image
#[derive(Debug)]
pub struct BatchReport {
    pub results: Vec<JobResult>,
    pub tally: BatchTally,
    /// Codec the outputs were written with, after any fallback
    pub codec: CodecChoice,
}

impl BatchReport {
    fn new(results: Vec<JobResult>, codec: CodecChoice) -> Self {
        let tally = BatchTally::from_results(&results);
        Self {
            results,
            tally,
            codec,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.tally.failed > 0
    }
}

/// Renders every image in `images` to its own video
pub fn process_batch(images: &[PathBuf], config: &RenderConfig) -> BatchReport {
    let never = AtomicBool::new(false);
    process_batch_with_stop(images, config, &never)
}

/// Like [`process_batch`], honoring an external stop flag.
///
/// Once `stop` is raised no further job starts; those jobs are reported as
/// skipped. Jobs already running finish, unless the configured
/// [`CancelPolicy`] is `AbortInFlight`, in which case they fail as
/// cancelled and their partial output is removed.
pub fn process_batch_with_stop(images: &[PathBuf], config: &RenderConfig, stop: &AtomicBool) -> BatchReport {
    let reporter = config.reporter.as_ref();
    let tracker = ProgressTracker::new(images.len() as u64);
    let mut slots: Vec<Option<JobResult>> = std::iter::repeat_with(|| None).take(images.len()).collect();

    tracing::info!(images = images.len(), codec = %config.codec, "starting batch");
    if images.is_empty() {
        return BatchReport::new(Vec::new(), config.codec.clone());
    }

    let settle = |index: usize, result: JobResult, slots: &mut Vec<Option<JobResult>>| {
        reporter.job_finished(index, &result);
        reporter.batch_progress(&tracker.record());
        slots[index] = Some(result);
    };

    // Skip filter first: an existing output is Skipped whatever else is wrong
    let jobs: Vec<Job> = images
        .iter()
        .enumerate()
        .map(|(index, image)| Job {
            index,
            image: image.clone(),
            output: PathBuf::new(),
        })
        .collect();
    let (pending, existing) = partition_existing(jobs, config);
    for job in existing {
        settle(job.index, skipped_existing(&job), &mut slots);
    }
    if pending.is_empty() {
        return BatchReport::new(collect(slots), config.codec.clone());
    }

    // Invalid parameters or an unusable codec fail the remaining jobs before any decode
    let admitted = config
        .effect
        .validate(&config.limits)
        .and_then(|()| CodecGate::new().admit(&config.codec, config.auto_fallback));
    let codec = match admitted {
        Ok(codec) => codec,
        Err(err) => {
            for job in pending {
                let result = JobResult::failed(&job.output, err.clone()).with_source(&job.image);
                settle(job.index, result, &mut slots);
            }
            return BatchReport::new(collect(slots), config.codec.clone());
        }
    };

    let effective = RenderConfig {
        codec: codec.clone(),
        ..config.clone()
    };

    // A fallback codec may write to a different extension
    let pending = if codec.extension == config.codec.extension {
        pending
    } else {
        let (pending, existing) = partition_existing(pending, &effective);
        for job in existing {
            settle(job.index, skipped_existing(&job), &mut slots);
        }
        pending
    };

    let workers = effective
        .resolved_worker_count(num_cpus::get())
        .min(pending.len().max(1));
    tracing::debug!(jobs = pending.len(), workers, "dispatching jobs");

    if !pending.is_empty() {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<(usize, JobResult)>();
        for job in pending {
            // Receiver is alive until the scope below ends
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let config = &effective;
                scope.spawn(move || run_worker(worker, job_rx, result_tx, config, stop));
            }
            drop(result_tx);

            for (index, result) in result_rx.iter() {
                settle(index, result, &mut slots);
            }
        });
    }

    let report = BatchReport::new(collect(slots), codec);
    tracing::info!(
        succeeded = report.tally.succeeded,
        skipped = report.tally.skipped,
        failed = report.tally.failed,
        "batch finished"
    );
    report
}

/// Stitches the batch's existing outputs, in lexicographic order.
///
/// Successful and skipped outputs are both on disk and both included.
/// Returns `None` when there is nothing to stitch.
pub fn stitch_outputs(report: &BatchReport, config: &RenderConfig) -> Option<JobResult> {
    let entries: Vec<PathBuf> = report
        .results
        .iter()
        .filter(|result| matches!(result.status, JobStatus::Success | JobStatus::Skipped))
        .map(|result| result.output_path.clone())
        .filter(|path| path.is_file())
        .collect();

    let first = entries.iter().min()?;
    let fallback_dir = first.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let output = config.stitch_output_path(&fallback_dir);
    let entries: Vec<PathBuf> = entries.into_iter().filter(|path| *path != output).collect();
    if entries.is_empty() {
        return None;
    }

    let manifest = StitchManifest::sorted(entries, output, report.codec.clone());
    tracing::info!(
        inputs = manifest.entries.len(),
        output = %manifest.output.display(),
        "stitching batch outputs"
    );
    Some(stitch(&manifest))
}

#[derive(Debug)]
struct Job {
    index: usize,
    image: PathBuf,
    output: PathBuf,
}

/// Assigns each job its output path, then splits off those whose output
/// already exists (unless `force` is set)
fn partition_existing(jobs: Vec<Job>, config: &RenderConfig) -> (Vec<Job>, Vec<Job>) {
    jobs.into_iter()
        .map(|mut job| {
            job.output = config.output_path_for(&job.image);
            job
        })
        .partition(|job| config.force || !job.output.exists())
}

fn skipped_existing(job: &Job) -> JobResult {
    JobResult::skipped(&job.output, "output already exists").with_source(&job.image)
}

fn run_worker(
    worker: usize,
    jobs: Receiver<Job>,
    results: Sender<(usize, JobResult)>,
    config: &RenderConfig,
    stop: &AtomicBool,
) {
    let never = AtomicBool::new(false);
    let abort_flag = match config.cancel_policy {
        CancelPolicy::AbortInFlight => stop,
        CancelPolicy::FinishInFlight => &never,
    };

    for job in jobs.iter() {
        let result = if stop.load(Ordering::Relaxed) {
            JobResult::skipped(&job.output, "cancelled before start")
        } else {
            let span = tracing::info_span!("job", worker, image = %job.image.display());
            let _enter = span.enter();
            config.reporter.job_started(job.index, &job.image);
            isolate(&job, || render_job(&job, config, abort_flag))
        };

        if results.send((job.index, result.with_source(&job.image))).is_err() {
            break;
        }
    }
}

/// Runs one job, converting a panic into a failed result for that job only
fn isolate(job: &Job, render: impl FnOnce() -> Result<JobResult>) -> JobResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(render)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(Error::WorkerPanicked(message))
    });
    outcome.unwrap_or_else(|err| JobResult::failed(&job.output, err.into()))
}

fn render_job(job: &Job, config: &RenderConfig, abort: &AtomicBool) -> Result<JobResult> {
    let frames = stillmotion_synth::synthesize_path(&job.image, &config.effect, &config.limits)?;
    let encoding = EncodingJob::for_effect(&job.output, config.codec.clone(), &config.effect);
    Ok(stillmotion_encoder::encode_until(frames, &encoding, abort))
}

fn collect(slots: Vec<Option<JobResult>>) -> Vec<JobResult> {
    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                JobResult::failed(
                    PathBuf::new(),
                    stillmotion_core::Error::encode("job produced no result"),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_each_status() {
        let results = vec![
            JobResult::success("a_video.mp4", 10),
            JobResult::skipped("b_video.mp4", "output already exists"),
            JobResult::failed("c_video.mp4", stillmotion_core::Error::Cancelled),
            JobResult::success("d_video.mp4", 10),
        ];
        let tally = BatchTally::from_results(&results);
        assert_eq!(
            tally,
            BatchTally {
                succeeded: 2,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_panicking_job_becomes_failure() {
        let job = Job {
            index: 0,
            image: PathBuf::from("a.jpg"),
            output: PathBuf::from("a_video.mp4"),
        };
        let result = isolate(&job, || panic!("decoder exploded"));
        assert!(result.is_failed());
        assert!(result.detail.unwrap().contains("decoder exploded"));
    }

    #[test]
    fn test_missing_slot_is_reported_as_failure() {
        let results = collect(vec![Some(JobResult::success("a_video.mp4", 1)), None]);
        assert!(results[0].is_success());
        assert!(results[1].is_failed());
    }
}
