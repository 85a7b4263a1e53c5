use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use stillmotion_batch::{process_batch, process_batch_with_stop, stitch_outputs, BatchTally};
use stillmotion_core::{
    CancelPolicy, CodecChoice, EffectParameters, Error, JobStatus, ProgressReporter, RenderConfig,
    SilentReporter,
};
use stillmotion_encoder::VideoReader;

fn small_config() -> RenderConfig {
    RenderConfig {
        effect: EffectParameters {
            target_width: 64,
            target_height: 48,
            fps: 10,
            duration_seconds: 1.0,
            zoom_rate_per_frame: 0.01,
            blur_kernel_size: 5,
            ..Default::default()
        },
        worker_count: Some(2),
        reporter: Arc::new(SilentReporter),
        ..Default::default()
    }
}

fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 100]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn test_results_follow_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![
        write_image(dir.path(), "c.png", 120, 80),
        write_image(dir.path(), "a.png", 80, 120),
        write_image(dir.path(), "b.png", 100, 100),
    ];

    let report = process_batch(&images, &small_config());

    assert_eq!(report.tally, BatchTally { succeeded: 3, skipped: 0, failed: 0 });
    for (image, result) in images.iter().zip(&report.results) {
        assert_eq!(result.source.as_deref(), Some(image.as_path()));
        assert_eq!(result.frames_written, 10);
        let mut reader = VideoReader::open(&result.output_path).unwrap();
        assert_eq!((reader.width(), reader.height()), (64, 48));
        assert_eq!(reader.count_frames().unwrap(), 10);
    }
    assert_eq!(report.results[1].output_path, dir.path().join("a_video.mp4"));
}

#[test]
fn test_one_bad_image_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_image(dir.path(), "good.png", 90, 60);
    let corrupt = dir.path().join("corrupt.jpg");
    std::fs::write(&corrupt, b"definitely not a jpeg").unwrap();
    let missing = dir.path().join("missing.png");

    let report = process_batch(&[corrupt, good, missing], &small_config());

    assert_eq!(report.tally, BatchTally { succeeded: 1, skipped: 0, failed: 2 });
    assert!(matches!(report.results[0].error, Some(Error::Input { .. })));
    assert!(report.results[1].is_success());
    assert!(matches!(report.results[2].error, Some(Error::Input { .. })));
    assert!(!dir.path().join("corrupt_video.mp4").exists());
    assert!(report.has_failures());
}

#[test]
fn test_existing_output_is_skipped_without_decoding() {
    let dir = tempfile::tempdir().unwrap();
    // Unreadable image: decoding it would fail, so Skipped proves no decode happened
    let image = dir.path().join("garbage.png");
    std::fs::write(&image, b"garbage").unwrap();
    let existing = dir.path().join("garbage_video.mp4");
    std::fs::write(&existing, b"earlier render").unwrap();

    let report = process_batch(&[image.clone()], &small_config());
    assert_eq!(report.results[0].status, JobStatus::Skipped);
    assert_eq!(std::fs::read(&existing).unwrap(), b"earlier render");

    let forced = RenderConfig { force: true, ..small_config() };
    let report = process_batch(&[image], &forced);
    assert_eq!(report.results[0].status, JobStatus::Failed);
}

#[test]
fn test_existing_output_is_skipped_even_with_unusable_codec() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("garbage.png");
    std::fs::write(&image, b"garbage").unwrap();
    let existing = dir.path().join("garbage_video.mp4");
    std::fs::write(&existing, b"earlier render").unwrap();
    let mut config = RenderConfig {
        codec: CodecChoice::new("FAKE", "mp4"),
        ..small_config()
    };
    config.effect.blur_kernel_size = 200;

    let report = process_batch(&[image], &config);

    assert_eq!(report.tally, BatchTally { succeeded: 0, skipped: 1, failed: 0 });
    assert_eq!(report.results[0].detail.as_deref(), Some("output already exists"));
    assert_eq!(std::fs::read(&existing).unwrap(), b"earlier render");
}

#[test]
fn test_unusable_codec_fails_only_pending_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let done = write_image(dir.path(), "a.png", 80, 60);
    std::fs::write(dir.path().join("a_video.mp4"), b"earlier render").unwrap();
    let todo = write_image(dir.path(), "b.png", 80, 60);
    let config = RenderConfig {
        codec: CodecChoice::new("FAKE", "mp4"),
        ..small_config()
    };

    let report = process_batch(&[done, todo], &config);

    assert_eq!(report.results[0].status, JobStatus::Skipped);
    assert!(matches!(report.results[1].error, Some(Error::Encode { .. })));
    assert!(!dir.path().join("b_video.mp4").exists());
}

#[test]
fn test_invalid_blur_fails_every_job_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 80, 60),
        write_image(dir.path(), "b.png", 80, 60),
    ];
    let mut config = small_config();
    config.effect.blur_kernel_size = 200;

    let report = process_batch(&images, &config);

    assert_eq!(report.tally.failed, 2);
    for result in &report.results {
        match &result.error {
            Some(Error::Config(message)) => assert!(message.contains("199") && message.contains("201")),
            other => panic!("expected a config error, got {other:?}"),
        }
        assert!(!result.output_path.exists());
    }
}

#[test]
fn test_unusable_codec_fails_with_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![write_image(dir.path(), "a.png", 80, 60)];
    let config = RenderConfig {
        codec: CodecChoice::new("FAKE", "mp4"),
        ..small_config()
    };

    let report = process_batch(&images, &config);

    let err = report.results[0].error.as_ref().unwrap();
    assert!(matches!(err, Error::Encode { .. }));
    assert!(err.suggestions().iter().any(|s| s.codec == "mp4v"));
}

#[test]
fn test_auto_fallback_renders_with_verified_codec() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![write_image(dir.path(), "a.png", 80, 60)];
    let config = RenderConfig {
        codec: CodecChoice::new("FAKE", "mp4"),
        auto_fallback: true,
        ..small_config()
    };

    let report = process_batch(&images, &config);

    assert!(report.results[0].is_success(), "{:?}", report.results[0].detail);
    assert_ne!(report.codec.fourcc, "FAKE");
}

#[test]
fn test_raised_stop_flag_skips_undispatched_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 80, 60),
        write_image(dir.path(), "b.png", 80, 60),
    ];
    let stop = AtomicBool::new(true);

    let report = process_batch_with_stop(&images, &small_config(), &stop);

    assert_eq!(report.tally.skipped, 2);
    for result in &report.results {
        assert_eq!(result.detail.as_deref(), Some("cancelled before start"));
        assert!(!result.output_path.exists());
    }
}

/// Raises the stop flag as soon as the first job starts
#[derive(Debug)]
struct StopOnStart(Arc<AtomicBool>);

impl ProgressReporter for StopOnStart {
    fn job_started(&self, _index: usize, _source: &Path) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn stop_on_start_config(stop: &Arc<AtomicBool>, policy: CancelPolicy) -> RenderConfig {
    RenderConfig {
        worker_count: Some(1),
        cancel_policy: policy,
        reporter: Arc::new(StopOnStart(Arc::clone(stop))),
        ..small_config()
    }
}

#[test]
fn test_abort_in_flight_cancels_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 80, 60),
        write_image(dir.path(), "b.png", 80, 60),
    ];
    let stop = Arc::new(AtomicBool::new(false));
    let config = stop_on_start_config(&stop, CancelPolicy::AbortInFlight);

    let report = process_batch_with_stop(&images, &config, &stop);

    assert!(matches!(report.results[0].error, Some(Error::Cancelled)));
    assert!(!dir.path().join("a_video.mp4").exists());
    assert_eq!(report.results[1].status, JobStatus::Skipped);
    assert_eq!(report.results[1].detail.as_deref(), Some("cancelled before start"));
    assert!(!dir.path().join("b_video.mp4").exists());
}

#[test]
fn test_finish_in_flight_completes_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 80, 60),
        write_image(dir.path(), "b.png", 80, 60),
    ];
    let stop = Arc::new(AtomicBool::new(false));
    let config = stop_on_start_config(&stop, CancelPolicy::FinishInFlight);

    let report = process_batch_with_stop(&images, &config, &stop);

    assert!(report.results[0].is_success(), "{:?}", report.results[0].detail);
    assert!(dir.path().join("a_video.mp4").exists());
    assert_eq!(report.results[1].detail.as_deref(), Some("cancelled before start"));
    assert!(!dir.path().join("b_video.mp4").exists());
}

/// Records the thread each callback runs on
#[derive(Debug, Default)]
struct ThreadLog {
    started: Mutex<Vec<ThreadId>>,
    finished: Mutex<Vec<ThreadId>>,
    progress: Mutex<Vec<ThreadId>>,
}

impl ProgressReporter for ThreadLog {
    fn job_started(&self, _index: usize, _source: &Path) {
        self.started.lock().unwrap().push(thread::current().id());
    }

    fn job_finished(&self, _index: usize, _result: &stillmotion_core::JobResult) {
        self.finished.lock().unwrap().push(thread::current().id());
    }

    fn batch_progress(&self, _progress: &stillmotion_core::BatchProgress) {
        self.progress.lock().unwrap().push(thread::current().id());
    }
}

#[test]
fn test_finish_and_progress_events_arrive_on_calling_thread() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 80, 60),
        write_image(dir.path(), "b.png", 80, 60),
        write_image(dir.path(), "c.png", 80, 60),
    ];
    let log = Arc::new(ThreadLog::default());
    let config = RenderConfig {
        reporter: log.clone(),
        ..small_config()
    };

    process_batch(&images, &config);

    let caller = thread::current().id();
    let started = log.started.lock().unwrap();
    assert_eq!(started.len(), 3);
    assert!(started.iter().all(|id| *id != caller));
    assert_eq!(*log.finished.lock().unwrap(), vec![caller; 3]);
    assert_eq!(*log.progress.lock().unwrap(), vec![caller; 3]);
}

#[test]
fn test_stitch_outputs_joins_success_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 80, 60);
    let b = write_image(dir.path(), "b.png", 60, 80);
    let config = small_config();

    // First run renders a; the second run skips a and renders b
    assert!(process_batch(&[a.clone()], &config).results[0].is_success());
    let report = process_batch(&[a, b], &config);
    assert_eq!(report.tally, BatchTally { succeeded: 1, skipped: 1, failed: 0 });

    let stitched = stitch_outputs(&report, &config).unwrap();

    assert!(stitched.is_success(), "{:?}", stitched.detail);
    assert_eq!(stitched.output_path, dir.path().join("combined_video.mp4"));
    assert_eq!(stitched.frames_written, 20);
}

#[test]
fn test_empty_batch() {
    let report = process_batch(&[], &small_config());
    assert!(report.results.is_empty());
    assert_eq!(report.tally.total(), 0);
    assert!(stitch_outputs(&report, &small_config()).is_none());
}
