//! Frame sequence → video file, one frame in memory at a time

use crate::{Error, VideoWriter};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use stillmotion_core::{EncodingJob, JobResult};

/// Encodes `frames` into `job.output_path`.
///
/// Exactly `job.expected_frames` frames must arrive; anything else
/// discards the output and fails the job.
pub fn encode<I>(frames: I, job: &EncodingJob) -> JobResult
where
    I: IntoIterator<Item = RgbImage>,
{
    let never = AtomicBool::new(false);
    encode_until(frames, job, &never)
}

/// Like [`encode`], but stops with a `Cancelled` failure once `stop` is raised
pub fn encode_until<I>(frames: I, job: &EncodingJob, stop: &AtomicBool) -> JobResult
where
    I: IntoIterator<Item = RgbImage>,
{
    match write_all(frames, job, stop) {
        Ok(frames_written) => {
            tracing::debug!(
                output = %job.output_path.display(),
                frames_written,
                "encoded video"
            );
            JobResult::success(&job.output_path, frames_written)
        }
        Err(Outcome::Cancelled) => {
            tracing::info!(output = %job.output_path.display(), "encode cancelled");
            JobResult::failed(&job.output_path, stillmotion_core::Error::Cancelled)
        }
        Err(Outcome::Failed(err)) => {
            let err = err.into_job_error(&job.output_path);
            tracing::warn!(output = %job.output_path.display(), error = %err, "encode failed");
            JobResult::failed(&job.output_path, err)
        }
    }
}

enum Outcome {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Outcome {
    fn from(err: Error) -> Self {
        Outcome::Failed(err)
    }
}

fn write_all<I>(frames: I, job: &EncodingJob, stop: &AtomicBool) -> std::result::Result<u64, Outcome>
where
    I: IntoIterator<Item = RgbImage>,
{
    // Dropping the writer on any early return removes the partial file
    let mut writer = VideoWriter::create(&job.output_path, &job.codec, job.width, job.height, job.fps)?;

    for frame in frames {
        if stop.load(Ordering::Relaxed) {
            return Err(Outcome::Cancelled);
        }
        if writer.frames_written() >= job.expected_frames {
            return Err(frame_count_error(job, writer.frames_written() + 1).into());
        }
        writer.write_frame(&frame)?;
    }

    if writer.frames_written() != job.expected_frames {
        return Err(frame_count_error(job, writer.frames_written()).into());
    }
    Ok(writer.finish()?)
}

fn frame_count_error(job: &EncodingJob, received: u64) -> Error {
    let message = if received > job.expected_frames {
        format!("frame sequence produced more than {} frames", job.expected_frames)
    } else {
        format!(
            "frame sequence ended after {received} frames, expected {}",
            job.expected_frames
        )
    };
    Error::Core(stillmotion_core::Error::encode(message))
}
