//! Encoding jobs and their results

use crate::{CodecChoice, EffectParameters, Error};
use std::path::{Path, PathBuf};

/// Description of one video file to produce
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingJob {
    pub output_path: PathBuf,
    pub codec: CodecChoice,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Exact number of frames the output must contain
    pub expected_frames: u64,
}

impl EncodingJob {
    /// Builds the job for a Ken Burns render of `params`
    pub fn for_effect(output_path: impl Into<PathBuf>, codec: CodecChoice, params: &EffectParameters) -> Self {
        Self {
            output_path: output_path.into(),
            codec,
            width: params.target_width,
            height: params.target_height,
            fps: params.fps,
            expected_frames: params.frame_count(),
        }
    }
}

/// Outcome category of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Skipped,
    Failed,
}

/// Result of one job, attributed to its source
#[derive(Debug)]
pub struct JobResult {
    /// Source image (None for stitching)
    pub source: Option<PathBuf>,
    pub status: JobStatus,
    pub output_path: PathBuf,
    /// Frames written to the output
    pub frames_written: u64,
    /// Why the job was skipped or failed
    pub detail: Option<String>,
    pub error: Option<Error>,
}

impl JobResult {
    pub fn success(output_path: impl Into<PathBuf>, frames_written: u64) -> Self {
        Self {
            source: None,
            status: JobStatus::Success,
            output_path: output_path.into(),
            frames_written,
            detail: None,
            error: None,
        }
    }

    pub fn skipped(output_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source: None,
            status: JobStatus::Skipped,
            output_path: output_path.into(),
            frames_written: 0,
            detail: Some(reason.into()),
            error: None,
        }
    }

    pub fn failed(output_path: impl Into<PathBuf>, error: Error) -> Self {
        Self {
            source: None,
            status: JobStatus::Failed,
            output_path: output_path.into(),
            frames_written: 0,
            detail: Some(error.to_string()),
            error: Some(error),
        }
    }

    /// Attributes the result to a source image
    pub fn with_source(mut self, source: &Path) -> Self {
        self.source = Some(source.to_path_buf());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}
