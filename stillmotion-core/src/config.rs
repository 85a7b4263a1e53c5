//! Fully resolved render configuration handed to the core by the CLI layer

use crate::report::{ProgressReporter, TracingReporter};
use crate::{CodecChoice, EffectLimits, EffectParameters};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What happens to running jobs once a batch is asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CancelPolicy {
    /// Stop dispatching; jobs already running complete normally
    #[default]
    FinishInFlight,
    /// Stop dispatching and abort running encoders, removing their partial output
    AbortInFlight,
}

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub effect: EffectParameters,
    pub limits: EffectLimits,
    pub codec: CodecChoice,
    /// Directory for generated videos (None = next to each source image)
    pub output_dir: Option<PathBuf>,
    /// Number of concurrent jobs (None = available cores - 1)
    pub worker_count: Option<usize>,
    /// Re-render images whose output already exists
    pub force: bool,
    /// Concatenate the finished videos into one file
    pub stitch: bool,
    /// Combined output path (None = `combined_video.<ext>` in the output directory)
    pub stitch_output: Option<PathBuf>,
    /// Replace a codec that fails probing with the first verified suggestion
    pub auto_fallback: bool,
    pub cancel_policy: CancelPolicy,
    /// Progress sink shared by all workers
    pub reporter: Arc<dyn ProgressReporter>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            effect: EffectParameters::default(),
            limits: EffectLimits::default(),
            codec: CodecChoice::default(),
            output_dir: None,
            worker_count: None,
            force: false,
            stitch: false,
            stitch_output: None,
            auto_fallback: false,
            cancel_policy: CancelPolicy::default(),
            reporter: Arc::new(TracingReporter),
        }
    }
}

impl RenderConfig {
    /// Worker pool size, never below one
    pub fn resolved_worker_count(&self, available_cores: usize) -> usize {
        self.worker_count
            .unwrap_or_else(|| available_cores.saturating_sub(1))
            .max(1)
    }

    /// Output path for a source image: `<dir>/<stem>_video.<ext>`
    pub fn output_path_for(&self, image: &Path) -> PathBuf {
        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let dir = self
            .output_dir
            .clone()
            .or_else(|| image.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        dir.join(format!("{stem}_video.{}", self.codec.extension))
    }

    /// Where the stitched video is written, given the directory of the first entry
    pub fn stitch_output_path(&self, fallback_dir: &Path) -> PathBuf {
        self.stitch_output.clone().unwrap_or_else(|| {
            self.output_dir
                .clone()
                .unwrap_or_else(|| fallback_dir.to_path_buf())
                .join(format!("combined_video.{}", self.codec.extension))
        })
    }
}
