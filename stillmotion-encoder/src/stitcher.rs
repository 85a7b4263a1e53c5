//! Sequential concatenation of same-sized videos

use crate::{VideoReader, VideoWriter};
use std::path::{Path, PathBuf};
use stillmotion_core::{CodecChoice, Error, Geometry, JobResult};

/// Which videos to join, in which order, and where to write the result
#[derive(Debug, Clone, PartialEq)]
pub struct StitchManifest {
    pub entries: Vec<PathBuf>,
    pub output: PathBuf,
    pub codec: CodecChoice,
    /// Output frame rate; the first entry's rounded rate when unset
    pub fps: Option<u32>,
}

impl StitchManifest {
    /// Manifest that keeps `entries` in the given order
    pub fn new(entries: Vec<PathBuf>, output: impl Into<PathBuf>, codec: CodecChoice) -> Self {
        Self {
            entries,
            output: output.into(),
            codec,
            fps: None,
        }
    }

    /// Manifest with `entries` sorted lexicographically by path
    pub fn sorted(mut entries: Vec<PathBuf>, output: impl Into<PathBuf>, codec: CodecChoice) -> Self {
        entries.sort();
        Self::new(entries, output, codec)
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }
}

/// Joins every entry into `manifest.output`.
///
/// All inputs are checked for matching geometry before the output is
/// created; any later failure removes the partial output.
pub fn stitch(manifest: &StitchManifest) -> JobResult {
    match run_stitch(manifest) {
        Ok(frames) => {
            tracing::info!(
                output = %manifest.output.display(),
                inputs = manifest.entries.len(),
                frames,
                "stitched videos"
            );
            JobResult::success(&manifest.output, frames)
        }
        Err(err) => {
            tracing::error!(output = %manifest.output.display(), error = %err, "stitch failed");
            JobResult::failed(&manifest.output, err)
        }
    }
}

fn run_stitch(manifest: &StitchManifest) -> stillmotion_core::Result<u64> {
    if manifest.entries.is_empty() {
        return Err(Error::Config("nothing to stitch: no input videos".into()));
    }
    if manifest.output.as_os_str().is_empty() {
        return Err(Error::Config("stitch output path is empty".into()));
    }
    if manifest.entries.iter().any(|entry| same_file(entry, &manifest.output)) {
        return Err(Error::Config(format!(
            "stitch output {} is also one of its inputs",
            manifest.output.display()
        )));
    }

    let (reference, first_fps) = check_geometry(&manifest.entries)?;
    let fps = manifest.fps.unwrap_or(first_fps).max(1);

    let mut writer = VideoWriter::create(
        &manifest.output,
        &manifest.codec,
        reference.width,
        reference.height,
        fps,
    )
    .map_err(|err| err.into_job_error(&manifest.output))?;

    for entry in &manifest.entries {
        let mut reader = open_entry(entry)?;
        let frames = reader
            .for_each_frame(|frame| writer.write_frame(&frame))
            .map_err(|err| err.into_job_error(entry))?;
        tracing::debug!(input = %entry.display(), frames, "appended video");
        // Reader closes here, before the next entry opens
    }

    writer
        .finish()
        .map_err(|err| err.into_job_error(&manifest.output))
}

/// Reference geometry and rounded frame rate of the first entry, after
/// confirming every entry shares that geometry
fn check_geometry(entries: &[PathBuf]) -> stillmotion_core::Result<(Geometry, u32)> {
    let mut reference: Option<(Geometry, u32)> = None;
    for entry in entries {
        let reader = open_entry(entry)?;
        let found = Geometry::new(reader.width(), reader.height());
        match reference {
            None => reference = Some((found, reader.rounded_fps())),
            Some((expected, _)) if expected != found => {
                return Err(Error::DimensionMismatch {
                    path: entry.clone(),
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }
    }
    reference.ok_or_else(|| Error::Config("nothing to stitch: no input videos".into()))
}

fn open_entry(path: &Path) -> stillmotion_core::Result<VideoReader> {
    if !path.is_file() {
        return Err(Error::Input {
            path: path.to_path_buf(),
            reason: "video file does not exist".into(),
        });
    }
    VideoReader::open(path).map_err(|err| match err.into_job_error(path) {
        Error::Encode { message, .. } => Error::Input {
            path: path.to_path_buf(),
            reason: message,
        },
        other => other,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
