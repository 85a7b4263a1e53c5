//! Stillmotion Encoder Library
//!
//! FFmpeg-backed video output: fourcc resolution, a streaming writer that
//! removes its partial file unless finished, codec probing with fallback
//! suggestions, frame reading and sequential stitching.

pub mod codec_probe;
pub mod fourcc;
pub mod stitcher;
pub mod stream_encoder;
pub mod video_reader;
pub mod video_writer;

use ffmpeg_next as ffmpeg;
use std::path::Path;
use std::sync::OnceLock;
use stillmotion_core::Geometry;

pub use codec_probe::{codec_suggestions, probe, ProbeReport, MIN_PROBE_BYTES};
pub use stitcher::{stitch, StitchManifest};
pub use stream_encoder::{encode, encode_until};
pub use video_reader::VideoReader;
pub use video_writer::VideoWriter;

/// Result type for stillmotion-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stillmotion-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Stillmotion core error: {0}")]
    Core(#[from] stillmotion_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg::Error),

    #[error("Unknown fourcc '{0}'")]
    UnknownFourcc(String),

    #[error("No encoder available for fourcc '{0}'")]
    EncoderNotFound(String),

    #[error("Frame is {found}, writer expects {expected}")]
    FrameSize { expected: Geometry, found: Geometry },

    #[error("Invalid video file")]
    InvalidVideo,

    #[error("No video stream found")]
    NoVideoStream,
}

impl Error {
    /// Maps the error onto the user-facing taxonomy.
    ///
    /// `path` names the file being read or written when the error occurred.
    pub fn into_job_error(self, path: &Path) -> stillmotion_core::Error {
        use stillmotion_core::Error as JobError;

        match self {
            Error::Core(inner) => inner,
            Error::Io(source) if is_resource_exhaustion(&source) => JobError::Resource {
                context: path.display().to_string(),
                source,
            },
            Error::Ffmpeg(ffmpeg::Error::Other { errno })
                if matches!(errno, libc::EACCES | libc::EPERM | libc::ENOSPC) =>
            {
                JobError::Resource {
                    context: path.display().to_string(),
                    source: std::io::Error::from_raw_os_error(errno),
                }
            }
            err @ (Error::InvalidVideo | Error::NoVideoStream) => JobError::Input {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            other => JobError::encode(format!("{}: {other}", path.display())),
        }
    }
}

fn is_resource_exhaustion(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied
        || err.raw_os_error() == Some(libc::ENOSPC)
}

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

/// Initialize FFmpeg once per process and quieten its console logging
pub fn init() -> Result<()> {
    let outcome = FFMPEG_INIT.get_or_init(|| {
        ffmpeg::init()?;
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
        Ok(())
    });
    (*outcome).map_err(Error::from)
}
