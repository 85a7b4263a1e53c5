//! Stillmotion Core Library
//!
//! This library provides the data model shared by every stillmotion crate:
//! the Ken Burns effect parameters, the resolved render configuration, job
//! results and the user-facing error taxonomy.

pub mod codec;
pub mod config;
pub mod job;
pub mod params;
pub mod report;

use std::fmt;
use std::path::PathBuf;

pub use codec::{CodecChoice, CodecSuggestion};
pub use config::{CancelPolicy, RenderConfig};
pub use job::{EncodingJob, JobResult, JobStatus};
pub use params::{EffectLimits, EffectParameters, PanDirection, ZoomDirection};
pub use report::{BatchProgress, ProgressReporter, SilentReporter, TracingReporter};

/// Result type for stillmotion-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Error taxonomy reported on failed jobs
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot read image {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Encode error: {message}{}", suggestion_hint(.suggestions))]
    Encode {
        message: String,
        suggestions: Vec<CodecSuggestion>,
    },

    #[error("Dimension mismatch: {} is {found}, expected {expected}", path.display())]
    DimensionMismatch {
        path: PathBuf,
        expected: Geometry,
        found: Geometry,
    },

    #[error("Resource error: {context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Job cancelled")]
    Cancelled,
}

/// `Resource` keeps the I/O error's kind and message; its OS source is not carried over.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Input { path, reason } => Error::Input {
                path: path.clone(),
                reason: reason.clone(),
            },
            Error::Config(message) => Error::Config(message.clone()),
            Error::Encode {
                message,
                suggestions,
            } => Error::Encode {
                message: message.clone(),
                suggestions: suggestions.clone(),
            },
            Error::DimensionMismatch {
                path,
                expected,
                found,
            } => Error::DimensionMismatch {
                path: path.clone(),
                expected: *expected,
                found: *found,
            },
            Error::Resource { context, source } => Error::Resource {
                context: context.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Error::Cancelled => Error::Cancelled,
        }
    }
}

impl Error {
    /// Shorthand for an encode error without codec suggestions
    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Codec suggestions attached to an encode error, if any
    pub fn suggestions(&self) -> &[CodecSuggestion] {
        match self {
            Error::Encode { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

fn suggestion_hint(suggestions: &[CodecSuggestion]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = suggestions
        .iter()
        .map(|s| format!("{} ({})", s.codec, s.description))
        .collect();
    format!("; try one of: {}", listed.join(", "))
}
