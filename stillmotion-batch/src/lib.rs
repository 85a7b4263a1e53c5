//! Stillmotion Batch Library
//!
//! Renders many images in parallel. Every job decodes its own image and
//! owns its own encoder; results come back in submission order with a
//! success/skip/failure tally, and one failed image never stops the rest.

pub mod codec_gate;
pub mod orchestrator;
pub mod progress_tracker;

pub use codec_gate::CodecGate;
pub use orchestrator::{
    process_batch, process_batch_with_stop, stitch_outputs, BatchReport, BatchTally,
};
pub use progress_tracker::{format_duration, ProgressTracker};

/// Result type for stillmotion-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stillmotion-batch operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Stillmotion core error: {0}")]
    Core(#[from] stillmotion_core::Error),

    #[error("Synthesis error: {0}")]
    Synth(#[from] stillmotion_synth::Error),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<Error> for stillmotion_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::Synth(inner) => inner.into(),
            Error::WorkerPanicked(message) => {
                stillmotion_core::Error::encode(format!("worker panicked: {message}"))
            }
        }
    }
}
