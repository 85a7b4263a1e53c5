//! Stillmotion Frame Synthesis Library
//!
//! Turns one still image into a lazy sequence of progressively zoomed and
//! panned frames. The expensive work (scaling and blurring) happens once per
//! image when the headroom canvas is built; each frame is a crop and resize.

pub mod canvas;
pub mod frames;
pub mod source;

use std::path::{Path, PathBuf};

pub use canvas::CompositeCanvas;
pub use frames::{CropWindow, KenBurnsFrames};
pub use source::{is_supported_image, SourceImage, SUPPORTED_EXTENSIONS};

use stillmotion_core::{EffectLimits, EffectParameters};

/// Result type for stillmotion-synth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stillmotion-synth operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Stillmotion core error: {0}")]
    Core(#[from] stillmotion_core::Error),

    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl From<Error> for stillmotion_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::Open { path, source } => stillmotion_core::Error::Input {
                path,
                reason: source.to_string(),
            },
            Error::Decode { path, source } => stillmotion_core::Error::Input {
                path,
                reason: source.to_string(),
            },
        }
    }
}

/// Builds the frame sequence for an already decoded image.
///
/// The source pixels are released as soon as the canvas exists.
pub fn synthesize(
    image: SourceImage,
    params: &EffectParameters,
    limits: &EffectLimits,
) -> Result<KenBurnsFrames> {
    params.validate(limits)?;
    let canvas = CompositeCanvas::build(&image, params);
    drop(image);
    Ok(KenBurnsFrames::new(canvas, params.clone()))
}

/// Validates `params`, then decodes `path` and builds its frame sequence.
///
/// Parameter errors are reported before the file is touched.
pub fn synthesize_path(
    path: &Path,
    params: &EffectParameters,
    limits: &EffectLimits,
) -> Result<KenBurnsFrames> {
    params.validate(limits)?;
    let image = SourceImage::load(path)?;
    synthesize(image, params, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn small_params() -> EffectParameters {
        EffectParameters {
            target_width: 64,
            target_height: 36,
            fps: 10,
            duration_seconds: 1.5,
            zoom_rate_per_frame: 0.01,
            blur_kernel_size: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_sequence_has_exact_length_and_size() {
        let image = SourceImage::from_rgb(
            "gradient.png",
            RgbImage::from_fn(90, 120, |x, y| Rgb([x as u8, y as u8, 128])),
        );
        let params = small_params();
        let frames = synthesize(image, &params, &EffectLimits::default()).unwrap();
        assert_eq!(frames.len(), 15);

        let mut count = 0;
        for frame in frames {
            assert_eq!(frame.dimensions(), (64, 36));
            count += 1;
        }
        assert_eq!(count, 15);
    }

    #[test]
    fn test_invalid_blur_rejected_before_decode() {
        let params = EffectParameters {
            blur_kernel_size: 200,
            ..small_params()
        };
        let err = synthesize_path(Path::new("does/not/exist.jpg"), &params, &EffectLimits::default())
            .unwrap_err();
        assert!(matches!(err, Error::Core(stillmotion_core::Error::Config(_))));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = synthesize_path(
            Path::new("does/not/exist.jpg"),
            &small_params(),
            &EffectLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(
            stillmotion_core::Error::from(err),
            stillmotion_core::Error::Input { .. }
        ));
    }
}
