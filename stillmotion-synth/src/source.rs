//! Source image loading

use crate::{Error, Result};
use image::{ImageReader, RgbImage};
use std::path::{Path, PathBuf};

/// File extensions accepted as input images (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "jfif", "webp"];

/// Returns true when `path` has one of the supported image extensions
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// A decoded source image
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub pixels: RgbImage,
}

impl SourceImage {
    /// Decodes an image file, sniffing the format from its content
    pub fn load(path: &Path) -> Result<Self> {
        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let decoded = reader.decode().map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "decoded source image"
        );

        Ok(Self {
            path: path.to_path_buf(),
            pixels: decoded.to_rgb8(),
        })
    }

    /// Wraps pixels that are already in memory
    pub fn from_rgb(path: impl Into<PathBuf>, pixels: RgbImage) -> Self {
        Self {
            path: path.into(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}
