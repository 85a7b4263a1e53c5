//! Codec viability probing
//!
//! An encoder that opens fine can still produce an empty or truncated
//! file for some codec/container pairs. The probe writes one real frame
//! into a throwaway file and judges the codec by the bytes that land.

use crate::{Result, VideoWriter};
use image::{Rgb, RgbImage};
use std::path::Path;
use stillmotion_core::{CodecChoice, CodecSuggestion};

/// A probe file at or below this size is treated as a failed encode
pub const MIN_PROBE_BYTES: u64 = 100;

const PROBE_WIDTH: u32 = 160;
const PROBE_HEIGHT: u32 = 120;
const PROBE_FPS: u32 = 25;

/// Outcome of probing one codec/container pair
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub codec: CodecChoice,
    pub ok: bool,
    /// Size of the probe file, 0 when nothing was written
    pub output_bytes: u64,
    /// Why the probe failed, when it did
    pub failure: Option<String>,
    /// Alternatives for the container, verified ones first; empty when `ok`
    pub suggestions: Vec<CodecSuggestion>,
}

/// Probes `codec` and, on failure, ranks fallbacks for its container
pub fn probe(codec: &CodecChoice) -> ProbeReport {
    let (output_bytes, failure) = match probe_bytes(codec) {
        Ok(bytes) if bytes > MIN_PROBE_BYTES => (bytes, None),
        Ok(bytes) => (
            bytes,
            Some(format!("{codec} wrote only {bytes} bytes for a test frame")),
        ),
        Err(err) => (0, Some(err.to_string())),
    };

    if let Some(reason) = &failure {
        tracing::warn!(codec = %codec, reason = %reason, "codec probe failed");
        let suggestions = ranked_suggestions(codec);
        return ProbeReport {
            codec: codec.clone(),
            ok: false,
            output_bytes,
            failure,
            suggestions,
        };
    }

    tracing::debug!(codec = %codec, output_bytes, "codec probe passed");
    ProbeReport {
        codec: codec.clone(),
        ok: true,
        output_bytes,
        failure: None,
        suggestions: Vec::new(),
    }
}

/// Known codec fallbacks for a container extension.
///
/// Matching is case-insensitive and ignores a leading dot; unknown
/// containers get the MP4 list. `verified` is always false here.
pub fn codec_suggestions(extension: &str) -> Vec<CodecSuggestion> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let table: &[(&str, &str)] = match ext.as_str() {
        "mp4" | "m4v" => &[
            ("avc1", "H.264 - best compatibility"),
            ("mp4v", "MPEG-4 Part 2 - widely supported"),
            ("hvc1", "H.265/HEVC - smaller files"),
        ],
        "mov" => &[
            ("avc1", "H.264 - best compatibility"),
            ("mp4v", "MPEG-4 Part 2 - widely supported"),
            ("jpeg", "Motion JPEG - large files, simple decoding"),
        ],
        "avi" => &[
            ("XVID", "Xvid MPEG-4 - classic AVI codec"),
            ("MJPG", "Motion JPEG - large files, simple decoding"),
            ("DIVX", "DivX MPEG-4"),
        ],
        "mkv" => &[
            ("avc1", "H.264 - best compatibility"),
            ("XVID", "Xvid MPEG-4 - classic AVI codec"),
            ("MJPG", "Motion JPEG - large files, simple decoding"),
        ],
        "mxf" => &[
            ("xdv7", "XDCAM HD - broadcast"),
            ("AVdn", "Avid DNxHD - editing"),
        ],
        "webm" => &[
            ("VP90", "VP9 - modern web video"),
            ("VP80", "VP8 - legacy web video"),
        ],
        _ => return codec_suggestions("mp4"),
    };
    table
        .iter()
        .map(|(codec, description)| CodecSuggestion::new(codec, &ext, description, false))
        .collect()
}

/// Probes each fallback for the container and orders the verified ones first
fn ranked_suggestions(requested: &CodecChoice) -> Vec<CodecSuggestion> {
    let mut suggestions: Vec<CodecSuggestion> = codec_suggestions(&requested.extension)
        .into_iter()
        .filter(|s| !s.codec.eq_ignore_ascii_case(&requested.fourcc))
        .map(|mut suggestion| {
            suggestion.verified = matches!(
                probe_bytes(&suggestion.choice()),
                Ok(bytes) if bytes > MIN_PROBE_BYTES
            );
            suggestion
        })
        .collect();
    // Stable: table order is kept within each group
    suggestions.sort_by_key(|s| !s.verified);
    suggestions
}

/// Encodes one synthetic frame and returns the resulting file size
fn probe_bytes(codec: &CodecChoice) -> Result<u64> {
    let dir = tempfile::Builder::new().prefix("stillmotion-probe").tempdir()?;
    let path = dir.path().join(format!("probe.{}", codec.extension));
    write_probe_file(&path, codec)?;
    Ok(std::fs::metadata(&path)?.len())
}

fn write_probe_file(path: &Path, codec: &CodecChoice) -> Result<u64> {
    let mut writer = VideoWriter::create(path, codec, PROBE_WIDTH, PROBE_HEIGHT, PROBE_FPS)?;
    writer.write_frame(&probe_frame())?;
    writer.finish()
}

/// Gradient frame: flat frames compress to almost nothing
fn probe_frame() -> RgbImage {
    RgbImage::from_fn(PROBE_WIDTH, PROBE_HEIGHT, |x, y| {
        Rgb([
            (x * 255 / PROBE_WIDTH) as u8,
            (y * 255 / PROBE_HEIGHT) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_container_has_two_to_five_unique_suggestions() {
        for ext in ["mp4", "mov", "m4v", "avi", "mkv", "mxf", "webm"] {
            let suggestions = codec_suggestions(ext);
            assert!(
                (2..=5).contains(&suggestions.len()),
                "{ext} has {} suggestions",
                suggestions.len()
            );
            let unique: HashSet<&str> = suggestions.iter().map(|s| s.codec.as_str()).collect();
            assert_eq!(unique.len(), suggestions.len(), "duplicate codec for {ext}");
            assert!(suggestions.iter().all(|s| s.extension == ext && !s.verified));
        }
    }

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        assert_eq!(codec_suggestions(".AVI"), codec_suggestions("avi"));
        assert_eq!(codec_suggestions("AVI")[0].codec, "XVID");
    }

    #[test]
    fn test_unknown_container_falls_back_to_mp4_list() {
        let codecs: Vec<String> = codec_suggestions("flv").into_iter().map(|s| s.codec).collect();
        assert_eq!(codecs, vec!["avc1", "mp4v", "hvc1"]);
    }

    #[test]
    fn test_probe_frame_is_not_flat() {
        let frame = probe_frame();
        assert_ne!(frame.get_pixel(0, 0), frame.get_pixel(PROBE_WIDTH - 1, PROBE_HEIGHT - 1));
    }
}
