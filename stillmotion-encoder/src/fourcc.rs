//! Four-character codec code resolution
//!
//! The code is looked up in FFmpeg's own RIFF (AVI) and MOV/MP4 tag tables,
//! the same tables the muxers use, so the mapping stays opaque to us.

use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg::codec;
use std::ptr;

/// Packs a four-character code into its little-endian tag value
pub fn fourcc_tag(fourcc: &str) -> Result<u32> {
    let bytes: [u8; 4] = fourcc
        .as_bytes()
        .try_into()
        .map_err(|_| Error::UnknownFourcc(fourcc.to_string()))?;
    if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        return Err(Error::UnknownFourcc(fourcc.to_string()));
    }
    Ok(u32::from_le_bytes(bytes))
}

/// Resolves a fourcc to an FFmpeg codec id.
///
/// Tries the code as given, then upper- and lower-cased, since tag tables
/// list most codes in a single case.
pub fn codec_id_for(fourcc: &str) -> Result<codec::Id> {
    crate::init()?;

    let candidates = [
        fourcc.to_string(),
        fourcc.to_ascii_uppercase(),
        fourcc.to_ascii_lowercase(),
    ];
    for candidate in &candidates {
        let tag = fourcc_tag(candidate)?;
        let id = lookup_tag(tag);
        if id != codec::Id::None {
            return Ok(id);
        }
    }
    Err(Error::UnknownFourcc(fourcc.to_string()))
}

/// Finds an encoder able to produce the codec named by `fourcc`
pub fn encoder_for(fourcc: &str) -> Result<ffmpeg::Codec> {
    let id = codec_id_for(fourcc)?;
    ffmpeg::encoder::find(id).ok_or_else(|| Error::EncoderNotFound(fourcc.to_string()))
}

fn lookup_tag(tag: u32) -> codec::Id {
    // SAFETY: the tag tables are static FFmpeg data and the list is
    // null-terminated as av_codec_get_id requires.
    let raw = unsafe {
        let tables = [
            ffmpeg::ffi::avformat_get_riff_video_tags(),
            ffmpeg::ffi::avformat_get_mov_video_tags(),
            ptr::null(),
        ];
        ffmpeg::ffi::av_codec_get_id(tables.as_ptr(), tag)
    };
    codec::Id::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_packing() {
        assert_eq!(fourcc_tag("mp4v").unwrap(), u32::from_le_bytes(*b"mp4v"));
        assert!(fourcc_tag("abc").is_err());
        assert!(fourcc_tag("abcde").is_err());
        assert!(fourcc_tag("").is_err());
    }

    #[test]
    fn test_common_codes_resolve() {
        assert_eq!(codec_id_for("mp4v").unwrap(), codec::Id::MPEG4);
        assert_eq!(codec_id_for("XVID").unwrap(), codec::Id::MPEG4);
        assert_eq!(codec_id_for("MJPG").unwrap(), codec::Id::MJPEG);
        assert_eq!(codec_id_for("avc1").unwrap(), codec::Id::H264);
    }

    #[test]
    fn test_case_fallback() {
        assert_eq!(codec_id_for("xvid").unwrap(), codec::Id::MPEG4);
    }

    #[test]
    fn test_fake_code_is_unknown() {
        assert!(matches!(codec_id_for("FAKE"), Err(Error::UnknownFourcc(_))));
    }
}
