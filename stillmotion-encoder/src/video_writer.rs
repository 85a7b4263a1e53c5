//! Streaming video writer
//!
//! The flow per frame:
//!   1. RGB pixels → ffmpeg `frame::Video` (RGB24)
//!   2. swscale RGB24 → the encoder's pixel format (YUV420P when supported)
//!   3. encoder → packets, rescaled to the stream time base and muxed
//!
//! Until `finish()` succeeds the output file is owned by a guard that
//! deletes it, so an abandoned or failed writer never leaves a partial file.

use crate::{fourcc, Error, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg::format::{self, Pixel};
use ffmpeg::software::scaling;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{codec, Packet, Rational};
use image::RgbImage;
use std::path::{Path, PathBuf};
use stillmotion_core::{CodecChoice, Geometry};

/// Writes RGB frames into a video file, one at a time
pub struct VideoWriter {
    // Field order matters: the muxer must close before the guard runs.
    output: format::context::Output,
    encoder: codec::encoder::video::Encoder,
    scaler: scaling::Context,
    rgb_frame: VideoFrame,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    geometry: Geometry,
    frames_written: u64,
    guard: PartialFileGuard,
}

impl VideoWriter {
    /// Opens `path` for writing with the given codec and frame geometry
    pub fn create(path: &Path, codec: &CodecChoice, width: u32, height: u32, fps: u32) -> Result<Self> {
        crate::init()?;
        if width == 0 || height == 0 || fps == 0 {
            return Err(Error::Core(stillmotion_core::Error::Config(format!(
                "cannot open a {width}x{height} writer at {fps} fps"
            ))));
        }

        let tag = fourcc::fourcc_tag(&codec.fourcc)?;
        let video_codec = fourcc::encoder_for(&codec.fourcc)?;
        let pixel_format = pixel_format_for(video_codec);

        let guard = PartialFileGuard::new(path);
        let mut output = format::output(&path)?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let time_base = Rational::new(1, fps as i32);
        let mut context = codec::context::Context::new_with_codec(video_codec)
            .encoder()
            .video()?;
        context.set_width(width);
        context.set_height(height);
        context.set_format(pixel_format);
        context.set_time_base(time_base);
        context.set_frame_rate(Some(Rational::new(fps as i32, 1)));
        context.set_max_b_frames(0);
        if global_header {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let encoder = context.open_as(video_codec)?;

        let stream_index = {
            let mut stream = output.add_stream(video_codec)?;
            stream.set_parameters(&encoder);
            stream.set_time_base(time_base);
            // SAFETY: the stream parameters are owned by `output`, which is alive.
            unsafe {
                (*stream.parameters().as_mut_ptr()).codec_tag = tag;
            }
            stream.index()
        };

        output.write_header()?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or(Error::NoVideoStream)?;

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            pixel_format,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        tracing::debug!(
            path = %path.display(),
            codec = %codec,
            ?pixel_format,
            width,
            height,
            fps,
            "opened video writer"
        );

        Ok(Self {
            output,
            encoder,
            scaler,
            rgb_frame: VideoFrame::new(Pixel::RGB24, width, height),
            stream_index,
            encoder_time_base: time_base,
            stream_time_base,
            geometry: Geometry::new(width, height),
            frames_written: 0,
            guard,
        })
    }

    /// Encodes one frame; its size must match the writer's geometry
    pub fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
        let found = Geometry::new(image.width(), image.height());
        if found != self.geometry {
            return Err(Error::FrameSize {
                expected: self.geometry,
                found,
            });
        }

        // Copy RGB rows into the frame, respecting its stride
        {
            let stride = self.rgb_frame.stride(0);
            let row_bytes = image.width() as usize * 3;
            let src = image.as_raw();
            let dst = self.rgb_frame.data_mut(0);
            for (y, row) in src.chunks_exact(row_bytes).enumerate() {
                let offset = y * stride;
                dst[offset..offset + row_bytes].copy_from_slice(row);
            }
        }

        // A fresh target frame each time: the encoder may still reference the last one
        let mut converted = VideoFrame::empty();
        self.scaler.run(&self.rgb_frame, &mut converted)?;
        converted.set_pts(Some(self.frames_written as i64));

        self.encoder.send_frame(&converted)?;
        self.drain_packets()?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flushes the encoder, writes the trailer and keeps the file
    pub fn finish(mut self) -> Result<u64> {
        self.encoder.send_eof()?;
        self.drain_packets()?;
        self.output.write_trailer()?;
        self.guard.keep();
        Ok(self.frames_written)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn path(&self) -> &Path {
        &self.guard.path
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output)?;
        }
        Ok(())
    }
}

/// YUV420P when the encoder accepts it, otherwise its first listed format
fn pixel_format_for(video_codec: ffmpeg::Codec) -> Pixel {
    let formats: Vec<Pixel> = video_codec
        .video()
        .ok()
        .and_then(|video| video.formats().map(|formats| formats.collect()))
        .unwrap_or_default();
    if formats.is_empty() || formats.contains(&Pixel::YUV420P) {
        Pixel::YUV420P
    } else {
        formats[0]
    }
}

/// Deletes the file at `path` on drop unless `keep()` was called
struct PartialFileGuard {
    path: PathBuf,
    keep: bool,
}

impl PartialFileGuard {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            keep: false,
        }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed partial output"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "could not remove partial output"
            ),
        }
    }
}
