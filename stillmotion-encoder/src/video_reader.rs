//! Video reading and frame extraction using FFmpeg

use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::path::Path;

/// Video reader that streams decoded frames out of a video file
pub struct VideoReader {
    input: ffmpeg::format::context::Input,
    video_stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
    frame_rate: ffmpeg::Rational,
    stream_duration: i64,
    time_base: ffmpeg::Rational,
}

impl VideoReader {
    /// Opens a video file
    pub fn open(path: &Path) -> Result<Self> {
        crate::init()?;

        let input = ffmpeg::format::input(&path).map_err(|err| match err {
            ffmpeg::Error::InvalidData => Error::InvalidVideo,
            other => other.into(),
        })?;

        // Find the video stream
        let video_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;

        let video_stream_index = video_stream.index();
        let frame_rate = video_stream.avg_frame_rate();
        let frame_rate = if frame_rate.numerator() > 0 && frame_rate.denominator() > 0 {
            frame_rate
        } else {
            video_stream.rate()
        };
        let stream_duration = video_stream.duration();
        let time_base = video_stream.time_base();

        // Create decoder
        let context = ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context.decoder().video()?;
        if decoder.width() == 0 || decoder.height() == 0 {
            return Err(Error::InvalidVideo);
        }

        Ok(Self {
            input,
            video_stream_index,
            decoder,
            scaler: None,
            frame_rate,
            stream_duration,
            time_base,
        })
    }

    /// Gets the video width
    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    /// Gets the video height
    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /// Gets the frame rate as a rational number (numerator, denominator)
    pub fn frame_rate(&self) -> (u32, u32) {
        (
            self.frame_rate.numerator().max(0) as u32,
            self.frame_rate.denominator().max(0) as u32,
        )
    }

    /// Frame rate rounded to whole frames per second, 0 when unknown
    pub fn rounded_fps(&self) -> u32 {
        let (num, den) = self.frame_rate();
        if den == 0 {
            return 0;
        }
        (num as f64 / den as f64).round() as u32
    }

    /// Gets the total duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.stream_duration > 0 {
            (self.stream_duration as f64 * self.time_base.numerator() as f64
                / self.time_base.denominator() as f64
                * 1000.0) as u64
        } else {
            // Fallback to container duration
            let duration = self.input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64 * 1000.0;
            duration.max(0.0) as u64
        }
    }

    /// Decodes every frame in order, handing each to `on_frame` as RGB.
    ///
    /// Only one decoded frame is held at a time. Returns the number of
    /// frames delivered; an error from `on_frame` stops decoding.
    pub fn for_each_frame<F>(&mut self, mut on_frame: F) -> Result<u64>
    where
        F: FnMut(RgbImage) -> Result<()>,
    {
        let mut delivered = 0u64;

        // Read packets and decode
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.video_stream_index {
                self.decoder.send_packet(&packet)?;
                delivered += drain_decoder(&mut self.decoder, &mut self.scaler, &mut on_frame)?;
            }
        }

        // Flush decoder
        self.decoder.send_eof()?;
        delivered += drain_decoder(&mut self.decoder, &mut self.scaler, &mut on_frame)?;

        Ok(delivered)
    }

    /// Counts decodable frames by reading the whole stream
    pub fn count_frames(&mut self) -> Result<u64> {
        self.for_each_frame(|_| Ok(()))
    }
}

fn drain_decoder<F>(
    decoder: &mut ffmpeg::decoder::Video,
    scaler: &mut Option<ffmpeg::software::scaling::Context>,
    on_frame: &mut F,
) -> Result<u64>
where
    F: FnMut(RgbImage) -> Result<()>,
{
    let mut delivered = 0;
    let mut decoded = ffmpeg::frame::Video::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        // Setup scaler for RGB conversion from the first real frame's format
        if scaler.is_none() {
            *scaler = Some(ffmpeg::software::scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg::format::Pixel::RGB24,
                decoded.width(),
                decoded.height(),
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }
        let Some(scaler) = scaler.as_mut() else {
            return Err(Error::InvalidVideo);
        };

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;
        on_frame(frame_to_image(&rgb_frame)?)?;
        delivered += 1;
    }
    Ok(delivered)
}

/// Copies an RGB24 frame into an image, dropping row padding
fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        let row = data.get(start..start + row_bytes).ok_or(Error::InvalidVideo)?;
        pixels.extend_from_slice(row);
    }
    RgbImage::from_raw(width, height, pixels).ok_or(Error::InvalidVideo)
}
