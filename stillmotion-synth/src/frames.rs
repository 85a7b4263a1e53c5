//! Lazy Ken Burns frame sequence

use crate::CompositeCanvas;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::iter::FusedIterator;
use stillmotion_core::EffectParameters;

/// Region of the canvas shown by one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// Cubic when the window must be enlarged to the target, area-style otherwise
    pub fn filter_for(&self, target_width: u32, target_height: u32) -> FilterType {
        if self.width < target_width || self.height < target_height {
            FilterType::CatmullRom
        } else {
            FilterType::Triangle
        }
    }
}

/// Single-pass sequence of exactly `frame_count()` frames.
///
/// The sequence owns its canvas and cannot be rewound; build a new one
/// with [`crate::synthesize`] to render the image again.
#[derive(Debug)]
pub struct KenBurnsFrames {
    canvas: CompositeCanvas,
    params: EffectParameters,
    next: u64,
    total: u64,
}

impl KenBurnsFrames {
    pub(crate) fn new(canvas: CompositeCanvas, params: EffectParameters) -> Self {
        let total = params.frame_count();
        Self {
            canvas,
            params,
            next: 0,
            total,
        }
    }

    /// Total number of frames, including those already yielded
    pub fn frame_count(&self) -> u64 {
        self.total
    }

    pub fn canvas(&self) -> &CompositeCanvas {
        &self.canvas
    }

    /// Crop window for frame `index`, always inside the canvas
    pub fn crop_window(&self, index: u64) -> CropWindow {
        let canvas_w = self.canvas.width();
        let canvas_h = self.canvas.height();
        let zoom = self.params.zoom_at(index);

        let width = ((canvas_w as f64 / zoom).round() as u32).clamp(1, canvas_w);
        let height = ((canvas_h as f64 / zoom).round() as u32).clamp(1, canvas_h);

        let (ux, uy) = self.params.pan_direction.unit();
        let drift = index as f64 * self.params.pan_rate_per_frame;
        let center_x = (canvas_w - width) as f64 / 2.0 + ux * drift * canvas_w as f64;
        let center_y = (canvas_h - height) as f64 / 2.0 + uy * drift * canvas_h as f64;

        CropWindow {
            x: center_x.round().clamp(0.0, (canvas_w - width) as f64) as u32,
            y: center_y.round().clamp(0.0, (canvas_h - height) as f64) as u32,
            width,
            height,
        }
    }

    fn render(&self, index: u64) -> RgbImage {
        let window = self.crop_window(index);
        let (target_w, target_h) = (self.params.target_width, self.params.target_height);
        let view = imageops::crop_imm(
            self.canvas.pixels(),
            window.x,
            window.y,
            window.width,
            window.height,
        );

        if window.width == target_w && window.height == target_h {
            return view.to_image();
        }
        imageops::resize(&*view, target_w, target_h, window.filter_for(target_w, target_h))
    }
}

impl Iterator for KenBurnsFrames {
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        if self.next >= self.total {
            return None;
        }
        let frame = self.render(self.next);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for KenBurnsFrames {}

impl FusedIterator for KenBurnsFrames {}
