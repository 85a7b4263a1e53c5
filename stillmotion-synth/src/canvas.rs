//! Headroom canvas: blurred cover layer with the fitted image on top

use crate::SourceImage;
use image::imageops::{self, FilterType};
use image::RgbImage;
use stillmotion_core::EffectParameters;

/// Composite built once per source image.
///
/// Sized `target × headroom` so that the tightest crop window of the
/// sequence never needs pixels outside the canvas.
#[derive(Debug, Clone)]
pub struct CompositeCanvas {
    pixels: RgbImage,
}

impl CompositeCanvas {
    pub fn build(image: &SourceImage, params: &EffectParameters) -> Self {
        let (canvas_w, canvas_h) = canvas_size(params);
        let (img_w, img_h) = (image.width().max(1), image.height().max(1));

        let cover = cover_layer(&image.pixels, canvas_w, canvas_h);
        let mut pixels = imageops::blur(&cover, params.blur_sigma());
        drop(cover);

        // Foreground: fit-scale, pasted centered
        let (fit_w, fit_h) = fit_size(img_w, img_h, canvas_w, canvas_h);
        let fitted = imageops::resize(&image.pixels, fit_w, fit_h, FilterType::Lanczos3);
        let x = (canvas_w - fit_w) / 2;
        let y = (canvas_h - fit_h) / 2;
        imageops::replace(&mut pixels, &fitted, x as i64, y as i64);

        tracing::debug!(
            source = %image.path.display(),
            canvas = format_args!("{canvas_w}x{canvas_h}"),
            foreground = format_args!("{fit_w}x{fit_h}"),
            "built composite canvas"
        );

        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Canvas dimensions: the target size scaled by the headroom factor
pub fn canvas_size(params: &EffectParameters) -> (u32, u32) {
    let headroom = params.headroom().max(1.0);
    let scale = |target: u32| ((target as f64 * headroom).round() as u32).max(target);
    (scale(params.target_width), scale(params.target_height))
}

/// Largest size with the image's aspect ratio that fits inside the frame
pub fn fit_size(img_w: u32, img_h: u32, frame_w: u32, frame_h: u32) -> (u32, u32) {
    let scale = (frame_w as f64 / img_w as f64).min(frame_h as f64 / img_h as f64);
    let w = ((img_w as f64 * scale).round() as u32).clamp(1, frame_w);
    let h = ((img_h as f64 * scale).round() as u32).clamp(1, frame_h);
    (w, h)
}

/// Centered region of the image with the frame's aspect ratio, as `(x, y, w, h)`.
///
/// Scaling this region to the frame size covers the frame completely.
pub fn cover_crop(img_w: u32, img_h: u32, frame_w: u32, frame_h: u32) -> (u32, u32, u32, u32) {
    let scale = (frame_w as f64 / img_w as f64).max(frame_h as f64 / img_h as f64);
    let w = ((frame_w as f64 / scale).round() as u32).clamp(1, img_w);
    let h = ((frame_h as f64 / scale).round() as u32).clamp(1, img_h);
    ((img_w - w) / 2, (img_h - h) / 2, w, h)
}

/// Background layer of exactly `frame_w × frame_h`: crop first, then scale
fn cover_layer(source: &RgbImage, frame_w: u32, frame_h: u32) -> RgbImage {
    let (x, y, w, h) = cover_crop(source.width().max(1), source.height().max(1), frame_w, frame_h);
    let region = imageops::crop_imm(source, x, y, w, h);
    imageops::resize(&*region, frame_w, frame_h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_fit_and_cover_for_wide_image() {
        // 2:1 image into a 16:9 frame
        assert_eq!(fit_size(200, 100, 160, 90), (160, 80));
        assert_eq!(cover_crop(200, 100, 160, 90), (11, 0, 178, 100));
    }

    #[test]
    fn test_fit_and_cover_for_narrow_image() {
        assert_eq!(fit_size(100, 200, 160, 90), (45, 90));
        assert_eq!(cover_crop(100, 200, 160, 90), (0, 72, 100, 56));
    }

    #[test]
    fn test_cover_layer_of_extreme_aspect_stays_frame_sized() {
        assert_eq!(cover_crop(4, 4000, 64, 48), (0, 1998, 4, 3));

        let strip = RgbImage::from_fn(4, 4000, |_, y| Rgb([(y / 16) as u8, 0, 0]));
        let layer = cover_layer(&strip, 64, 48);
        assert_eq!(layer.dimensions(), (64, 48));
        // Taken from the middle of the strip
        let middle = layer.get_pixel(32, 24)[0];
        assert!((120..=130).contains(&middle), "got {middle}");
    }

    #[test]
    fn test_canvas_size_includes_headroom() {
        let params = EffectParameters::default();
        let (w, h) = canvas_size(&params);
        // headroom = 1 + 0.0004 * 250 = 1.1
        assert_eq!((w, h), (2112, 1188));
    }

    #[test]
    fn test_foreground_centered_over_blurred_background() {
        // Black image with a white center column; the fitted copy lands
        // in the middle of the canvas untouched by the blur.
        let pixels = RgbImage::from_fn(30, 60, |x, _| {
            if (10..20).contains(&x) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let image = SourceImage::from_rgb("column.png", pixels);
        let params = EffectParameters {
            target_width: 80,
            target_height: 60,
            fps: 5,
            duration_seconds: 1.0,
            zoom_rate_per_frame: 0.0,
            blur_kernel_size: 9,
            ..Default::default()
        };
        let canvas = CompositeCanvas::build(&image, &params);
        assert_eq!((canvas.width(), canvas.height()), (80, 60));

        let center = canvas.pixels().get_pixel(40, 30);
        assert!(center[0] > 240, "center should be the sharp white column, got {center:?}");
        let edge = canvas.pixels().get_pixel(0, 30);
        assert!(edge[0] < 128, "left border should be blurred background, got {edge:?}");
    }
}
