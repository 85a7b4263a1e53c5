//! Ken Burns effect parameters and their validation

use crate::{Error, Result};
use std::str::FromStr;

/// Direction of the zoom motion over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ZoomDirection {
    #[default]
    In,
    Out,
}

impl FromStr for ZoomDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(ZoomDirection::In),
            "out" => Ok(ZoomDirection::Out),
            other => Err(Error::Config(format!(
                "unknown zoom direction '{other}' (expected 'in' or 'out')"
            ))),
        }
    }
}

/// Direction of the pan drift over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PanDirection {
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
}

impl PanDirection {
    /// Unit displacement of the crop window for this direction
    pub fn unit(self) -> (f64, f64) {
        match self {
            PanDirection::None => (0.0, 0.0),
            PanDirection::Left => (-1.0, 0.0),
            PanDirection::Right => (1.0, 0.0),
            PanDirection::Up => (0.0, -1.0),
            PanDirection::Down => (0.0, 1.0),
        }
    }
}

impl FromStr for PanDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(PanDirection::None),
            "left" => Ok(PanDirection::Left),
            "right" => Ok(PanDirection::Right),
            "up" => Ok(PanDirection::Up),
            "down" => Ok(PanDirection::Down),
            other => Err(Error::Config(format!(
                "unknown pan direction '{other}' (expected none, left, right, up or down)"
            ))),
        }
    }
}

/// Configured bounds on the zoom motion
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectLimits {
    /// Largest zoom factor any frame may reach
    pub max_zoom: f64,
    /// Largest accepted zoom increment per frame
    pub max_zoom_rate: f64,
}

impl Default for EffectLimits {
    fn default() -> Self {
        Self {
            max_zoom: 4.0,
            max_zoom_rate: 0.01,
        }
    }
}

/// Parameters of the Ken Burns effect for a single output video
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectParameters {
    /// Output frame width in pixels
    pub target_width: u32,
    /// Output frame height in pixels
    pub target_height: u32,
    /// Output frame rate
    pub fps: u32,
    /// Length of each video in seconds
    pub duration_seconds: f64,
    /// Zoom increment applied per frame
    pub zoom_rate_per_frame: f64,
    pub zoom_direction: ZoomDirection,
    pub pan_direction: PanDirection,
    /// Pan displacement per frame, as a fraction of the canvas dimension
    pub pan_rate_per_frame: f64,
    /// Gaussian kernel size for the background layer (positive, odd)
    pub blur_kernel_size: i64,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            target_width: 1920,
            target_height: 1080,
            fps: 25,
            duration_seconds: 10.0,
            zoom_rate_per_frame: 0.0004,
            zoom_direction: ZoomDirection::In,
            pan_direction: PanDirection::None,
            pan_rate_per_frame: 0.0002,
            blur_kernel_size: 61,
        }
    }
}

impl EffectParameters {
    /// Number of frames in the sequence: round(fps × duration)
    pub fn frame_count(&self) -> u64 {
        let frames = self.fps as f64 * self.duration_seconds;
        if !frames.is_finite() || frames <= 0.0 {
            return 0;
        }
        frames.round() as u64
    }

    /// Zoom factor for frame `index`.
    ///
    /// Zooming in grows from 1; zooming out walks the same factors backwards
    /// so both directions share one bound check.
    pub fn zoom_at(&self, index: u64) -> f64 {
        let last = self.frame_count().saturating_sub(1);
        let step = match self.zoom_direction {
            ZoomDirection::In => index.min(last),
            ZoomDirection::Out => last - index.min(last),
        };
        1.0 + step as f64 * self.zoom_rate_per_frame
    }

    /// Largest zoom factor reached anywhere in the sequence
    pub fn peak_zoom(&self) -> f64 {
        1.0 + self.frame_count().saturating_sub(1) as f64 * self.zoom_rate_per_frame
    }

    /// Oversize factor of the composite canvas relative to the target frame
    pub fn headroom(&self) -> f64 {
        1.0 + self.zoom_rate_per_frame * self.frame_count() as f64
    }

    /// Gaussian sigma matching `blur_kernel_size`
    pub fn blur_sigma(&self) -> f32 {
        let k = self.blur_kernel_size as f64;
        (0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8) as f32
    }

    /// Checks every parameter against its invariant
    pub fn validate(&self, limits: &EffectLimits) -> Result<()> {
        validate_blur_kernel_size(self.blur_kernel_size)?;

        if self.target_width == 0 || self.target_height == 0 {
            return Err(Error::Config(format!(
                "target size must be positive, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.target_width % 2 != 0 || self.target_height % 2 != 0 {
            return Err(Error::Config(format!(
                "target size must be even for 4:2:0 output, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.fps == 0 {
            return Err(Error::Config("fps must be positive".into()));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(Error::Config(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration_seconds
            )));
        }
        if self.frame_count() == 0 {
            return Err(Error::Config(format!(
                "{} fps for {}s yields no frames",
                self.fps, self.duration_seconds
            )));
        }

        if !(limits.max_zoom >= 1.0) || !(limits.max_zoom_rate > 0.0) {
            return Err(Error::Config(format!(
                "zoom limits must satisfy max_zoom >= 1 and max_zoom_rate > 0, got {} and {}",
                limits.max_zoom, limits.max_zoom_rate
            )));
        }
        let rate = self.zoom_rate_per_frame;
        if !rate.is_finite() || rate < 0.0 || rate > limits.max_zoom_rate {
            return Err(Error::Config(format!(
                "zoom rate per frame must lie within [0, {}], got {rate}",
                limits.max_zoom_rate
            )));
        }
        let peak = self.peak_zoom();
        if peak > limits.max_zoom {
            return Err(Error::Config(format!(
                "zoom reaches {peak:.4} over {} frames, above the maximum of {}; lower the zoom rate or the duration",
                self.frame_count(),
                limits.max_zoom
            )));
        }

        if !self.pan_rate_per_frame.is_finite() || self.pan_rate_per_frame < 0.0 {
            return Err(Error::Config(format!(
                "pan rate per frame must be a non-negative number, got {}",
                self.pan_rate_per_frame
            )));
        }

        Ok(())
    }
}

/// Rejects blur kernel sizes that are not positive odd integers
pub fn validate_blur_kernel_size(size: i64) -> Result<()> {
    if size <= 0 {
        return Err(Error::Config(format!(
            "blur kernel size must be a positive odd integer, got {size} (use 1 or a larger odd value)"
        )));
    }
    if size % 2 == 0 {
        return Err(Error::Config(format!(
            "blur kernel size must be a positive odd integer, got {size} (use {} or {})",
            size - 1,
            size + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_hd_sequence_length_and_peak_zoom() {
        let params = EffectParameters::default();
        assert_eq!(params.frame_count(), 250);
        assert!((params.zoom_at(249) - 1.0996).abs() < 1e-9);
        assert!(params.validate(&EffectLimits::default()).is_ok());
    }

    #[test]
    fn test_frame_count_rounds() {
        let params = EffectParameters {
            fps: 24,
            duration_seconds: 2.51,
            ..Default::default()
        };
        // 60.24 frames
        assert_eq!(params.frame_count(), 60);
    }

    #[test]
    fn test_zoom_out_mirrors_zoom_in() {
        let zoom_in = EffectParameters::default();
        let zoom_out = EffectParameters {
            zoom_direction: ZoomDirection::Out,
            ..Default::default()
        };
        assert_eq!(zoom_out.zoom_at(0), zoom_in.zoom_at(249));
        assert_eq!(zoom_out.zoom_at(249), 1.0);
    }

    #[test]
    fn test_large_blur_rejected() {
        let params = EffectParameters {
            blur_kernel_size: 200,
            ..Default::default()
        };
        let err = params.validate(&EffectLimits::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("199 or 201"));
    }

    #[test]
    fn test_odd_target_size_rejected() {
        let params = EffectParameters {
            target_width: 1921,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(&EffectLimits::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_zoom_beyond_limit_rejected() {
        let params = EffectParameters {
            zoom_rate_per_frame: 0.01,
            duration_seconds: 60.0,
            ..Default::default()
        };
        let err = params.validate(&EffectLimits::default()).unwrap_err();
        assert!(err.to_string().contains("above the maximum"));
    }

    #[test]
    fn test_zoom_rate_above_bound_rejected() {
        let params = EffectParameters {
            zoom_rate_per_frame: 0.02,
            duration_seconds: 1.0,
            ..Default::default()
        };
        assert!(params.validate(&EffectLimits::default()).is_err());
    }

    #[test]
    fn test_headroom_covers_peak_zoom() {
        let params = EffectParameters::default();
        assert!(params.headroom() >= params.peak_zoom());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("OUT".parse::<ZoomDirection>().unwrap(), ZoomDirection::Out);
        assert_eq!("left".parse::<PanDirection>().unwrap(), PanDirection::Left);
        assert!("sideways".parse::<PanDirection>().is_err());
    }

    proptest! {
        #[test]
        fn prop_blur_accepts_exactly_positive_odd(size in -1000i64..1000) {
            let expected = size > 0 && size % 2 == 1;
            prop_assert_eq!(validate_blur_kernel_size(size).is_ok(), expected);
        }

        #[test]
        fn prop_zoom_monotonic_and_bounded(
            rate in 0.0f64..0.01,
            fps in 1u32..60,
            duration in 0.5f64..20.0,
            zoom_out in any::<bool>(),
        ) {
            let limits = EffectLimits::default();
            let params = EffectParameters {
                target_width: 64,
                target_height: 48,
                fps,
                duration_seconds: duration,
                zoom_rate_per_frame: rate,
                zoom_direction: if zoom_out { ZoomDirection::Out } else { ZoomDirection::In },
                ..Default::default()
            };
            prop_assume!(params.validate(&limits).is_ok());

            let n = params.frame_count();
            for i in 1..n {
                let (prev, cur) = (params.zoom_at(i - 1), params.zoom_at(i));
                if zoom_out {
                    prop_assert!(cur <= prev);
                } else {
                    prop_assert!(cur >= prev);
                }
                prop_assert!(cur >= 1.0 && cur <= limits.max_zoom);
            }
        }
    }
}
