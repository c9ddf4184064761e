use crate::axis::{AxisCenter, AxisDetector};
use crate::polar::unwrap_frame;
use bs_core::Frame;

/// Unwrap configuration for one bore inspection.
#[derive(Debug, Clone)]
pub struct UnwrapConfig {
    /// Rows in the unwrapped output.
    pub output_height: u32,
    /// Below this cached-axis confidence the axis is re-detected.
    pub redetect_below: f32,
    /// Disable the axis cache entirely (every frame re-detects).
    pub cache_axis: bool,
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self {
            output_height: 200,
            redetect_below: 0.5,
            cache_axis: true,
        }
    }
}

/// Per-bore unwrap context. Holds the cached axis explicitly so consecutive
/// frames of a stable bore skip redundant detection; the caller threads one
/// session through a burst of frames and drops it when the bore changes.
pub struct UnwrapSession {
    detector: AxisDetector,
    config: UnwrapConfig,
    cached_axis: Option<AxisCenter>,
}

impl UnwrapSession {
    pub fn new(config: UnwrapConfig) -> Self {
        Self {
            detector: AxisDetector::new(),
            config,
            cached_axis: None,
        }
    }

    pub fn with_detector(mut self, detector: AxisDetector) -> Self {
        self.detector = detector;
        self
    }

    /// The axis used for the most recent frame, if any.
    pub fn axis(&self) -> Option<AxisCenter> {
        self.cached_axis
    }

    /// Unwrap one raw circular-view frame into a rectangular wall image.
    pub fn unwrap(&mut self, frame: &Frame) -> Frame {
        let axis = self.resolve_axis(frame);
        let out = unwrap_frame(frame.as_rgb(), &axis, self.config.output_height);
        Frame::from_rgb(out)
    }

    fn resolve_axis(&mut self, frame: &Frame) -> AxisCenter {
        if self.config.cache_axis {
            if let Some(axis) = self.cached_axis {
                if axis.confidence >= self.config.redetect_below {
                    return axis;
                }
            }
        }

        let axis = self.detector.detect(&frame.to_gray());
        self.cached_axis = Some(axis);
        axis
    }
}

impl Default for UnwrapSession {
    fn default() -> Self {
        Self::new(UnwrapConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn bore_frame(width: u32, height: u32, cx: f32, cy: f32, radius: f32) -> Frame {
        let mut img = RgbImage::new(width, height);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            *p = Rgb(if d < radius { [25; 3] } else { [190; 3] });
        }
        Frame::from_rgb(img)
    }

    #[test]
    fn cache_is_reused_for_confident_axis() {
        let frame = bore_frame(96, 96, 48.0, 54.0, 20.0);
        let mut session = UnwrapSession::default();

        let _ = session.unwrap(&frame);
        let first = session.axis().expect("axis after first frame");

        if first.confidence >= 0.5 {
            let _ = session.unwrap(&frame);
            assert_eq!(session.axis(), Some(first));
        }
    }

    #[test]
    fn cache_disabled_runs_are_identical() {
        let frame = bore_frame(96, 96, 48.0, 54.0, 20.0);
        let config = UnwrapConfig {
            cache_axis: false,
            ..UnwrapConfig::default()
        };

        let a = UnwrapSession::new(config.clone()).unwrap(&frame);
        let b = UnwrapSession::new(config).unwrap(&frame);
        assert_eq!(a.as_rgb().as_raw(), b.as_rgb().as_raw());
    }

    #[test]
    fn featureless_frame_still_produces_output() {
        let frame = Frame::from_rgb(RgbImage::from_pixel(80, 80, Rgb([120; 3])));
        let mut session = UnwrapSession::default();
        let out = session.unwrap(&frame);

        let axis = session.axis().unwrap();
        assert_eq!(axis.confidence, 0.0);
        assert!(out.width() > 0);
    }
}
