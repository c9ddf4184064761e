use bs_imgproc::{gradient_magnitude, hough_circles, sobel_gradients, Circle};
use image::GrayImage;

/// Detected bore axis: the optical center of the circular view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCenter {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl AxisCenter {
    /// Geometric-center fallback when no plausible axis was found.
    pub fn frame_center(width: u32, height: u32) -> Self {
        Self {
            x: width as f32 / 2.0,
            y: height as f32 / 2.0,
            confidence: 0.0,
        }
    }
}

/// One radius band of the multi-scale circle search, as a fraction of the
/// half of the frame's smaller dimension.
struct RadiusBand {
    min_frac: f32,
    max_frac: f32,
    accum_threshold: u32,
    edge_threshold: f32,
}

const BANDS: [RadiusBand; 3] = [
    // Large: the far bore wall fills most of the view.
    RadiusBand {
        min_frac: 0.60,
        max_frac: 0.95,
        accum_threshold: 40,
        edge_threshold: 120.0,
    },
    // Medium.
    RadiusBand {
        min_frac: 0.30,
        max_frac: 0.60,
        accum_threshold: 25,
        edge_threshold: 100.0,
    },
    // Small: distant wall far down the bore; weaker edges allowed.
    RadiusBand {
        min_frac: 0.10,
        max_frac: 0.30,
        accum_threshold: 15,
        edge_threshold: 80.0,
    },
];

const SCORE_ACCEPT: f32 = 0.4;

/// Multi-scale bore-axis detector.
pub struct AxisDetector {
    accept_threshold: f32,
}

impl AxisDetector {
    pub fn new() -> Self {
        Self {
            accept_threshold: SCORE_ACCEPT,
        }
    }

    pub fn with_accept_threshold(mut self, threshold: f32) -> Self {
        self.accept_threshold = threshold;
        self
    }

    /// Detect the bore axis. Among the candidates clearing the quality
    /// threshold, the one closest to and below the geometric center wins
    /// (in this rig the far wall projects below the optical center). No
    /// qualifying candidate means the frame center with confidence 0.
    pub fn detect(&self, image: &GrayImage) -> AxisCenter {
        let width = image.width();
        let height = image.height();
        if width < 16 || height < 16 {
            return AxisCenter::frame_center(width, height);
        }

        let half_min = width.min(height) as f32 / 2.0;
        let (gx, gy) = sobel_gradients(image);
        let mag = gradient_magnitude(&gx, &gy);

        let mut scored: Vec<(Circle, f32)> = Vec::new();
        for band in &BANDS {
            let min_r = band.min_frac * half_min;
            let max_r = band.max_frac * half_min;
            let candidates = hough_circles(
                image,
                min_r,
                max_r,
                band.accum_threshold,
                band.edge_threshold,
            );

            for c in candidates {
                let score = score_candidate(&c, width, height, min_r, max_r, &mag, band);
                if score >= self.accept_threshold {
                    scored.push((c, score));
                }
            }
        }

        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;

        let best = scored
            .into_iter()
            .filter(|(c, _)| c.y >= cy)
            .min_by(|(a, _), (b, _)| {
                let da = (a.x - cx).hypot(a.y - cy);
                let db = (b.x - cx).hypot(b.y - cy);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });

        match best {
            Some((c, score)) => AxisCenter {
                x: c.x,
                y: c.y,
                confidence: score.clamp(0.0, 1.0),
            },
            None => {
                tracing::warn!("no plausible bore axis found, defaulting to frame center");
                AxisCenter::frame_center(width, height)
            }
        }
    }
}

impl Default for AxisDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted candidate quality: position plausibility, boundary containment,
/// radius plausibility, edge strength along the perimeter.
fn score_candidate(
    c: &Circle,
    width: u32,
    height: u32,
    band_min_r: f32,
    band_max_r: f32,
    mag: &[f32],
    band: &RadiusBand,
) -> f32 {
    let w = width as f32;
    let h = height as f32;
    let half_min = w.min(h) / 2.0;

    // Near the frame center is plausible, the far corner is not.
    let center_dist = (c.x - w / 2.0).hypot(c.y - h / 2.0);
    let position = (1.0 - center_dist / half_min).clamp(0.0, 1.0);

    // Fraction of the circle inside the frame.
    let containment = {
        let over_left = (c.radius - c.x).max(0.0);
        let over_right = (c.x + c.radius - (w - 1.0)).max(0.0);
        let over_top = (c.radius - c.y).max(0.0);
        let over_bottom = (c.y + c.radius - (h - 1.0)).max(0.0);
        let worst = over_left.max(over_right).max(over_top).max(over_bottom);
        (1.0 - worst / c.radius.max(1.0)).clamp(0.0, 1.0)
    };

    // Mid-band radii are the expected geometry.
    let band_mid = (band_min_r + band_max_r) / 2.0;
    let band_half = ((band_max_r - band_min_r) / 2.0).max(1.0);
    let radius_plausibility = (1.0 - (c.radius - band_mid).abs() / band_half).clamp(0.0, 1.0);

    // Fraction of perimeter samples with a real edge under them.
    let edge_quality = {
        let samples = 72;
        let mut on_edge = 0u32;
        let mut valid = 0u32;
        for i in 0..samples {
            let theta = i as f32 / samples as f32 * std::f32::consts::TAU;
            let px = c.x + c.radius * theta.cos();
            let py = c.y + c.radius * theta.sin();
            if px >= 0.0 && px < w && py >= 0.0 && py < h {
                valid += 1;
                if mag[py as usize * width as usize + px as usize] > band.edge_threshold * 0.5 {
                    on_edge += 1;
                }
            }
        }
        if valid == 0 {
            0.0
        } else {
            on_edge as f32 / valid as f32
        }
    };

    0.2 * position + 0.2 * containment + 0.2 * radius_plausibility + 0.4 * edge_quality
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn bore_frame(width: u32, height: u32, cx: f32, cy: f32, radius: f32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            // Dark well in the middle, bright wall outside.
            *p = Luma(if d < radius { [25] } else { [190] });
        }
        img
    }

    #[test]
    fn finds_center_below_geometric_center() {
        let img = bore_frame(96, 96, 48.0, 54.0, 20.0);
        let axis = AxisDetector::new().detect(&img);

        assert!(axis.confidence > 0.0, "expected a detection");
        assert!((axis.x - 48.0).abs() <= 5.0, "x {}", axis.x);
        assert!((axis.y - 54.0).abs() <= 5.0, "y {}", axis.y);
    }

    #[test]
    fn featureless_frame_falls_back_to_center() {
        let img = GrayImage::from_pixel(80, 60, Luma([128]));
        let axis = AxisDetector::new().detect(&img);

        assert_eq!(axis.confidence, 0.0);
        assert_eq!(axis.x, 40.0);
        assert_eq!(axis.y, 30.0);
    }

    #[test]
    fn candidate_above_center_is_not_chosen() {
        // Circle strictly above the geometric center violates the rig
        // geometry, so detection must fall back.
        let img = bore_frame(96, 96, 48.0, 20.0, 12.0);
        let axis = AxisDetector::new().detect(&img);
        assert!(axis.y >= 48.0 || axis.confidence == 0.0);
    }

    #[test]
    fn tiny_frame_is_tolerated() {
        let img = GrayImage::new(8, 8);
        let axis = AxisDetector::new().detect(&img);
        assert_eq!(axis.confidence, 0.0);
    }
}
