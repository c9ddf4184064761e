use crate::edges::{gradient_magnitude, sobel_gradients};
use image::GrayImage;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Hough circle candidate.
#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub score: f32,
}

/// Gradient-guided Hough circle transform.
///
/// Edge pixels vote for centers along their gradient direction at each
/// candidate radius; accumulator peaks above `accum_threshold` become
/// candidates, then overlapping candidates are suppressed (strongest wins).
pub fn hough_circles(
    src: &GrayImage,
    min_radius: f32,
    max_radius: f32,
    accum_threshold: u32,
    edge_threshold: f32,
) -> Vec<Circle> {
    let width = src.width() as usize;
    let height = src.height() as usize;
    if width < 3 || height < 3 || max_radius < min_radius {
        return Vec::new();
    }

    let (gx, gy) = sobel_gradients(src);
    let mag = gradient_magnitude(&gx, &gy);

    let mut all_circles = Vec::new();

    for r in (min_radius.max(1.0) as i32)..=(max_radius as i32) {
        let r_f = r as f32;
        let acc: Vec<AtomicU32> = (0..width * height).map(|_| AtomicU32::new(0)).collect();

        mag.par_iter().enumerate().for_each(|(i, &m)| {
            if m > edge_threshold {
                let ex = (i % width) as f32;
                let ey = (i / width) as f32;
                let angle = gy[i].atan2(gx[i]);

                // Center lies along the gradient line on either side.
                for sign in [-1.0f32, 1.0] {
                    let cx = ex + sign * r_f * angle.cos();
                    let cy = ey + sign * r_f * angle.sin();

                    if cx >= 0.0 && cx < width as f32 && cy >= 0.0 && cy < height as f32 {
                        let idx = cy as usize * width + cx as usize;
                        acc[idx].fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });

        for (i, count) in acc.iter().enumerate() {
            let count = count.load(Ordering::Relaxed);
            if count >= accum_threshold {
                all_circles.push(Circle {
                    x: (i % width) as f32,
                    y: (i / width) as f32,
                    radius: r_f,
                    score: count as f32,
                });
            }
        }
    }

    suppress_overlapping(all_circles)
}

/// Greedy non-maximum suppression: keep the strongest candidate, drop any
/// other whose center falls within half its radius.
fn suppress_overlapping(mut circles: Vec<Circle>) -> Vec<Circle> {
    circles.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Circle> = Vec::new();
    for c in circles {
        let overlaps = kept.iter().any(|k| {
            let dx = c.x - k.x;
            let dy = c.y - k.y;
            (dx * dx + dy * dy).sqrt() < (k.radius * 0.5).max(4.0)
        });
        if !overlaps {
            kept.push(c);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ring_image(width: u32, height: u32, cx: f32, cy: f32, radius: f32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            *p = Luma(if d < radius { [200] } else { [20] });
        }
        img
    }

    #[test]
    fn detects_synthetic_disc() {
        let img = ring_image(64, 64, 32.0, 30.0, 14.0);
        let circles = hough_circles(&img, 10.0, 18.0, 20, 100.0);

        assert!(!circles.is_empty(), "expected at least one candidate");
        let best = circles[0];
        assert!((best.x - 32.0).abs() <= 3.0, "cx {}", best.x);
        assert!((best.y - 30.0).abs() <= 3.0, "cy {}", best.y);
        assert!((best.radius - 14.0).abs() <= 2.0, "r {}", best.radius);
    }

    #[test]
    fn featureless_image_yields_nothing() {
        let img = GrayImage::from_pixel(48, 48, Luma([128]));
        let circles = hough_circles(&img, 5.0, 20.0, 10, 100.0);
        assert!(circles.is_empty());
    }

    #[test]
    fn suppression_keeps_strongest_of_cluster() {
        let cluster = vec![
            Circle { x: 10.0, y: 10.0, radius: 8.0, score: 50.0 },
            Circle { x: 11.0, y: 10.0, radius: 8.0, score: 40.0 },
            Circle { x: 30.0, y: 30.0, radius: 8.0, score: 45.0 },
        ];
        let kept = suppress_overlapping(cluster);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 50.0);
    }
}
