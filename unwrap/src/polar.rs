use crate::axis::AxisCenter;
use bs_imgproc::{get_pixel_bilinear_rgb, rotate180_rgb, BorderMode};
use image::RgbImage;
use rayon::prelude::*;

/// Outer sampling radius: distance from the axis to the nearest frame edge.
pub fn outer_radius(center: &AxisCenter, width: u32, height: u32) -> f32 {
    let left = center.x;
    let right = (width as f32 - 1.0) - center.x;
    let top = center.y;
    let bottom = (height as f32 - 1.0) - center.y;
    left.min(right).min(top).min(bottom).max(0.0)
}

/// Resample the annulus between `inner` and `outer` radius around the axis
/// into a rectangular image of `out_height` rows and `ceil(2*pi*outer)`
/// columns, bilinear per pixel, then rotate 180 degrees (rig convention:
/// the unwrapped wall reads top-down in probe-advance direction).
pub fn unwrap_annulus(
    src: &RgbImage,
    center: &AxisCenter,
    inner: f32,
    outer: f32,
    out_height: u32,
) -> RgbImage {
    if outer <= inner || out_height == 0 {
        return RgbImage::new(0, 0);
    }

    let out_width = (std::f32::consts::TAU * outer).ceil() as u32;
    if out_width == 0 {
        return RgbImage::new(0, 0);
    }

    let mut out = RgbImage::new(out_width, out_height);
    let radial_span = outer - inner;

    out.par_chunks_mut(out_width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| {
            // Row 0 samples the outer radius, the last row the inner one.
            let t = (y as f32 + 0.5) / out_height as f32;
            let radius = outer - t * radial_span;

            for x in 0..out_width as usize {
                let theta = (x as f32 + 0.5) / out_width as f32 * std::f32::consts::TAU;
                let sx = center.x + radius * theta.cos();
                let sy = center.y + radius * theta.sin();

                let rgb = get_pixel_bilinear_rgb(src, sx, sy, BorderMode::Replicate);
                let off = x * 3;
                row[off] = rgb[0].round().clamp(0.0, 255.0) as u8;
                row[off + 1] = rgb[1].round().clamp(0.0, 255.0) as u8;
                row[off + 2] = rgb[2].round().clamp(0.0, 255.0) as u8;
            }
        });

    rotate180_rgb(&out)
}

/// Convenience wrapper: derive radii from the axis (`inner = outer / 2`).
pub fn unwrap_frame(src: &RgbImage, center: &AxisCenter, out_height: u32) -> RgbImage {
    let outer = outer_radius(center, src.width(), src.height());
    unwrap_annulus(src, center, outer / 2.0, outer, out_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn radial_rings(width: u32, height: u32, cx: f32, cy: f32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            let v = ((d * 8.0) as u32 % 256) as u8;
            *p = Rgb([v, v, v]);
        }
        img
    }

    #[test]
    fn output_width_matches_circumference() {
        let center = AxisCenter {
            x: 50.0,
            y: 50.0,
            confidence: 1.0,
        };
        let img = radial_rings(101, 101, 50.0, 50.0);
        let out = unwrap_frame(&img, &center, 40);

        let outer = outer_radius(&center, 101, 101);
        assert_eq!(out.width(), (std::f32::consts::TAU * outer).ceil() as u32);
        assert_eq!(out.height(), 40);
    }

    #[test]
    fn concentric_rings_unwrap_to_horizontal_bands() {
        let center = AxisCenter {
            x: 60.0,
            y: 60.0,
            confidence: 1.0,
        };
        let img = radial_rings(121, 121, 60.0, 60.0);
        let out = unwrap_frame(&img, &center, 30);

        // Within any row the value should be almost constant.
        for y in [0u32, 14, 29] {
            let first = out.get_pixel(0, y)[0] as i32;
            for x in (0..out.width()).step_by(17) {
                let v = out.get_pixel(x, y)[0] as i32;
                assert!((v - first).abs() <= 4, "row {y} varies: {first} vs {v}");
            }
        }
    }

    #[test]
    fn unwrap_is_deterministic() {
        let center = AxisCenter {
            x: 40.0,
            y: 45.0,
            confidence: 0.8,
        };
        let img = radial_rings(90, 100, 40.0, 45.0);
        let a = unwrap_frame(&img, &center, 25);
        let b = unwrap_frame(&img, &center, 25);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn degenerate_geometry_yields_empty_output() {
        let center = AxisCenter {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        };
        let img = radial_rings(50, 50, 0.0, 0.0);
        let out = unwrap_frame(&img, &center, 20);
        assert_eq!(out.width(), 0);
    }
}
