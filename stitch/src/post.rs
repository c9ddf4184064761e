use bs_imgproc::unsharp_mask_f32;
use image::RgbImage;
use tracing::debug;

/// Final cleanup over the assembled panorama.
///
/// Four stages, each local and conservative: crop the unused near-black
/// border, smooth residual horizontal seams, mild sharpening with channel
/// balance, and hole inpainting. Every stage settles after one application,
/// so running the processor again leaves the result essentially unchanged.
pub struct PostProcessor {
    /// Luma at or below this is treated as unwritten canvas.
    dark_threshold: f32,
    /// Mean row-to-row luma step that flags a residual seam.
    seam_step_threshold: f32,
    /// Fraction of columns that must carry the step for a row to count.
    seam_coverage: f32,
    sharpen_sigma: f32,
    sharpen_amount: f32,
    inpaint_iterations: usize,
}

impl PostProcessor {
    pub fn new() -> Self {
        Self {
            dark_threshold: 10.0,
            seam_step_threshold: 25.0,
            seam_coverage: 0.6,
            sharpen_sigma: 1.0,
            sharpen_amount: 0.3,
            inpaint_iterations: 8,
        }
    }

    pub fn with_sharpen_amount(mut self, amount: f32) -> Self {
        self.sharpen_amount = amount.max(0.0);
        self
    }

    pub fn process(&self, image: &RgbImage) -> RgbImage {
        if image.width() == 0 || image.height() == 0 {
            return image.clone();
        }

        let mut planes = Planes::from_image(image);
        planes = self.crop_content(planes);
        self.smooth_seams(&mut planes);
        self.sharpen_and_balance(&mut planes);
        self.inpaint_holes(&mut planes);
        planes.into_image()
    }

    /// Drop border rows and columns that never received content.
    fn crop_content(&self, planes: Planes) -> Planes {
        let (w, h) = (planes.width, planes.height);
        let is_content_row = |y: usize| {
            (0..w).any(|x| planes.luma(x, y) > self.dark_threshold)
        };
        let is_content_col = |x: usize| {
            (0..h).any(|y| planes.luma(x, y) > self.dark_threshold)
        };

        let top = (0..h).find(|&y| is_content_row(y));
        let Some(top) = top else {
            // Entirely dark: nothing to crop toward.
            return planes;
        };
        let bottom = (0..h).rev().find(|&y| is_content_row(y)).unwrap_or(top);
        let left = (0..w).find(|&x| is_content_col(x)).unwrap_or(0);
        let right = (0..w).rev().find(|&x| is_content_col(x)).unwrap_or(left);

        if top == 0 && bottom == h - 1 && left == 0 && right == w - 1 {
            return planes;
        }
        debug!(top, bottom, left, right, "cropping panorama to content");
        planes.crop(left, top, right - left + 1, bottom - top + 1)
    }

    /// Replace rows with a full-width brightness step by interpolating the
    /// surrounding content through the band.
    fn smooth_seams(&self, planes: &mut Planes) {
        let (w, h) = (planes.width, planes.height);
        if h < 3 {
            return;
        }

        let mut seam_rows = vec![false; h];
        for y in 1..h {
            let mut total = 0.0f32;
            let mut hits = 0usize;
            for x in 0..w {
                let step = (planes.luma(x, y) - planes.luma(x, y - 1)).abs();
                total += step;
                if step > self.seam_step_threshold * 0.5 {
                    hits += 1;
                }
            }
            let mean = total / w as f32;
            if mean > self.seam_step_threshold
                && hits as f32 / w as f32 > self.seam_coverage
            {
                seam_rows[y] = true;
            }
        }

        let mut y = 1;
        while y < h {
            if !seam_rows[y] {
                y += 1;
                continue;
            }
            let band_start = y;
            let mut band_end = y;
            while band_end + 1 < h && seam_rows[band_end + 1] {
                band_end += 1;
            }
            // Anchor rows just outside the band; skip bands touching the
            // bottom edge, there is nothing to interpolate toward.
            let above = band_start - 1;
            if band_end + 1 >= h {
                break;
            }
            let below = band_end + 1;
            debug!(rows = band_end - band_start + 1, at = band_start, "smoothing seam band");

            let span = (below - above) as f32;
            for row in band_start..=band_end {
                let t = (row - above) as f32 / span;
                for c in 0..3 {
                    for x in 0..w {
                        let a = planes.data[c][above * w + x];
                        let b = planes.data[c][below * w + x];
                        planes.data[c][row * w + x] = a * (1.0 - t) + b * t;
                    }
                }
            }
            y = band_end + 2;
        }
    }

    fn sharpen_and_balance(&self, planes: &mut Planes) {
        let (w, h) = (planes.width, planes.height);
        if self.sharpen_amount > 0.0 && w >= 3 && h >= 3 {
            for plane in &mut planes.data {
                *plane = unsharp_mask_f32(plane, w, h, self.sharpen_sigma, self.sharpen_amount);
                for v in plane.iter_mut() {
                    *v = v.clamp(0.0, 255.0);
                }
            }
        }

        // Pull the channel means together so the panorama carries no global
        // color cast from uneven illumination.
        let means: Vec<f32> = planes
            .data
            .iter()
            .map(|p| p.iter().sum::<f32>() / p.len() as f32)
            .collect();
        let target = (means[0] + means[1] + means[2]) / 3.0;
        for (plane, &mean) in planes.data.iter_mut().zip(&means) {
            if mean > 1.0 {
                let gain = target / mean;
                for v in plane.iter_mut() {
                    *v = (*v * gain).clamp(0.0, 255.0);
                }
            }
        }
    }

    /// Fill isolated near-black pixels from their lit neighbors. Purely
    /// local, so large unwritten regions are left alone.
    fn inpaint_holes(&self, planes: &mut Planes) {
        let (w, h) = (planes.width, planes.height);
        let mut hole: Vec<bool> = (0..w * h)
            .map(|i| planes.luma(i % w, i / w) <= self.dark_threshold)
            .collect();

        for _ in 0..self.inpaint_iterations {
            let mut changed = false;
            let snapshot = planes.data.clone();
            let prev_hole = hole.clone();
            for y in 0..h {
                for x in 0..w {
                    if !prev_hole[y * w + x] {
                        continue;
                    }
                    let mut sums = [0.0f32; 3];
                    let mut n = 0u32;
                    for dy in -1i64..=1 {
                        for dx in -1i64..=1 {
                            let nx = x as i64 + dx;
                            let ny = y as i64 + dy;
                            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                                continue;
                            }
                            let ni = ny as usize * w + nx as usize;
                            if prev_hole[ni] {
                                continue;
                            }
                            for c in 0..3 {
                                sums[c] += snapshot[c][ni];
                            }
                            n += 1;
                        }
                    }
                    if n >= 3 {
                        for c in 0..3 {
                            planes.data[c][y * w + x] = sums[c] / n as f32;
                        }
                        hole[y * w + x] = false;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-channel f32 planes of an RGB image.
struct Planes {
    data: [Vec<f32>; 3],
    width: usize,
    height: usize,
}

impl Planes {
    fn from_image(image: &RgbImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let raw = image.as_raw();
        let mut data = [
            Vec::with_capacity(width * height),
            Vec::with_capacity(width * height),
            Vec::with_capacity(width * height),
        ];
        for px in raw.chunks_exact(3) {
            data[0].push(px[0] as f32);
            data[1].push(px[1] as f32);
            data[2].push(px[2] as f32);
        }
        Self {
            data,
            width,
            height,
        }
    }

    fn luma(&self, x: usize, y: usize) -> f32 {
        let i = y * self.width + x;
        (self.data[0][i] + self.data[1][i] + self.data[2][i]) / 3.0
    }

    fn crop(self, x0: usize, y0: usize, new_w: usize, new_h: usize) -> Self {
        let mut out = [
            Vec::with_capacity(new_w * new_h),
            Vec::with_capacity(new_w * new_h),
            Vec::with_capacity(new_w * new_h),
        ];
        for y in y0..y0 + new_h {
            for (c, plane) in out.iter_mut().enumerate() {
                let off = y * self.width + x0;
                plane.extend_from_slice(&self.data[c][off..off + new_w]);
            }
        }
        Self {
            data: out,
            width: new_w,
            height: new_h,
        }
    }

    fn into_image(self) -> RgbImage {
        let mut raw = Vec::with_capacity(self.width * self.height * 3);
        for i in 0..self.width * self.height {
            raw.push(self.data[0][i].round().clamp(0.0, 255.0) as u8);
            raw.push(self.data[1][i].round().clamp(0.0, 255.0) as u8);
            raw.push(self.data[2][i].round().clamp(0.0, 255.0) as u8);
        }
        RgbImage::from_raw(self.width as u32, self.height as u32, raw)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn framed_image(width: u32, height: u32, border: u32, value: u8) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for y in border..height - border {
            for x in border..width - border {
                img.put_pixel(x, y, Rgb([value; 3]));
            }
        }
        img
    }

    #[test]
    fn crops_dark_border() {
        let img = framed_image(30, 40, 5, 120);
        let out = PostProcessor::new().process(&img);
        assert_eq!(out.dimensions(), (20, 30));
    }

    #[test]
    fn flat_gray_is_essentially_unchanged() {
        let img = RgbImage::from_pixel(24, 24, Rgb([128, 128, 128]));
        let out = PostProcessor::new().process(&img);
        assert_eq!(out.dimensions(), (24, 24));
        for px in out.pixels() {
            for c in 0..3 {
                assert!((px.0[c] as i32 - 128).abs() <= 1);
            }
        }
    }

    #[test]
    fn seam_band_is_interpolated_away() {
        let mut img = RgbImage::from_pixel(40, 30, Rgb([150, 150, 150]));
        // A two-row bright stripe across the full width.
        for y in 14..16 {
            for x in 0..40 {
                img.put_pixel(x, y, Rgb([250, 250, 250]));
            }
        }
        let out = PostProcessor::new().with_sharpen_amount(0.0).process(&img);
        for y in 14..16 {
            let v = out.get_pixel(20, y).0[0];
            assert!((v as i32 - 150).abs() <= 5, "seam row kept value {v}");
        }
    }

    #[test]
    fn small_hole_is_inpainted() {
        let mut img = RgbImage::from_pixel(20, 20, Rgb([180, 180, 180]));
        img.put_pixel(10, 10, Rgb([0, 0, 0]));
        img.put_pixel(11, 10, Rgb([0, 0, 0]));
        let out = PostProcessor::new().with_sharpen_amount(0.0).process(&img);
        assert!(out.get_pixel(10, 10).0[0] > 150);
        assert!(out.get_pixel(11, 10).0[0] > 150);
    }

    #[test]
    fn reprocessing_is_stable() {
        let mut img = RgbImage::new(32, 48);
        for y in 0..48 {
            for x in 0..32 {
                let v = (40 + (x * 3 + y * 2) % 160) as u8;
                img.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        let once = PostProcessor::new().process(&img);
        let twice = PostProcessor::new().process(&once);
        assert_eq!(once.dimensions(), twice.dimensions());
        let mut max_delta = 0i32;
        for (a, b) in once.pixels().zip(twice.pixels()) {
            for c in 0..3 {
                max_delta = max_delta.max((a.0[c] as i32 - b.0[c] as i32).abs());
            }
        }
        assert!(max_delta <= 24, "reprocessing drifted by {max_delta}");
    }

    #[test]
    fn all_dark_image_is_left_alone() {
        let img = RgbImage::new(16, 16);
        let out = PostProcessor::new().process(&img);
        assert_eq!(out.dimensions(), (16, 16));
    }
}
