use image::GrayImage;
use rayon::prelude::*;

pub fn compute_histogram(image: &GrayImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for pixel in image.pixels() {
        hist[pixel[0] as usize] += 1;
    }
    hist
}

pub fn compute_cdf(hist: &[u32; 256]) -> [u32; 256] {
    let mut cdf = [0u32; 256];
    cdf[0] = hist[0];
    for i in 1..256 {
        cdf[i] = cdf[i - 1] + hist[i];
    }
    cdf
}

/// Global histogram equalization.
pub fn histogram_equalization(image: &GrayImage) -> GrayImage {
    let hist = compute_histogram(image);
    let lut = equalization_lut(&hist, image.width() as u64 * image.height() as u64);

    let mut output = GrayImage::new(image.width(), image.height());
    let src_raw = image.as_raw();

    output
        .par_chunks_mut(image.width() as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let offset = y * image.width() as usize;
            for (x, out) in row.iter_mut().enumerate() {
                *out = lut[src_raw[offset + x] as usize];
            }
        });

    output
}

/// Contrast-limited adaptive histogram equalization over a bounded tile
/// grid. This is the contrast-normalization step run before feature
/// detection so keypoints stay stable across varying illumination.
///
/// `clip_limit` is the per-bin cap as a multiple of the mean tile bin count;
/// clipped mass is redistributed uniformly. Each output pixel interpolates
/// bilinearly between the LUTs of the four surrounding tile centers.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> GrayImage {
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }

    let tiles_x = tiles_x.max(1).min(width);
    let tiles_y = tiles_y.max(1).min(height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    // One LUT per tile.
    let luts: Vec<[u8; 256]> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|t| {
            let tx = t % tiles_x;
            let ty = t / tiles_x;
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let area = ((x1 - x0) * (y1 - y0)) as u64;
            clip_histogram(&mut hist, clip_limit, area);
            equalization_lut(&hist, area)
        })
        .collect();

    let tile_lut = |tx: i64, ty: i64| -> &[u8; 256] {
        let tx = tx.clamp(0, tiles_x as i64 - 1) as u32;
        let ty = ty.clamp(0, tiles_y as i64 - 1) as u32;
        &luts[(ty * tiles_x + tx) as usize]
    };

    let mut output = GrayImage::new(width, height);
    let src_raw = image.as_raw();

    output
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            // Position relative to tile centers.
            let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
            let ty0 = fy.floor() as i64;
            let wy = fy - ty0 as f32;

            for (x, out) in row.iter_mut().enumerate() {
                let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
                let tx0 = fx.floor() as i64;
                let wx = fx - tx0 as f32;

                let v = src_raw[y * width as usize + x] as usize;
                let v00 = tile_lut(tx0, ty0)[v] as f32;
                let v10 = tile_lut(tx0 + 1, ty0)[v] as f32;
                let v01 = tile_lut(tx0, ty0 + 1)[v] as f32;
                let v11 = tile_lut(tx0 + 1, ty0 + 1)[v] as f32;

                let top = v00 * (1.0 - wx) + v10 * wx;
                let bottom = v01 * (1.0 - wx) + v11 * wx;
                *out = (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8;
            }
        });

    output
}

fn clip_histogram(hist: &mut [u32; 256], clip_limit: f32, area: u64) {
    if clip_limit <= 0.0 || area == 0 {
        return;
    }
    let cap = ((area as f32 / 256.0) * clip_limit).max(1.0) as u32;

    let mut excess = 0u64;
    for bin in hist.iter_mut() {
        if *bin > cap {
            excess += (*bin - cap) as u64;
            *bin = cap;
        }
    }

    let share = (excess / 256) as u32;
    let mut remainder = (excess % 256) as u32;
    for bin in hist.iter_mut() {
        *bin += share;
        if remainder > 0 {
            *bin += 1;
            remainder -= 1;
        }
    }
}

fn equalization_lut(hist: &[u32; 256], total: u64) -> [u8; 256] {
    let cdf = compute_cdf(hist);
    let cdf_min = cdf.iter().find(|&&x| x > 0).copied().unwrap_or(0) as u64;

    let mut lut = [0u8; 256];
    if total > cdf_min {
        let denom = (total - cdf_min) as f32;
        for i in 0..256 {
            let num = (cdf[i] as u64).saturating_sub(cdf_min) as f32;
            lut[i] = (num / denom * 255.0).round() as u8;
        }
    } else {
        // Constant tile: identity mapping.
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn equalization_spreads_narrow_range() {
        let mut img = GrayImage::new(16, 16);
        for (i, p) in img.pixels_mut().enumerate() {
            *p = Luma([100 + (i % 8) as u8]);
        }

        let eq = histogram_equalization(&img);
        let min = eq.pixels().map(|p| p[0]).min().unwrap();
        let max = eq.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 100, "range {min}..{max} not stretched");
    }

    #[test]
    fn clahe_preserves_constant_image() {
        let img = GrayImage::from_pixel(32, 32, Luma([77]));
        let out = clahe(&img, 2.0, 4, 4);
        assert!(out.pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn clahe_is_deterministic() {
        let mut img = GrayImage::new(40, 30);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Luma([((x * 7 + y * 13) % 256) as u8]);
        }
        let a = clahe(&img, 2.0, 4, 4);
        let b = clahe(&img, 2.0, 4, 4);
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
