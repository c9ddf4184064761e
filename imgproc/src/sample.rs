use image::{GrayImage, Rgb, RgbImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    Constant(u8),
    Replicate,
}

fn map_coord(coord: isize, len: usize, mode: BorderMode) -> Option<usize> {
    let n = len as isize;
    if n <= 0 {
        return None;
    }
    match mode {
        BorderMode::Constant(_) => {
            if coord < 0 || coord >= n {
                None
            } else {
                Some(coord as usize)
            }
        }
        BorderMode::Replicate => Some(coord.clamp(0, n - 1) as usize),
    }
}

fn sample_gray(img: &GrayImage, x: isize, y: isize, border: BorderMode) -> f32 {
    let width = img.width() as usize;
    match (
        map_coord(x, width, border),
        map_coord(y, img.height() as usize, border),
    ) {
        (Some(ix), Some(iy)) => img.as_raw()[iy * width + ix] as f32,
        _ => match border {
            BorderMode::Constant(v) => v as f32,
            BorderMode::Replicate => 0.0,
        },
    }
}

/// Bilinear grayscale sample at a fractional coordinate.
pub fn get_pixel_bilinear(img: &GrayImage, x: f32, y: f32, border: BorderMode) -> f32 {
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let v00 = sample_gray(img, x0, y0, border);
    let v10 = sample_gray(img, x0 + 1, y0, border);
    let v01 = sample_gray(img, x0, y0 + 1, border);
    let v11 = sample_gray(img, x0 + 1, y0 + 1, border);

    let top = v00 * (1.0 - fx) + v10 * fx;
    let bottom = v01 * (1.0 - fx) + v11 * fx;
    top * (1.0 - fy) + bottom * fy
}

fn sample_rgb(img: &RgbImage, x: isize, y: isize, border: BorderMode) -> [f32; 3] {
    match (
        map_coord(x, img.width() as usize, border),
        map_coord(y, img.height() as usize, border),
    ) {
        (Some(ix), Some(iy)) => {
            let p = img.get_pixel(ix as u32, iy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32]
        }
        _ => match border {
            BorderMode::Constant(v) => [v as f32; 3],
            BorderMode::Replicate => [0.0; 3],
        },
    }
}

/// Bilinear RGB sample at a fractional coordinate.
pub fn get_pixel_bilinear_rgb(img: &RgbImage, x: f32, y: f32, border: BorderMode) -> [f32; 3] {
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let v00 = sample_rgb(img, x0, y0, border);
    let v10 = sample_rgb(img, x0 + 1, y0, border);
    let v01 = sample_rgb(img, x0, y0 + 1, border);
    let v11 = sample_rgb(img, x0 + 1, y0 + 1, border);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let top = v00[c] * (1.0 - fx) + v10[c] * fx;
        let bottom = v01[c] * (1.0 - fx) + v11[c] * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

pub fn rotate180_rgb(img: &RgbImage) -> RgbImage {
    let width = img.width();
    let height = img.height();
    let mut out = RgbImage::new(width, height);
    for (x, y, p) in img.enumerate_pixels() {
        out.put_pixel(width - 1 - x, height - 1 - y, Rgb(p.0));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([100]));

        let v = get_pixel_bilinear(&img, 0.5, 0.0, BorderMode::Replicate);
        assert!((v - 50.0).abs() < 1e-4);
    }

    #[test]
    fn constant_border_returns_fill_value() {
        let img = GrayImage::from_pixel(2, 2, Luma([200]));
        let v = get_pixel_bilinear(&img, -5.0, -5.0, BorderMode::Constant(0));
        assert_eq!(v, 0.0);
    }

    #[test]
    fn rotate180_twice_is_identity() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([1, 2, 3]));
        img.put_pixel(2, 1, Rgb([9, 8, 7]));

        let once = rotate180_rgb(&img);
        assert_eq!(once.get_pixel(2, 1).0, [1, 2, 3]);
        let twice = rotate180_rgb(&once);
        assert_eq!(twice.as_raw(), img.as_raw());
    }
}
