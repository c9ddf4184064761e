use image::GrayImage;
use rayon::prelude::*;

/// Signed Sobel gradients of a grayscale image, replicate borders.
/// Returns `(gx, gy)` planes the same size as the input.
pub fn sobel_gradients(src: &GrayImage) -> (Vec<f32>, Vec<f32>) {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let raw = src.as_raw();

    let sample = |x: isize, y: isize| -> f32 {
        let x = x.clamp(0, width as isize - 1) as usize;
        let y = y.clamp(0, height as isize - 1) as usize;
        raw[y * width + x] as f32
    };

    let mut gx = vec![0.0f32; width * height];
    let mut gy = vec![0.0f32; width * height];

    gx.par_chunks_mut(width)
        .zip(gy.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (gx_row, gy_row))| {
            let y = y as isize;
            for x in 0..width as isize {
                let tl = sample(x - 1, y - 1);
                let tc = sample(x, y - 1);
                let tr = sample(x + 1, y - 1);
                let ml = sample(x - 1, y);
                let mr = sample(x + 1, y);
                let bl = sample(x - 1, y + 1);
                let bc = sample(x, y + 1);
                let br = sample(x + 1, y + 1);

                gx_row[x as usize] = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
                gy_row[x as usize] = (bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr);
            }
        });

    (gx, gy)
}

pub fn gradient_magnitude(gx: &[f32], gy: &[f32]) -> Vec<f32> {
    gx.par_iter()
        .zip(gy.par_iter())
        .map(|(&x, &y)| (x * x + y * y).sqrt())
        .collect()
}
