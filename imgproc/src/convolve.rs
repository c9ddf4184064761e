use image::GrayImage;
use rayon::prelude::*;

/// 1D convolution kernel for separable filters.
#[derive(Debug, Clone)]
pub struct Kernel1D {
    pub data: Vec<f32>,
}

impl Kernel1D {
    pub fn new(data: Vec<f32>) -> Self {
        assert!(data.len() % 2 == 1, "kernel length must be odd");
        Self { data }
    }

    pub fn radius(&self) -> usize {
        self.data.len() / 2
    }

    pub fn normalize(&mut self) {
        let sum: f32 = self.data.iter().sum();
        if sum != 0.0 {
            for v in &mut self.data {
                *v /= sum;
            }
        }
    }
}

/// Normalized 1D Gaussian; length covers ±3 sigma.
pub fn gaussian_kernel_1d(sigma: f32) -> Kernel1D {
    let sigma = sigma.max(0.1);
    let radius = (sigma * 3.0).ceil() as usize;
    let mut data = Vec::with_capacity(2 * radius + 1);
    let sigma2 = sigma * sigma;
    for i in 0..=2 * radius {
        let d = i as f32 - radius as f32;
        data.push((-(d * d) / (2.0 * sigma2)).exp());
    }
    let mut kernel = Kernel1D::new(data);
    kernel.normalize();
    kernel
}

/// Separable convolution of an f32 plane, replicate borders, row-parallel.
pub fn convolve_separable_f32(
    plane: &[f32],
    width: usize,
    height: usize,
    kernel: &Kernel1D,
) -> Vec<f32> {
    assert_eq!(plane.len(), width * height, "plane size mismatch");
    let radius = kernel.radius() as isize;
    let k = &kernel.data;

    // Horizontal pass.
    let mut tmp = vec![0.0f32; width * height];
    tmp.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src = &plane[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0f32;
            for (i, &kv) in k.iter().enumerate() {
                let sx = (x as isize + i as isize - radius).clamp(0, width as isize - 1);
                acc += src[sx as usize] * kv;
            }
            row[x] = acc;
        }
    });

    // Vertical pass.
    let mut out = vec![0.0f32; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (i, &kv) in k.iter().enumerate() {
                let sy = (y as isize + i as isize - radius).clamp(0, height as isize - 1);
                acc += tmp[sy as usize * width + x] * kv;
            }
            row[x] = acc;
        }
    });

    out
}

pub fn gaussian_blur_f32(plane: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    convolve_separable_f32(plane, width, height, &gaussian_kernel_1d(sigma))
}

pub fn gaussian_blur(src: &GrayImage, sigma: f32) -> GrayImage {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let plane: Vec<f32> = src.as_raw().iter().map(|&v| v as f32).collect();
    let blurred = gaussian_blur_f32(&plane, width, height, sigma);

    let data: Vec<u8> = blurred
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(src.width(), src.height(), data).unwrap_or_default()
}

/// Unsharp masking on an f32 plane: `src + amount * (src - blur(src))`.
pub fn unsharp_mask_f32(
    plane: &[f32],
    width: usize,
    height: usize,
    sigma: f32,
    amount: f32,
) -> Vec<f32> {
    let blurred = gaussian_blur_f32(plane, width, height, sigma);
    plane
        .iter()
        .zip(blurred.iter())
        .map(|(&v, &b)| v + amount * (v - b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_kernel_sums_to_one() {
        let k = gaussian_kernel_1d(1.5);
        let sum: f32 = k.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(k.data.len() % 2, 1);
    }

    #[test]
    fn blur_preserves_constant_plane() {
        let plane = vec![42.0f32; 12 * 9];
        let out = gaussian_blur_f32(&plane, 12, 9, 2.0);
        assert!(out.iter().all(|&v| (v - 42.0).abs() < 1e-4));
    }

    #[test]
    fn blur_spreads_impulse() {
        let mut plane = vec![0.0f32; 11 * 11];
        plane[5 * 11 + 5] = 100.0;
        let out = gaussian_blur_f32(&plane, 11, 11, 1.0);
        assert!(out[5 * 11 + 5] < 100.0);
        assert!(out[5 * 11 + 6] > 0.0);
        // Mass is conserved under replicate borders away from the edge.
        let total: f32 = out.iter().sum();
        assert!((total - 100.0).abs() < 1.0);
    }

    #[test]
    fn unsharp_amplifies_edges() {
        let width = 10;
        let mut plane = vec![0.0f32; width * 4];
        for y in 0..4 {
            for x in 5..width {
                plane[y * width + x] = 200.0;
            }
        }
        let out = unsharp_mask_f32(&plane, width, 4, 1.0, 0.5);
        // Overshoot on the bright side of the edge.
        assert!(out[5] > 200.0);
        assert!(out[4] < 0.0 + 1e-3 || out[4] < plane[4] + 1e-3);
    }
}
