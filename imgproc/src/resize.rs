use rayon::prelude::*;

/// Bilinear resize of an f32 plane, row-parallel. Used for the blending
/// pyramid levels.
pub fn resize_linear_f32(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<f32> {
    assert_eq!(src.len(), src_w * src_h, "source plane size mismatch");
    if dst_w == 0 || dst_h == 0 {
        return Vec::new();
    }
    if src_w == 0 || src_h == 0 {
        return vec![0.0; dst_w * dst_h];
    }

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    let mut dst = vec![0.0f32; dst_w * dst_h];
    dst.par_chunks_mut(dst_w).enumerate().for_each(|(y, row)| {
        let sy = ((y as f32 + 0.5) * y_ratio - 0.5).max(0.0);
        let y0 = (sy.floor() as usize).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;

        for (x, out) in row.iter_mut().enumerate() {
            let sx = ((x as f32 + 0.5) * x_ratio - 0.5).max(0.0);
            let x0 = (sx.floor() as usize).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            let v00 = src[y0 * src_w + x0];
            let v10 = src[y0 * src_w + x1];
            let v01 = src[y1 * src_w + x0];
            let v11 = src[y1 * src_w + x1];

            let top = v00 * (1.0 - fx) + v10 * fx;
            let bottom = v01 * (1.0 - fx) + v11 * fx;
            *out = top * (1.0 - fy) + bottom * fy;
        }
    });

    dst
}

/// 2x2 mean downsample, halving each dimension (floor, minimum 1).
pub fn downsample_half_f32(src: &[f32], src_w: usize, src_h: usize) -> (Vec<f32>, usize, usize) {
    let dst_w = (src_w / 2).max(1);
    let dst_h = (src_h / 2).max(1);

    let mut dst = vec![0.0f32; dst_w * dst_h];
    dst.par_chunks_mut(dst_w).enumerate().for_each(|(y, row)| {
        let y0 = (y * 2).min(src_h - 1);
        let y1 = (y * 2 + 1).min(src_h - 1);
        for (x, out) in row.iter_mut().enumerate() {
            let x0 = (x * 2).min(src_w - 1);
            let x1 = (x * 2 + 1).min(src_w - 1);
            *out = (src[y0 * src_w + x0]
                + src[y0 * src_w + x1]
                + src[y1 * src_w + x0]
                + src[y1 * src_w + x1])
                * 0.25;
        }
    });

    (dst, dst_w, dst_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_identity_is_near_exact() {
        let src: Vec<f32> = (0..20).map(|v| v as f32).collect();
        let out = resize_linear_f32(&src, 5, 4, 5, 4);
        for (a, b) in src.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn downsample_averages_quads() {
        let src = vec![
            0.0, 4.0, 10.0, 10.0, //
            4.0, 8.0, 10.0, 10.0,
        ];
        let (dst, w, h) = downsample_half_f32(&src, 4, 2);
        assert_eq!((w, h), (2, 1));
        assert!((dst[0] - 4.0).abs() < 1e-5);
        assert!((dst[1] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn upsample_preserves_constant() {
        let src = vec![7.0f32; 6];
        let out = resize_linear_f32(&src, 3, 2, 9, 5);
        assert!(out.iter().all(|&v| (v - 7.0).abs() < 1e-4));
    }
}
