use bs_imgproc::{downsample_half_f32, resize_linear_f32};

/// Adaptive seam blender for the overlap band between the canvas and an
/// incoming frame.
///
/// Two independent estimates are computed, a weighted linear blend and a
/// multi-resolution Laplacian-pyramid blend, and mixed by a local
/// texture-complexity score: strongly textured bands lean on the pyramid
/// blend, flat bands on the linear one.
pub struct SeamBlender {
    max_pyramid_levels: usize,
    /// Gradient magnitude mapped to texture score 1.0.
    texture_norm: f32,
}

impl SeamBlender {
    pub fn new() -> Self {
        Self {
            max_pyramid_levels: 4,
            texture_norm: 40.0,
        }
    }

    pub fn with_pyramid_levels(mut self, levels: usize) -> Self {
        self.max_pyramid_levels = levels.max(1);
        self
    }

    /// Blend two equally-shaped interleaved-RGB f32 bands of `height` rows.
    ///
    /// Returns `None` on any shape mismatch; the caller is expected to fall
    /// back to a direct overwrite rather than abort the job.
    pub fn blend(
        &self,
        existing: &[f32],
        incoming: &[f32],
        height: usize,
        width: usize,
    ) -> Option<Vec<f32>> {
        let expected = height * width * 3;
        if expected == 0 || existing.len() != expected || incoming.len() != expected {
            return None;
        }

        let linear = linear_blend(existing, incoming, height, width);
        if height < 8 || width < 8 {
            return Some(clip(linear));
        }

        let pyramid = self.pyramid_blend(existing, incoming, height, width);
        let mix = self.texture_score(existing, incoming, height, width);

        let out = linear
            .iter()
            .zip(pyramid.iter())
            .map(|(&l, &p)| l * (1.0 - mix) + p * mix)
            .collect();
        Some(clip(out))
    }

    /// Mean gradient energy of the band, normalized to [0, 1].
    fn texture_score(&self, a: &[f32], b: &[f32], height: usize, width: usize) -> f32 {
        let luma = |buf: &[f32], x: usize, y: usize| {
            let off = (y * width + x) * 3;
            (buf[off] + buf[off + 1] + buf[off + 2]) / 3.0
        };

        let mut total = 0.0f32;
        let mut count = 0u32;
        for y in 0..height.saturating_sub(1) {
            for x in 0..width.saturating_sub(1) {
                for buf in [a, b] {
                    let v = luma(buf, x, y);
                    let gx = luma(buf, x + 1, y) - v;
                    let gy = luma(buf, x, y + 1) - v;
                    total += (gx * gx + gy * gy).sqrt();
                    count += 1;
                }
            }
        }
        if count == 0 {
            return 0.0;
        }
        (total / count as f32 / self.texture_norm).clamp(0.0, 1.0)
    }

    fn pyramid_blend(
        &self,
        existing: &[f32],
        incoming: &[f32],
        height: usize,
        width: usize,
    ) -> Vec<f32> {
        let levels = pyramid_levels(height, width, self.max_pyramid_levels);

        let mut planes_out: [Vec<f32>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for (c, plane_out) in planes_out.iter_mut().enumerate() {
            let plane_a = extract_plane(existing, c);
            let plane_b = extract_plane(incoming, c);

            let lap_a = laplacian_pyramid(&plane_a, width, height, levels);
            let lap_b = laplacian_pyramid(&plane_b, width, height, levels);

            // Blend each level with the ramp evaluated at level resolution.
            let mut blended: Vec<(Vec<f32>, usize, usize)> = lap_a
                .into_iter()
                .zip(lap_b)
                .map(|((la, w, h), (lb, _, _))| {
                    let mut out = vec![0.0f32; la.len()];
                    for y in 0..h {
                        let wy = smoothstep((y as f32 + 0.5) / h as f32);
                        for x in 0..w {
                            let i = y * w + x;
                            out[i] = la[i] * (1.0 - wy) + lb[i] * wy;
                        }
                    }
                    (out, w, h)
                })
                .collect();

            // Collapse from the coarsest level back up.
            let (mut acc, mut aw, mut ah) = blended.pop().expect("pyramid has levels");
            while let Some((level, lw, lh)) = blended.pop() {
                let up = resize_linear_f32(&acc, aw, ah, lw, lh);
                acc = up.iter().zip(level.iter()).map(|(&u, &l)| u + l).collect();
                aw = lw;
                ah = lh;
            }
            *plane_out = acc;
        }

        merge_planes(&planes_out)
    }
}

impl Default for SeamBlender {
    fn default() -> Self {
        Self::new()
    }
}

/// Smooth monotonic ramp (3t^2 - 2t^3): flat at both ends of the band so
/// the transition carries no visible banding.
fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn linear_blend(existing: &[f32], incoming: &[f32], height: usize, width: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; existing.len()];
    let row_len = width * 3;
    for y in 0..height {
        let w = smoothstep((y as f32 + 0.5) / height as f32);
        let off = y * row_len;
        for i in off..off + row_len {
            out[i] = existing[i] * (1.0 - w) + incoming[i] * w;
        }
    }
    out
}

fn pyramid_levels(height: usize, width: usize, cap: usize) -> usize {
    let mut levels = 1;
    let mut dim = height.min(width);
    while dim >= 16 && levels < cap {
        dim /= 2;
        levels += 1;
    }
    levels
}

fn extract_plane(interleaved: &[f32], channel: usize) -> Vec<f32> {
    interleaved
        .iter()
        .skip(channel)
        .step_by(3)
        .copied()
        .collect()
}

fn merge_planes(planes: &[Vec<f32>; 3]) -> Vec<f32> {
    let mut out = Vec::with_capacity(planes[0].len() * 3);
    for i in 0..planes[0].len() {
        out.push(planes[0][i]);
        out.push(planes[1][i]);
        out.push(planes[2][i]);
    }
    out
}

/// Gaussian pyramid differences; the last entry is the coarsest gaussian
/// level itself. Each entry carries its own (width, height).
fn laplacian_pyramid(
    plane: &[f32],
    width: usize,
    height: usize,
    levels: usize,
) -> Vec<(Vec<f32>, usize, usize)> {
    let mut gaussians = vec![(plane.to_vec(), width, height)];
    for _ in 1..levels {
        let (prev, pw, ph) = gaussians.last().unwrap();
        let (next, nw, nh) = downsample_half_f32(prev, *pw, *ph);
        gaussians.push((next, nw, nh));
    }

    let mut laplacians = Vec::with_capacity(levels);
    for i in 0..gaussians.len() - 1 {
        let (g, gw, gh) = &gaussians[i];
        let (coarser, cw, ch) = &gaussians[i + 1];
        let up = resize_linear_f32(coarser, *cw, *ch, *gw, *gh);
        let lap: Vec<f32> = g.iter().zip(up.iter()).map(|(&a, &b)| a - b).collect();
        laplacians.push((lap, *gw, *gh));
    }
    let (top, tw, th) = gaussians.pop().unwrap();
    laplacians.push((top, tw, th));
    laplacians
}

fn clip(mut buf: Vec<f32>) -> Vec<f32> {
    for v in &mut buf {
        *v = v.clamp(0.0, 255.0);
    }
    buf
}
