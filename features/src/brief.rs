use bs_core::{Descriptor, KeyPoint};
use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PATCH_SIZE: i32 = 48;
const PATTERN_SEED: u64 = 0x5eed_b41f;

/// BRIEF binary descriptor with a fixed, seeded comparison pattern so the
/// same keypoint always yields the same descriptor across runs.
pub struct Brief {
    bytes: usize,
    pattern: Vec<[(i32, i32); 2]>,
}

impl Brief {
    pub fn new(bytes: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let half = PATCH_SIZE / 2;
        let pattern = (0..bytes * 8)
            .map(|_| {
                [
                    (rng.gen_range(-half..half), rng.gen_range(-half..half)),
                    (rng.gen_range(-half..half), rng.gen_range(-half..half)),
                ]
            })
            .collect();

        Self { bytes, pattern }
    }

    pub fn descriptor_bytes(&self) -> usize {
        self.bytes
    }

    /// Compute descriptors for all keypoints. The input image should already
    /// be smoothed; comparisons additionally average a 3x3 patch to damp
    /// pixel noise.
    pub fn compute(&self, image: &GrayImage, keypoints: &[KeyPoint]) -> Vec<Descriptor> {
        keypoints
            .iter()
            .map(|kp| self.compute_single(image, kp))
            .collect()
    }

    fn compute_single(&self, image: &GrayImage, kp: &KeyPoint) -> Descriptor {
        let x = kp.x.round() as i32;
        let y = kp.y.round() as i32;

        let mut data = vec![0u8; self.bytes];
        for (i, pair) in self.pattern.iter().enumerate() {
            let v1 = mean_3x3(image, x + pair[0].0, y + pair[0].1);
            let v2 = mean_3x3(image, x + pair[1].0, y + pair[1].1);
            if v1 > v2 {
                data[i / 8] |= 1 << (i % 8);
            }
        }
        Descriptor::new(data)
    }
}

impl Default for Brief {
    fn default() -> Self {
        Self::new(32)
    }
}

fn mean_3x3(image: &GrayImage, x: i32, y: i32) -> f32 {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let mut sum = 0.0f32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let px = (x + dx).clamp(0, width - 1);
            let py = (y + dy).clamp(0, height - 1);
            sum += image.get_pixel(px as u32, py as u32)[0] as f32;
        }
    }
    sum / 9.0
}
