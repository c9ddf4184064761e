use bs_core::KeyPoint;
use image::GrayImage;

const CIRCLE_OFFSETS: [(i32, i32); 12] = [
    (-3, 0),
    (-2, 1),
    (-1, 2),
    (0, 3),
    (1, 2),
    (2, 1),
    (3, 0),
    (2, -1),
    (1, -2),
    (0, -3),
    (-1, -2),
    (-2, -1),
];

/// FAST-12 corner detection with response scoring and 3x3 non-maximum
/// suppression. Keypoints are response-ranked before the cap is applied so
/// truncation keeps the strongest corners, not the top-left ones.
pub fn fast_detect(image: &GrayImage, threshold: u8, max_keypoints: usize) -> Vec<KeyPoint> {
    let width = image.width() as i32;
    let height = image.height() as i32;
    if width < 7 || height < 7 {
        return Vec::new();
    }

    let w = width as usize;
    let mut scores = vec![0.0f32; w * height as usize];
    let mut candidates = Vec::new();

    for y in 3..height - 3 {
        for x in 3..width - 3 {
            let score = corner_score(image, x, y, threshold);
            if score > 0.0 {
                scores[y as usize * w + x as usize] = score;
                candidates.push((x, y));
            }
        }
    }

    let mut keypoints: Vec<KeyPoint> = candidates
        .into_iter()
        .filter(|&(x, y)| {
            let s = scores[y as usize * w + x as usize];
            // Local maximum over the 3x3 neighborhood.
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = (x + dx) as usize;
                    let ny = (y + dy) as usize;
                    if scores[ny * w + nx] > s {
                        return false;
                    }
                }
            }
            true
        })
        .map(|(x, y)| {
            KeyPoint::new(x as f64, y as f64)
                .with_response(scores[y as usize * w + x as usize] as f64)
        })
        .collect();

    keypoints.sort_by(|a, b| {
        b.response
            .partial_cmp(&a.response)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    keypoints.truncate(max_keypoints);
    keypoints
}

/// Contiguous-arc corner test; the response is the summed absolute
/// difference of the contiguous segment, zero when not a corner.
fn corner_score(image: &GrayImage, x: i32, y: i32, threshold: u8) -> f32 {
    let p = image.get_pixel(x as u32, y as u32)[0];
    let hi = p.saturating_add(threshold);
    let lo = p.saturating_sub(threshold);

    // -1 darker, 0 similar, 1 brighter; doubled so arcs can wrap.
    let mut states = [0i8; 24];
    let mut diffs = [0.0f32; 24];
    for (i, &(dx, dy)) in CIRCLE_OFFSETS.iter().enumerate() {
        let val = image.get_pixel((x + dx) as u32, (y + dy) as u32)[0];
        let (state, diff) = if val > hi {
            (1, (val - p) as f32)
        } else if val < lo {
            (-1, (p - val) as f32)
        } else {
            (0, 0.0)
        };
        states[i] = state;
        states[i + 12] = state;
        diffs[i] = diff;
        diffs[i + 12] = diff;
    }

    let mut best = 0.0f32;
    for target in [-1i8, 1] {
        let mut run = 0usize;
        let mut run_sum = 0.0f32;
        for i in 0..24 {
            if states[i] == target {
                run += 1;
                run_sum += diffs[i];
                if run >= 9 {
                    best = best.max(run_sum);
                }
            } else {
                run = 0;
                run_sum = 0.0;
            }
        }
    }
    best
}
