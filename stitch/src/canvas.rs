use bs_core::{Error, Frame, Result};
use image::RgbImage;
use tracing::{debug, warn};

use crate::blend::SeamBlender;

/// Result of compositing a frame sequence onto a shared canvas.
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: RgbImage,
    /// Actual canvas row each frame landed on. Skipped frames keep their
    /// requested row so indices stay aligned with the input sequence.
    pub placements: Vec<f64>,
    /// Indices of frames dropped for falling outside the canvas.
    pub skipped: Vec<usize>,
}

/// Places frames top-down on an exclusively-owned float canvas.
///
/// The canvas is allocated once with a safety margin below the deepest
/// predicted placement; frames that still land outside it are logged and
/// skipped rather than failing the job. Overlap bands wider than
/// `min_blend_overlap` are handed to the [`SeamBlender`]; narrower ones are
/// overwritten directly.
pub struct CanvasCompositor {
    margin: usize,
    min_blend_overlap: usize,
    /// Placements at or below this confidence that fall entirely inside the
    /// already-filled region are re-anchored at the filled extent instead.
    low_confidence: f64,
}

impl CanvasCompositor {
    pub fn new() -> Self {
        Self {
            margin: 200,
            min_blend_overlap: 10,
            low_confidence: 0.05,
        }
    }

    pub fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_min_blend_overlap(mut self, rows: usize) -> Self {
        self.min_blend_overlap = rows;
        self
    }

    /// Composite `frames` at the given per-frame canvas rows.
    ///
    /// `offsets` and `confidences` must be index-aligned with `frames`;
    /// frame 0 defines the canvas origin and is always placed directly.
    pub fn compose(
        &self,
        frames: &[Frame],
        offsets: &[f64],
        confidences: &[f64],
        blender: &SeamBlender,
    ) -> Result<Composition> {
        if frames.is_empty() {
            return Err(Error::EmptyInput);
        }
        if offsets.len() != frames.len() || confidences.len() != frames.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} frames but {} offsets and {} confidences",
                frames.len(),
                offsets.len(),
                confidences.len()
            )));
        }

        let canvas_w = frames.iter().map(|f| f.width() as usize).max().unwrap_or(0);
        let deepest = frames
            .iter()
            .zip(offsets)
            .map(|(f, o)| o.round().max(0.0) as usize + f.height() as usize)
            .max()
            .unwrap_or(0);
        let canvas_h = deepest + self.margin;

        let mut canvas = vec![0.0f32; canvas_h * canvas_w * 3];
        let mut filled = 0usize;
        let mut placements = Vec::with_capacity(frames.len());
        let mut skipped = Vec::new();

        for (i, (frame, (&offset, &confidence))) in frames
            .iter()
            .zip(offsets.iter().zip(confidences.iter()))
            .enumerate()
        {
            let fh = frame.height() as usize;
            let fw = frame.width() as usize;
            let mut y0 = offset.round() as i64;

            // A zero-information registration that would bury the frame
            // inside already-composited rows carries no real placement
            // evidence; stack it below the filled extent instead.
            if i > 0
                && confidence <= self.low_confidence
                && y0 >= 0
                && (y0 as usize + fh) <= filled
            {
                debug!(frame = i, "re-anchoring low-confidence placement below filled rows");
                y0 = filled as i64;
            }

            if y0 < 0 || y0 as usize + fh > canvas_h {
                warn!(
                    frame = i,
                    row = y0,
                    canvas_rows = canvas_h,
                    "placement outside canvas, skipping frame"
                );
                placements.push(offset);
                skipped.push(i);
                continue;
            }
            let y0 = y0 as usize;

            let overlap = filled.saturating_sub(y0).min(fh);
            if overlap > self.min_blend_overlap {
                let existing = copy_band(&canvas, canvas_w, y0, overlap, fw);
                let incoming = frame_band(frame, 0, overlap);
                match blender.blend(&existing, &incoming, overlap, fw) {
                    Some(blended) => {
                        paste_band(&mut canvas, canvas_w, y0, fw, &blended);
                    }
                    None => {
                        warn!(frame = i, "seam blend rejected band, overwriting");
                        paste_band(&mut canvas, canvas_w, y0, fw, &incoming);
                    }
                }
                let fresh = frame_band(frame, overlap, fh - overlap);
                paste_band(&mut canvas, canvas_w, y0 + overlap, fw, &fresh);
            } else {
                let all = frame_band(frame, 0, fh);
                paste_band(&mut canvas, canvas_w, y0, fw, &all);
            }

            filled = filled.max(y0 + fh);
            placements.push(y0 as f64);
        }

        // Trim to the rows actually written; the margin is assembly slack.
        let out_h = filled.max(1);
        let mut image = RgbImage::new(canvas_w as u32, out_h as u32);
        for (i, px) in image.pixels_mut().enumerate() {
            let off = i * 3;
            px.0 = [
                canvas[off].round().clamp(0.0, 255.0) as u8,
                canvas[off + 1].round().clamp(0.0, 255.0) as u8,
                canvas[off + 2].round().clamp(0.0, 255.0) as u8,
            ];
        }

        Ok(Composition {
            image,
            placements,
            skipped,
        })
    }
}

impl Default for CanvasCompositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame rows [row0, row0 + rows) as an interleaved f32 band.
fn frame_band(frame: &Frame, row0: usize, rows: usize) -> Vec<f32> {
    let fw = frame.width() as usize;
    let rgb = frame.as_rgb();
    let start = row0 * fw * 3;
    let end = (row0 + rows) * fw * 3;
    rgb.as_raw()[start..end].iter().map(|&v| v as f32).collect()
}

fn copy_band(canvas: &[f32], canvas_w: usize, y0: usize, rows: usize, cols: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(rows * cols * 3);
    for y in y0..y0 + rows {
        let off = y * canvas_w * 3;
        out.extend_from_slice(&canvas[off..off + cols * 3]);
    }
    out
}

fn paste_band(canvas: &mut [f32], canvas_w: usize, y0: usize, cols: usize, band: &[f32]) {
    let rows = band.len() / (cols * 3);
    for y in 0..rows {
        let dst = (y0 + y) * canvas_w * 3;
        let src = y * cols * 3;
        canvas[dst..dst + cols * 3].copy_from_slice(&band[src..src + cols * 3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::from_rgb(RgbImage::from_pixel(width, height, Rgb([value; 3])))
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let compositor = CanvasCompositor::new();
        let err = compositor
            .compose(&[], &[], &[], &SeamBlender::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn misaligned_offsets_are_rejected() {
        let compositor = CanvasCompositor::new();
        let frames = [flat_frame(8, 8, 100)];
        let err = compositor
            .compose(&frames, &[0.0, 1.0], &[1.0], &SeamBlender::new())
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn single_frame_fills_its_own_extent() {
        let compositor = CanvasCompositor::new();
        let frames = [flat_frame(12, 20, 90)];
        let comp = compositor
            .compose(&frames, &[0.0], &[1.0], &SeamBlender::new())
            .unwrap();

        assert_eq!(comp.image.dimensions(), (12, 20));
        assert_eq!(comp.placements, vec![0.0]);
        assert!(comp.skipped.is_empty());
        assert_eq!(comp.image.get_pixel(5, 10).0, [90, 90, 90]);
    }

    #[test]
    fn overlapping_frames_blend_the_band() {
        let compositor = CanvasCompositor::new();
        let frames = [flat_frame(16, 40, 60), flat_frame(16, 40, 180)];
        let comp = compositor
            .compose(&frames, &[0.0, 20.0], &[1.0, 1.0], &SeamBlender::new())
            .unwrap();

        assert_eq!(comp.image.height(), 60);
        // Above the band: pure first frame. Below: pure second.
        assert_eq!(comp.image.get_pixel(8, 5).0, [60, 60, 60]);
        assert_eq!(comp.image.get_pixel(8, 55).0, [180, 180, 180]);
        // Inside the 20-row band the value transitions.
        let mid = comp.image.get_pixel(8, 30).0[0];
        assert!(mid > 60 && mid < 180, "band value {mid} did not blend");
    }

    #[test]
    fn thin_overlap_is_overwritten_not_blended() {
        let compositor = CanvasCompositor::new();
        let frames = [flat_frame(16, 30, 50), flat_frame(16, 30, 200)];
        // 5-row overlap, below the 10-row blend minimum.
        let comp = compositor
            .compose(&frames, &[0.0, 25.0], &[1.0, 1.0], &SeamBlender::new())
            .unwrap();

        assert_eq!(comp.image.height(), 55);
        assert_eq!(comp.image.get_pixel(8, 26).0, [200, 200, 200]);
    }

    #[test]
    fn out_of_bounds_frame_is_skipped() {
        let compositor = CanvasCompositor::new().with_margin(10);
        let frames = [flat_frame(16, 30, 50), flat_frame(16, 30, 200)];
        let comp = compositor
            .compose(&frames, &[0.0, -50.0], &[1.0, 1.0], &SeamBlender::new())
            .unwrap();

        assert_eq!(comp.skipped, vec![1]);
        assert_eq!(comp.placements, vec![0.0, -50.0]);
        // Only the first frame contributes rows.
        assert_eq!(comp.image.height(), 30);
    }

    #[test]
    fn low_confidence_full_overlap_stacks_below() {
        let compositor = CanvasCompositor::new();
        let frames = [flat_frame(16, 30, 50), flat_frame(16, 30, 200)];
        // Zero offset with no registration evidence: second frame would be
        // buried in the first, so it is appended after it instead.
        let comp = compositor
            .compose(&frames, &[0.0, 0.0], &[1.0, 0.0], &SeamBlender::new())
            .unwrap();

        assert_eq!(comp.placements, vec![0.0, 30.0]);
        assert_eq!(comp.image.height(), 60);
        assert_eq!(comp.image.get_pixel(8, 10).0, [50, 50, 50]);
        assert_eq!(comp.image.get_pixel(8, 45).0, [200, 200, 200]);
    }

    #[test]
    fn confident_zero_offset_overlaps_in_place() {
        let compositor = CanvasCompositor::new();
        let frames = [flat_frame(16, 30, 50), flat_frame(16, 30, 50)];
        let comp = compositor
            .compose(&frames, &[0.0, 0.0], &[1.0, 0.9], &SeamBlender::new())
            .unwrap();

        assert_eq!(comp.placements, vec![0.0, 0.0]);
        assert_eq!(comp.image.height(), 30);
    }
}
