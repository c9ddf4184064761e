use crate::brief::Brief;
use crate::fast::fast_detect;
use bs_core::KeypointSet;
use bs_imgproc::{clahe, gaussian_blur};
use image::GrayImage;

/// One detection backend, selected once when the extractor is built.
pub trait FeatureDetector: Send + Sync {
    fn detect_and_describe(&self, image: &GrayImage) -> KeypointSet;
}

/// Available detector backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    FastBrief,
}

/// FAST corners + BRIEF descriptors.
pub struct FastBrief {
    fast_threshold: u8,
    max_keypoints: usize,
    brief: Brief,
}

impl FastBrief {
    pub fn new(fast_threshold: u8, max_keypoints: usize, descriptor_bytes: usize) -> Self {
        Self {
            fast_threshold,
            // Too few keypoints starves registration, too many drowns the
            // matcher; the cap is held to a sane operating range.
            max_keypoints: max_keypoints.clamp(2000, 8000),
            brief: Brief::new(descriptor_bytes),
        }
    }
}

impl FeatureDetector for FastBrief {
    fn detect_and_describe(&self, image: &GrayImage) -> KeypointSet {
        let keypoints = fast_detect(image, self.fast_threshold, self.max_keypoints);
        if keypoints.is_empty() {
            return KeypointSet::new();
        }

        // Descriptors sample a smoothed copy; detection runs on the crisp one.
        let smoothed = gaussian_blur(image, 1.2);
        let descriptors = self.brief.compute(&smoothed, &keypoints);

        let mut set = KeypointSet::with_capacity(keypoints.len());
        for (kp, desc) in keypoints.into_iter().zip(descriptors) {
            set.push(kp, desc);
        }
        set
    }
}

/// Per-frame feature extraction: contrast normalization, then the selected
/// detector. An empty result is a valid outcome (featureless bore wall),
/// reported as an empty set rather than an error.
pub struct FeatureExtractor {
    detector: Box<dyn FeatureDetector>,
    clahe_clip: f32,
    clahe_tiles: (u32, u32),
}

impl FeatureExtractor {
    pub fn new(kind: DetectorKind) -> Self {
        let detector: Box<dyn FeatureDetector> = match kind {
            DetectorKind::FastBrief => Box::new(FastBrief::new(20, 4000, 32)),
        };
        Self {
            detector,
            clahe_clip: 2.0,
            clahe_tiles: (8, 8),
        }
    }

    pub fn with_detector(mut self, detector: Box<dyn FeatureDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_clahe(mut self, clip: f32, tiles_x: u32, tiles_y: u32) -> Self {
        self.clahe_clip = clip;
        self.clahe_tiles = (tiles_x, tiles_y);
        self
    }

    pub fn extract(&self, image: &GrayImage) -> KeypointSet {
        if image.width() == 0 || image.height() == 0 {
            return KeypointSet::new();
        }
        let normalized = clahe(
            image,
            self.clahe_clip,
            self.clahe_tiles.0,
            self.clahe_tiles.1,
        );
        self.detector.detect_and_describe(&normalized)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DetectorKind::FastBrief)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn featureless_frame_yields_empty_set() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        let set = FeatureExtractor::default().extract(&img);
        assert!(set.is_empty());
    }

    #[test]
    fn textured_frame_yields_described_keypoints() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([40]));
        for y in (8..56).step_by(12) {
            for x in (8..56).step_by(12) {
                for dy in 0..6 {
                    for dx in 0..6 {
                        img.put_pixel(x + dx, y + dy, Luma([230]));
                    }
                }
            }
        }

        let set = FeatureExtractor::default().extract(&img);
        assert!(!set.is_empty());
        assert_eq!(set.points().len(), set.descriptors().len());
    }

    #[test]
    fn empty_image_is_tolerated() {
        let img = GrayImage::new(0, 0);
        assert!(FeatureExtractor::default().extract(&img).is_empty());
    }
}
