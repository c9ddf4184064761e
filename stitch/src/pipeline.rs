use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bs_core::{Error, Frame, KeypointSet, Result};
use bs_features::{FeatureExtractor, FeatureMatcher};
use bs_imgproc::{lucy_richardson, wiener_adaptive};
use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::blend::SeamBlender;
use crate::canvas::CanvasCompositor;
use crate::motion::{MotionEstimator, RegistrationKind};
use crate::pattern::{analyze_motion, MotionProfile};
use crate::post::PostProcessor;

/// Defocus-compensation algorithm for the optional pre-stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefocusMethod {
    /// Adaptive local Wiener filter.
    Wiener,
    /// Iterative Lucy-Richardson deconvolution.
    LucyRichardson,
}

#[derive(Debug, Clone)]
pub struct DeblurConfig {
    pub method: DefocusMethod,
    /// Gaussian PSF sigma for deconvolution.
    pub psf_sigma: f32,
    pub iterations: u32,
    /// Local window for the Wiener filter.
    pub window: u32,
    pub noise_ratio: f32,
}

impl Default for DeblurConfig {
    fn default() -> Self {
        Self {
            method: DefocusMethod::Wiener,
            psf_sigma: 1.5,
            iterations: 10,
            window: 5,
            noise_ratio: 0.01,
        }
    }
}

/// Pipeline tuning knobs. Defaults match a forward-scanned bore captured at
/// a few pixels of travel per frame.
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// Frames must keep at least this many rows in common with their
    /// predecessor; larger recovered offsets are treated as misregistrations.
    pub min_overlap_px: u32,
    /// Expected per-pair displacement, substituted when a pair yields no
    /// registration evidence at all.
    pub overlap_hint_px: Option<f64>,
    /// Retain per-pair diagnostics on the output.
    pub save_intermediate: bool,
    /// Motion-pattern classification threshold.
    pub motion_threshold_px: f64,
    /// Flip the recovered vertical translation into canvas direction.
    pub invert_motion_sign: bool,
    pub canvas_margin: usize,
    pub min_blend_overlap: usize,
    pub deblur: Option<DeblurConfig>,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            min_overlap_px: 300,
            overlap_hint_px: None,
            save_intermediate: false,
            motion_threshold_px: 5.0,
            invert_motion_sign: true,
            canvas_margin: 200,
            min_blend_overlap: 10,
            deblur: None,
        }
    }
}

/// Per-pair registration record, retained when `save_intermediate` is set.
#[derive(Debug, Clone)]
pub struct PairDiagnostic {
    pub kind: RegistrationKind,
    pub confidence: f64,
    pub relative_offset: f64,
}

#[derive(Debug, Clone)]
pub struct StitchOutput {
    pub panorama: image::RgbImage,
    /// Canvas row each input frame landed on, index-aligned with the input.
    pub offsets: Vec<f64>,
    pub profile: MotionProfile,
    pub skipped_frames: Vec<usize>,
    pub diagnostics: Option<Vec<PairDiagnostic>>,
}

/// Cooperative cancellation handle, checked between frame pairs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// End-to-end sequential stitcher.
///
/// Extraction runs across frames in parallel; registration, pattern
/// analysis, compositing, and post-processing follow sequentially. Only an
/// empty input, a caller buffer contract violation, or cancellation fail the
/// job; every registration problem degrades to a weaker fallback instead.
pub struct StitchPipeline {
    config: StitchConfig,
    extractor: FeatureExtractor,
    matcher: FeatureMatcher,
    estimator: MotionEstimator,
    blender: SeamBlender,
    post: PostProcessor,
}

impl StitchPipeline {
    pub fn new(config: StitchConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::default(),
            matcher: FeatureMatcher::default(),
            estimator: MotionEstimator::default(),
            blender: SeamBlender::default(),
            post: PostProcessor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_estimator(mut self, estimator: MotionEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn run(&self, frames: &[Frame]) -> Result<StitchOutput> {
        self.run_with_cancel(frames, &CancelToken::new())
    }

    pub fn run_with_cancel(&self, frames: &[Frame], cancel: &CancelToken) -> Result<StitchOutput> {
        if frames.is_empty() {
            return Err(Error::EmptyInput);
        }

        let deblurred;
        let frames: &[Frame] = match &self.config.deblur {
            Some(cfg) => {
                deblurred = self.deblur_frames(frames, cfg);
                &deblurred
            }
            None => frames,
        };

        if frames.len() == 1 {
            debug!("single frame input, passing through");
            return Ok(StitchOutput {
                panorama: frames[0].as_rgb().clone(),
                offsets: vec![0.0],
                profile: MotionProfile::InsufficientData,
                skipped_frames: Vec::new(),
                diagnostics: self.config.save_intermediate.then(Vec::new),
            });
        }

        let grays: Vec<GrayImage> = frames.iter().map(Frame::to_gray).collect();
        let keypoint_sets: Vec<KeypointSet> = grays
            .par_iter()
            .map(|g| self.extractor.extract(g))
            .collect();
        info!(
            frames = frames.len(),
            keypoints = keypoint_sets.iter().map(KeypointSet::len).sum::<usize>(),
            "feature extraction complete"
        );

        let mut relative = Vec::with_capacity(frames.len() - 1);
        let mut confidences = Vec::with_capacity(frames.len());
        let mut diagnostics = self
            .config
            .save_intermediate
            .then(|| Vec::with_capacity(frames.len() - 1));
        confidences.push(1.0);

        for i in 1..frames.len() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let matches = self.matcher.match_sets(&keypoint_sets[i - 1], &keypoint_sets[i]);
            let mut reg = self.estimator.estimate(&matches, &grays[i - 1], &grays[i]);
            let mut rel = reg.vertical_offset(self.config.invert_motion_sign);

            if reg.kind == RegistrationKind::ZeroFallback {
                if let Some(hint) = self.config.overlap_hint_px {
                    debug!(pair = i, hint, "substituting overlap hint for failed pair");
                    rel = hint;
                    reg.confidence = 0.1;
                }
            }

            // A displacement leaving less than the required overlap cannot
            // come from a contiguous scan; treat it as a misregistration.
            let frame_h = frames[i].height();
            if frame_h > self.config.min_overlap_px
                && rel.abs() > (frame_h - self.config.min_overlap_px) as f64
            {
                warn!(
                    pair = i,
                    offset = rel,
                    "recovered offset leaves too little overlap, zeroing"
                );
                rel = 0.0;
                reg.confidence = 0.0;
            }

            if let Some(diags) = diagnostics.as_mut() {
                diags.push(PairDiagnostic {
                    kind: reg.kind,
                    confidence: reg.confidence,
                    relative_offset: rel,
                });
            }
            confidences.push(reg.confidence);
            relative.push(rel);
        }

        let analysis = analyze_motion(&relative, self.config.motion_threshold_px);
        info!(profile = ?analysis.profile, onset = ?analysis.onset_index, "motion classified");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let compositor = CanvasCompositor::new()
            .with_margin(self.config.canvas_margin)
            .with_min_blend_overlap(self.config.min_blend_overlap);
        let composition =
            compositor.compose(frames, &analysis.canvas_offsets, &confidences, &self.blender)?;

        let panorama = self.post.process(&composition.image);

        Ok(StitchOutput {
            panorama,
            offsets: composition.placements,
            profile: analysis.profile,
            skipped_frames: composition.skipped,
            diagnostics,
        })
    }

    fn deblur_frames(&self, frames: &[Frame], cfg: &DeblurConfig) -> Vec<Frame> {
        frames
            .par_iter()
            .map(|f| {
                let restored = match cfg.method {
                    DefocusMethod::Wiener => {
                        wiener_adaptive(f.as_rgb(), cfg.window, cfg.noise_ratio)
                    }
                    DefocusMethod::LucyRichardson => {
                        lucy_richardson(f.as_rgb(), cfg.psf_sigma, cfg.iterations)
                    }
                };
                Frame::from_rgb(restored)
            })
            .collect()
    }
}
