use bs_core::{
    Correspondence, MatchSet, Ransac, RobustConfig, RobustModel, Transform2D, TransformLimits,
};
use bs_imgproc::{match_template, min_max_loc, TemplateMatchMethod};
use image::GrayImage;

/// Which layer of the fallback chain produced the pair transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    /// Similarity fit survived RANSAC and the plausibility gate.
    Affine,
    /// Pure-translation consensus.
    Translation,
    /// Correlation of an image band recovered a vertical offset.
    TemplateMatch,
    /// Nothing worked; zero offset keeps the pipeline moving.
    ZeroFallback,
}

/// Registration outcome for one frame pair. Always produced; degradation
/// shows up as a weaker `kind` and lower `confidence`, never as an error.
#[derive(Debug, Clone)]
pub struct PairRegistration {
    pub transform: Transform2D,
    pub kind: RegistrationKind,
    pub confidence: f64,
}

impl PairRegistration {
    pub fn zero() -> Self {
        Self {
            transform: Transform2D::identity(),
            kind: RegistrationKind::ZeroFallback,
            confidence: 0.0,
        }
    }

    /// Vertical canvas displacement contributed by this pair.
    ///
    /// The sign flip is the rig convention: the probe advancing must push
    /// the next frame further down the canvas whatever direction the raw
    /// pixel motion had.
    pub fn vertical_offset(&self, invert_sign: bool) -> f64 {
        if invert_sign {
            -self.transform.ty()
        } else {
            self.transform.ty()
        }
    }
}

/// Similarity transform (uniform scale + rotation + translation) from two
/// point correspondences.
struct SimilarityModel;

impl RobustModel<Correspondence> for SimilarityModel {
    type Model = Transform2D;

    fn min_sample_size(&self) -> usize {
        2
    }

    fn estimate(&self, sample: &[&Correspondence]) -> Option<Transform2D> {
        let a = sample[0];
        let b = sample[1];

        let (sx1, sy1) = a.src;
        let (sx2, sy2) = b.src;
        let (dx1, dy1) = a.dst;
        let (dx2, dy2) = b.dst;

        let src_dx = sx2 - sx1;
        let src_dy = sy2 - sy1;
        let dst_dx = dx2 - dx1;
        let dst_dy = dy2 - dy1;

        let src_len = (src_dx * src_dx + src_dy * src_dy).sqrt();
        if src_len < 1e-6 {
            return None;
        }
        let dst_len = (dst_dx * dst_dx + dst_dy * dst_dy).sqrt();
        if dst_len < 1e-6 {
            return None;
        }

        // Transform maps frame-B coordinates onto frame A: dst -> src.
        let scale = src_len / dst_len;
        let angle = src_dy.atan2(src_dx) - dst_dy.atan2(dst_dx);

        let (sin, cos) = angle.sin_cos();
        let tx = sx1 - scale * (cos * dx1 - sin * dy1);
        let ty = sy1 - scale * (sin * dx1 + cos * dy1);

        Some(Transform2D::from_similarity(scale, angle, tx, ty))
    }

    fn compute_error(&self, model: &Transform2D, datum: &Correspondence) -> f64 {
        let (px, py) = model.apply(datum.dst.0, datum.dst.1);
        (px - datum.src.0).hypot(py - datum.src.1)
    }
}

/// Pure vertical/horizontal translation from one correspondence.
struct TranslationModel;

impl RobustModel<Correspondence> for TranslationModel {
    type Model = Transform2D;

    fn min_sample_size(&self) -> usize {
        1
    }

    fn estimate(&self, sample: &[&Correspondence]) -> Option<Transform2D> {
        let c = sample[0];
        Some(Transform2D::from_translation(
            c.src.0 - c.dst.0,
            c.src.1 - c.dst.1,
        ))
    }

    fn compute_error(&self, model: &Transform2D, datum: &Correspondence) -> f64 {
        let (px, py) = model.apply(datum.dst.0, datum.dst.1);
        (px - datum.src.0).hypot(py - datum.src.1)
    }
}

/// Robust frame-pair motion estimator: similarity RANSAC, then translation
/// consensus, then band correlation, then zero offset.
pub struct MotionEstimator {
    ransac_config: RobustConfig,
    translation_iterations: usize,
    min_matches: usize,
    limits: TransformLimits,
    /// Below this correlation score the template search widens to the
    /// top/bottom bands.
    template_retry_below: f32,
    /// Below this final correlation score the offset defaults to zero.
    template_accept_floor: f32,
}

impl MotionEstimator {
    pub fn new() -> Self {
        Self {
            ransac_config: RobustConfig {
                threshold: 3.0,
                max_iterations: 2000,
                confidence: 0.99,
                min_inlier_ratio: 0.3,
            },
            translation_iterations: 1000,
            min_matches: 10,
            limits: TransformLimits::default(),
            template_retry_below: 0.3,
            template_accept_floor: 0.25,
        }
    }

    pub fn with_limits(mut self, limits: TransformLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_ransac_config(mut self, config: RobustConfig) -> Self {
        self.ransac_config = config;
        self
    }

    /// Estimate the transform mapping `frame_b` onto `frame_a`.
    pub fn estimate(
        &self,
        matches: &MatchSet,
        frame_a: &GrayImage,
        frame_b: &GrayImage,
    ) -> PairRegistration {
        if matches.len() < self.min_matches {
            tracing::debug!(
                matches = matches.len(),
                "too few correspondences, going straight to template matching"
            );
            return self.template_fallback(frame_a, frame_b);
        }

        if let Some(reg) = self.fit_similarity(matches) {
            return reg;
        }
        if let Some(reg) = self.fit_translation(matches) {
            return reg;
        }
        self.template_fallback(frame_a, frame_b)
    }

    fn fit_similarity(&self, matches: &MatchSet) -> Option<PairRegistration> {
        let result = Ransac::new(self.ransac_config.clone())
            .run(&SimilarityModel, &matches.correspondences);

        let transform = result.model?;
        if !transform.is_plausible(&self.limits) {
            tracing::debug!(
                ty = transform.ty(),
                "similarity fit rejected by plausibility gate"
            );
            return None;
        }

        Some(PairRegistration {
            transform,
            kind: RegistrationKind::Affine,
            confidence: result.inlier_ratio(),
        })
    }

    fn fit_translation(&self, matches: &MatchSet) -> Option<PairRegistration> {
        let config = RobustConfig {
            threshold: self.ransac_config.threshold,
            max_iterations: self.translation_iterations,
            confidence: self.ransac_config.confidence,
            // Acceptance is the explicit inlier-count rule below.
            min_inlier_ratio: 0.0,
        };
        let result = Ransac::new(config).run(&TranslationModel, &matches.correspondences);

        let transform = result.model?;
        let required = 3.max(matches.len() / 5);
        if result.num_inliers < required {
            tracing::debug!(
                inliers = result.num_inliers,
                required,
                "translation consensus too small"
            );
            return None;
        }

        Some(PairRegistration {
            transform,
            kind: RegistrationKind::Translation,
            confidence: result.inlier_ratio(),
        })
    }

    /// Correlate a band of frame A against the whole of frame B to recover
    /// a vertical offset when feature registration failed.
    fn template_fallback(&self, frame_a: &GrayImage, frame_b: &GrayImage) -> PairRegistration {
        let h = frame_a.height();
        let w = frame_a.width();
        if h < 10 || w < 10 || frame_b.width() < w {
            return PairRegistration::zero();
        }

        // Central 60% band first; top/bottom 40% bands on a weak response.
        let central = (h / 5, h * 3 / 5);
        let mut best = self.correlate_band(frame_a, frame_b, central.0, central.1);

        if best.map_or(true, |(_, conf)| conf < self.template_retry_below) {
            for (y0, bh) in [(0, h * 2 / 5), (h * 3 / 5, h * 2 / 5)] {
                let candidate = self.correlate_band(frame_a, frame_b, y0, bh);
                match (best, candidate) {
                    (None, Some(_)) => best = candidate,
                    (Some((_, bc)), Some((_, cc))) if cc > bc => best = candidate,
                    _ => {}
                }
            }
        }

        match best {
            Some((ty, conf)) if conf >= self.template_accept_floor => PairRegistration {
                transform: Transform2D::from_translation(0.0, ty),
                kind: RegistrationKind::TemplateMatch,
                confidence: conf as f64,
            },
            _ => PairRegistration::zero(),
        }
    }

    fn correlate_band(
        &self,
        frame_a: &GrayImage,
        frame_b: &GrayImage,
        band_y0: u32,
        band_h: u32,
    ) -> Option<(f64, f32)> {
        if band_h == 0 || band_y0 + band_h > frame_a.height() || band_h > frame_b.height() {
            return None;
        }

        let templ =
            image::imageops::crop_imm(frame_a, 0, band_y0, frame_a.width(), band_h).to_image();
        let result = match_template(frame_b, &templ, TemplateMatchMethod::CcoeffNormed);
        let (_min, max) = min_max_loc(&result);

        // Band content sits at band_y0 in A and was found at max.1 in B, so
        // mapping B onto A shifts by the difference.
        let ty = band_y0 as f64 - max.1 as f64;
        Some((ty, max.2))
    }
}

impl Default for MotionEstimator {
    fn default() -> Self {
        Self::new()
    }
}
