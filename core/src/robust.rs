//! Generic RANSAC engine shared by the registration models.

use rand::seq::SliceRandom;

/// Configuration for robust estimation.
#[derive(Debug, Clone)]
pub struct RobustConfig {
    /// Inlier threshold in the model's error units (pixels here).
    pub threshold: f64,
    pub max_iterations: usize,
    /// Target probability of having drawn at least one all-inlier sample;
    /// drives the adaptive iteration cap.
    pub confidence: f64,
    /// Fits whose inlier fraction falls below this are discarded.
    pub min_inlier_ratio: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.99,
            min_inlier_ratio: 0.3,
        }
    }
}

/// Outcome of a robust fit. `model` is `None` when no sample produced a fit
/// clearing `min_inlier_ratio`.
#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
    pub residual: f64,
}

impl<M> RobustResult<M> {
    pub fn empty(n: usize) -> Self {
        Self {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
            residual: f64::INFINITY,
        }
    }

    pub fn inlier_ratio(&self) -> f64 {
        if self.inliers.is_empty() {
            0.0
        } else {
            self.num_inliers as f64 / self.inliers.len() as f64
        }
    }
}

/// A model that can be estimated from a minimal sample and scored per datum.
pub trait RobustModel<D> {
    type Model: Clone;

    fn min_sample_size(&self) -> usize;

    fn estimate(&self, sample: &[&D]) -> Option<Self::Model>;

    fn compute_error(&self, model: &Self::Model, datum: &D) -> f64;
}

/// RANSAC with an adaptive iteration cap: once a good consensus is found,
/// the remaining iteration budget shrinks to what the target confidence
/// still requires.
pub struct Ransac {
    config: RobustConfig,
}

impl Ransac {
    pub fn new(config: RobustConfig) -> Self {
        Self { config }
    }

    pub fn run<D, M: RobustModel<D>>(&self, estimator: &M, data: &[D]) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();

        if n < k {
            return RobustResult::empty(n);
        }

        let mut best: RobustResult<M::Model> = RobustResult::empty(n);
        let mut iteration_cap = self.config.max_iterations;

        let mut rng = rand::thread_rng();
        let mut indices: Vec<usize> = (0..n).collect();

        let mut iteration = 0;
        while iteration < iteration_cap {
            iteration += 1;

            indices.shuffle(&mut rng);
            let sample: Vec<&D> = indices[..k].iter().map(|&i| &data[i]).collect();

            let Some(model) = estimator.estimate(&sample) else {
                continue;
            };

            let mut inliers = vec![false; n];
            let mut num_inliers = 0;
            let mut total_error = 0.0;
            for (j, d) in data.iter().enumerate() {
                let err = estimator.compute_error(&model, d);
                if err < self.config.threshold {
                    inliers[j] = true;
                    num_inliers += 1;
                    total_error += err;
                }
            }

            if num_inliers == 0 {
                continue;
            }
            let residual = total_error / num_inliers as f64;

            if num_inliers > best.num_inliers
                || (num_inliers == best.num_inliers && residual < best.residual)
            {
                best = RobustResult {
                    model: Some(model),
                    inliers,
                    num_inliers,
                    residual,
                };

                let w = num_inliers as f64 / n as f64;
                iteration_cap = iteration_cap.min(required_iterations(
                    w,
                    k,
                    self.config.confidence,
                    self.config.max_iterations,
                ));
            }
        }

        if best.inlier_ratio() < self.config.min_inlier_ratio {
            return RobustResult::empty(n);
        }
        best
    }
}

/// Standard RANSAC iteration count: log(1-p) / log(1-w^k), clamped.
fn required_iterations(inlier_ratio: f64, sample_size: usize, confidence: f64, cap: usize) -> usize {
    if inlier_ratio <= 0.0 {
        return cap;
    }
    let w_k = inlier_ratio.powi(sample_size as i32);
    if w_k >= 1.0 {
        return 1;
    }
    let denom = (1.0 - w_k).ln();
    if denom.abs() < 1e-12 {
        return cap;
    }
    let needed = ((1.0 - confidence).ln() / denom).ceil();
    if needed.is_finite() && needed > 0.0 {
        (needed as usize).min(cap)
    } else {
        cap
    }
}
