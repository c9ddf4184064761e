use nalgebra::{Matrix3, Vector3};

/// Plausibility bounds for a recovered frame-pair transform.
///
/// The scale window and the vertical-translation window come from the
/// physical rig: a probe sliding axially through a bore can neither rescale
/// the wall texture much nor jump hundreds of pixels between frames.
#[derive(Debug, Clone, Copy)]
pub struct TransformLimits {
    pub scale_min: f64,
    pub scale_max: f64,
    pub ty_abs_min: f64,
    pub ty_abs_max: f64,
}

impl Default for TransformLimits {
    fn default() -> Self {
        Self {
            scale_min: 0.8,
            scale_max: 1.2,
            ty_abs_min: 0.1,
            ty_abs_max: 200.0,
        }
    }
}

/// Homogeneous 2D transform mapping frame-B coordinates onto frame A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    m: Matrix3<f64>,
}

impl Transform2D {
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    pub fn from_translation(tx: f64, ty: f64) -> Self {
        let mut m = Matrix3::identity();
        m[(0, 2)] = tx;
        m[(1, 2)] = ty;
        Self { m }
    }

    /// Similarity transform: uniform scale, rotation, translation.
    pub fn from_similarity(scale: f64, angle: f64, tx: f64, ty: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let m = Matrix3::new(
            scale * c,
            -scale * s,
            tx,
            scale * s,
            scale * c,
            ty,
            0.0,
            0.0,
            1.0,
        );
        Self { m }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    pub fn tx(&self) -> f64 {
        self.m[(0, 2)]
    }

    pub fn ty(&self) -> f64 {
        self.m[(1, 2)]
    }

    /// Per-axis scale factors: column norms of the upper-left 2x2 block.
    pub fn scale_factors(&self) -> (f64, f64) {
        let sx = (self.m[(0, 0)].powi(2) + self.m[(1, 0)].powi(2)).sqrt();
        let sy = (self.m[(0, 1)].powi(2) + self.m[(1, 1)].powi(2)).sqrt();
        (sx, sy)
    }

    pub fn is_invertible(&self) -> bool {
        self.m.determinant().abs() > 1e-9
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.m * Vector3::new(x, y, 1.0);
        if p[2].abs() > 1e-12 {
            (p[0] / p[2], p[1] / p[2])
        } else {
            (f64::INFINITY, f64::INFINITY)
        }
    }

    /// Validity gate from the registration contract: both axis scales inside
    /// the window, invertible, vertical translation magnitude inside
    /// `(ty_abs_min, ty_abs_max)`.
    pub fn is_plausible(&self, limits: &TransformLimits) -> bool {
        if !self.is_invertible() {
            return false;
        }
        let (sx, sy) = self.scale_factors();
        if sx < limits.scale_min
            || sx > limits.scale_max
            || sy < limits.scale_min
            || sy > limits.scale_max
        {
            return false;
        }
        let ty = self.ty().abs();
        ty > limits.ty_abs_min && ty < limits.ty_abs_max
    }
}
