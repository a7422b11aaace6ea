#![warn(missing_docs)]

//! Math types for the cncsim machining simulator.
//!
//! Thin wrappers around nalgebra providing the point and vector types used
//! by the motion engine and the stock model, a 4x4 homogeneous transform,
//! and tolerance constants.

use nalgebra::{Matrix4, Vector3, Vector4};

/// A point in 3D space (millimetres).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Smallest `|w|` accepted by the homogeneous divide.
const W_EPSILON: f64 = 1e-12;

/// A 4x4 homogeneous transform.
///
/// Points are transformed as column vectors `(x, y, z, 1)`; the first three
/// components of the product are divided by the fourth. Only translation is
/// used by the motion engine, but the divide keeps projective matrices valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    /// The underlying 4x4 matrix (translation in column 3).
    pub matrix: Matrix4<f64>,
}

impl Affine {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap an arbitrary 4x4 matrix.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Translation by a vector.
    pub fn translation_vec(v: &Vec3) -> Self {
        Self::translation(v.x, v.y, v.z)
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Affine) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point, including the homogeneous divide.
    ///
    /// Returns `None` when the resulting `w` component is zero, which would
    /// otherwise produce infinite coordinates.
    pub fn apply_point(&self, p: &Point3) -> Option<Point3> {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        if v.w.abs() < W_EPSILON {
            return None;
        }
        Some(Point3::new(v.x / v.w, v.y / v.w, v.z / v.w))
    }

    /// The translation part of the matrix.
    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(
            self.matrix[(0, 3)],
            self.matrix[(1, 3)],
            self.matrix[(2, 3)],
        )
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-9 mm linear, 1e-12 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        angular: 1e-12,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
