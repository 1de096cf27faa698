//! Rotation aligning one direction with another.

use nalgebra::{Matrix3, Vector3};

/// Squared cross-product norm below which two unit vectors count as parallel.
const PARALLEL_TOLERANCE: f64 = f64::EPSILON * f64::EPSILON;

/// Rotation matrix `R` with `R * â ≈ b̂` (Rodrigues' formula).
///
/// Inputs need not be normalized. When `a` and `b` are parallel **or
/// anti-parallel** the identity is returned; a 180° flip is never produced.
/// A zero-length input also yields the identity.
///
/// ```
/// use approx::assert_relative_eq;
/// use mesh_clean::rotation_between;
/// use nalgebra::Vector3;
///
/// let r = rotation_between(&Vector3::x(), &Vector3::y());
/// assert_relative_eq!(r * Vector3::x(), Vector3::y(), epsilon = 1e-12);
/// ```
pub fn rotation_between(a: &Vector3<f64>, b: &Vector3<f64>) -> Matrix3<f64> {
    let (Some(a), Some(b)) = (a.try_normalize(0.0), b.try_normalize(0.0)) else {
        return Matrix3::identity();
    };

    let v = a.cross(&b);
    let s2 = v.norm_squared();
    if s2 <= PARALLEL_TOLERANCE {
        return Matrix3::identity();
    }

    let c = a.dot(&b);
    let k = v.cross_matrix();
    Matrix3::identity() + k + k * k * ((1.0 - c) / s2)
}
