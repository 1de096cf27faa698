//! Oriented planes used for fitting and cutting.

use nalgebra::{Point3, Vector3};

/// Relative sine threshold below which three points count as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-10;

/// A plane in 3D space defined by a point and a unit normal.
///
/// The plane equation is `normal · (p - point) = 0`. The normal orients the
/// plane: the "positive" half-space is the side it points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// A point on the plane.
    pub point: Point3<f64>,
    /// The plane normal (unit vector).
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Create a plane from a point and a normal. The normal is normalized.
    ///
    /// Returns `None` if the normal has zero length.
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let normal = normal.try_normalize(f64::EPSILON)?;
        Some(Self { point, normal })
    }

    /// Plane through three points, with normal `(p1 - p0) × (p2 - p0)`.
    ///
    /// Returns `None` for collinear or coincident points.
    pub fn from_points(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Option<Self> {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let normal = e1.cross(&e2);
        if normal.norm() <= COLLINEAR_TOLERANCE * e1.norm() * e2.norm() {
            return None;
        }
        Self::new(*p0, normal)
    }

    /// Plane from the equation `ax + by + cz + d = 0`.
    ///
    /// The coefficients need not be normalized. The stored point is the foot of
    /// the perpendicular from the origin.
    pub fn from_equation(equation: [f64; 4]) -> Option<Self> {
        let [a, b, c, d] = equation;
        let n = Vector3::new(a, b, c);
        let len2 = n.norm_squared();
        if len2 <= f64::EPSILON * f64::EPSILON {
            return None;
        }
        Self::new(Point3::from(n * (-d / len2)), n)
    }

    /// Coefficients `[a, b, c, d]` with `a² + b² + c² = 1`.
    pub fn equation(&self) -> [f64; 4] {
        let n = self.normal;
        [n.x, n.y, n.z, -n.dot(&self.point.coords)]
    }

    /// Signed distance; positive on the side the normal points to.
    #[inline]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.point))
    }

    /// Absolute distance to the plane.
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.signed_distance(p).abs()
    }

    /// Within `threshold` of the plane.
    #[inline]
    pub fn is_inlier(&self, p: &Point3<f64>, threshold: f64) -> bool {
        self.distance(p) <= threshold
    }

    /// Orthogonal projection onto the plane.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal * self.signed_distance(p)
    }

    /// Same plane with the opposite orientation.
    pub fn flipped(&self) -> Self {
        Self {
            point: self.point,
            normal: -self.normal,
        }
    }

    /// Parallel plane moved `distance` along the normal.
    pub fn offset(&self, distance: f64) -> Self {
        Self {
            point: self.point + self.normal * distance,
            normal: self.normal,
        }
    }

    /// Two unit vectors spanning the plane, with `u × v = normal`.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        orthonormal_basis(&self.normal)
    }
}

/// Unit vectors `(u, v)` orthogonal to `normal` with `u × v = normal`.
///
/// `normal` must be unit length.
pub(crate) fn orthonormal_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = helper.cross(normal).normalize();
    let v = normal.cross(&u);
    (u, v)
}
