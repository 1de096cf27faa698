//! RANSAC plane fitting.
//!
//! Robustly fits the dominant plane of a noisy point cloud by repeatedly
//! sampling three points and keeping the candidate with the most inliers.
//! The random source is passed in by the caller so runs can be reproduced
//! with a seeded generator and parallel runs never share state.

use nalgebra::{Matrix3, Point3, SymmetricEigen};
use rand::Rng;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::plane::Plane;
use crate::types::Mesh;

/// Configuration for RANSAC plane fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Number of candidate planes to evaluate.
    pub max_iterations: usize,
    /// Maximum point-to-plane distance for an inlier.
    pub inlier_threshold: f64,
    /// Refit the winning plane to its inliers by least squares.
    pub refine: bool,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            inlier_threshold: 0.01,
            refine: false,
        }
    }
}

impl RansacConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of iterations.
    pub const fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the inlier distance threshold.
    pub const fn with_inlier_threshold(mut self, threshold: f64) -> Self {
        self.inlier_threshold = threshold;
        self
    }

    /// Enable or disable least-squares refinement.
    pub const fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }
}

/// Result of a plane fit.
#[derive(Debug, Clone)]
pub struct PlaneFit {
    /// The fitted plane. Its orientation is arbitrary.
    pub plane: Plane,
    /// Indices of inlier points.
    pub inliers: Vec<usize>,
    /// Number of iterations performed.
    pub iterations: usize,
}

impl PlaneFit {
    /// Plane coefficients `[a, b, c, d]` with a unit normal.
    pub fn equation(&self) -> [f64; 4] {
        self.plane.equation()
    }

    /// Number of inliers.
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }

    /// Fraction of points that are inliers.
    pub fn inlier_ratio(&self, total_points: usize) -> f64 {
        if total_points == 0 {
            return 0.0;
        }
        self.inliers.len() as f64 / total_points as f64
    }
}

/// Fit a plane to the vertices of a mesh.
pub fn fit_plane_to_mesh<R: Rng + ?Sized>(
    mesh: &Mesh,
    config: &RansacConfig,
    rng: &mut R,
) -> MeshResult<PlaneFit> {
    fit_plane(&mesh.positions(), config, rng)
}

/// Fit a plane to a point cloud.
///
/// # Errors
///
/// - `InsufficientData` if there are fewer than three points.
/// - `DegenerateGeometry` if every sampled triple was collinear or coincident,
///   or if `max_iterations` is 0.
///
/// # Example
///
/// ```
/// use mesh_clean::{RansacConfig, fit_plane};
/// use nalgebra::Point3;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let points: Vec<_> = (0..100)
///     .map(|i| Point3::new((i % 10) as f64, 0.0, (i / 10) as f64))
///     .collect();
/// let mut rng = StdRng::seed_from_u64(7);
/// let fit = fit_plane(&points, &RansacConfig::default(), &mut rng).unwrap();
/// assert!(fit.plane.normal.y.abs() > 0.999);
/// assert_eq!(fit.inlier_count(), 100);
/// ```
pub fn fit_plane<R: Rng + ?Sized>(
    points: &[Point3<f64>],
    config: &RansacConfig,
    rng: &mut R,
) -> MeshResult<PlaneFit> {
    let n = points.len();
    if n < 3 {
        return Err(MeshError::insufficient_data(3, n));
    }
    if config.max_iterations == 0 {
        return Err(MeshError::degenerate_geometry(
            "max_iterations is 0, no candidate plane was sampled",
        ));
    }

    let mut best: Option<(Plane, usize)> = None;
    let mut degenerate_samples = 0usize;

    for _ in 0..config.max_iterations {
        let i0 = rng.gen_range(0..n);
        let mut i1 = rng.gen_range(0..n);
        while i1 == i0 {
            i1 = rng.gen_range(0..n);
        }
        let mut i2 = rng.gen_range(0..n);
        while i2 == i0 || i2 == i1 {
            i2 = rng.gen_range(0..n);
        }

        let Some(candidate) = Plane::from_points(&points[i0], &points[i1], &points[i2]) else {
            degenerate_samples += 1;
            continue;
        };

        let count = count_inliers(points, &candidate, config.inlier_threshold);
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((candidate, count));
        }
    }

    let Some((plane, count)) = best else {
        return Err(MeshError::degenerate_geometry(format!(
            "all {} sampled point triples were collinear",
            config.max_iterations
        )));
    };

    let plane = if config.refine {
        let inliers = collect_inliers(points, &plane, config.inlier_threshold);
        refine_plane(points, &inliers).unwrap_or(plane)
    } else {
        plane
    };
    let inliers = collect_inliers(points, &plane, config.inlier_threshold);

    debug!(
        points = n,
        sampled_inliers = count,
        inliers = inliers.len(),
        degenerate_samples,
        normal = ?plane.normal,
        "RANSAC plane fit"
    );

    Ok(PlaneFit {
        plane,
        inliers,
        iterations: config.max_iterations,
    })
}

#[cfg(feature = "parallel")]
fn count_inliers(points: &[Point3<f64>], plane: &Plane, threshold: f64) -> usize {
    use rayon::prelude::*;
    points
        .par_iter()
        .filter(|p| plane.is_inlier(p, threshold))
        .count()
}

#[cfg(not(feature = "parallel"))]
fn count_inliers(points: &[Point3<f64>], plane: &Plane, threshold: f64) -> usize {
    points
        .iter()
        .filter(|p| plane.is_inlier(p, threshold))
        .count()
}

fn collect_inliers(points: &[Point3<f64>], plane: &Plane, threshold: f64) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| plane.is_inlier(p, threshold))
        .map(|(i, _)| i)
        .collect()
}

/// Least-squares plane through the inliers: centroid plus the covariance
/// eigenvector with the smallest eigenvalue.
fn refine_plane(points: &[Point3<f64>], inliers: &[usize]) -> Option<Plane> {
    if inliers.len() < 3 {
        return None;
    }

    let centroid = inliers
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, &i| acc + points[i].coords)
        / inliers.len() as f64;

    let covariance = inliers.iter().fold(Matrix3::zeros(), |acc, &i| {
        let d = points[i].coords - centroid;
        acc + d * d.transpose()
    });

    let eigen = SymmetricEigen::new(covariance);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let normal = eigen.eigenvectors.column(min_idx).into_owned();

    Plane::new(Point3::from(centroid), normal)
}
