//! Self-intersection detection.
//!
//! Candidate pairs come from a sweep over face bounding boxes sorted by their
//! minimum x; each candidate is confirmed with a separating-axis triangle
//! test. Faces that share a vertex are never reported against each other.

use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::types::{Mesh, Triangle};

/// Result of self-intersection detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfIntersectionResult {
    /// Intersecting face pairs `(i, j)` with `i < j`, sorted.
    pub intersecting_pairs: Vec<(u32, u32)>,
    /// Pairs found before truncation.
    pub intersection_count: usize,
    /// Faces examined.
    pub faces_checked: usize,
    /// Whether `intersecting_pairs` was cut at `max_reported`.
    pub truncated: bool,
}

impl SelfIntersectionResult {
    /// No intersecting pairs were found.
    pub fn is_clean(&self) -> bool {
        self.intersection_count == 0
    }

    /// Distinct faces taking part in any reported pair, ascending.
    pub fn faces(&self) -> Vec<u32> {
        let mut faces: Vec<u32> = self
            .intersecting_pairs
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect();
        faces.sort_unstable();
        faces.dedup();
        faces
    }
}

impl std::fmt::Display for SelfIntersectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            write!(f, "No self-intersections detected")
        } else {
            write!(
                f,
                "Self-intersections found: {} pair(s){}",
                self.intersection_count,
                if self.truncated { " (truncated)" } else { "" }
            )
        }
    }
}

/// Parameters for [`detect_self_intersections`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionParams {
    /// Report at most this many pairs (all when `None`).
    pub max_reported: Option<usize>,
    /// Distance below which geometry counts as touching.
    pub epsilon: f64,
}

impl Default for IntersectionParams {
    fn default() -> Self {
        Self {
            max_reported: None,
            epsilon: 1e-10,
        }
    }
}

impl IntersectionParams {
    /// Cap the number of reported pairs.
    pub fn with_max_reported(mut self, max: usize) -> Self {
        self.max_reported = Some(max);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Aabb {
    fn from_triangle(tri: &Triangle, epsilon: f64) -> Self {
        let pad = Vector3::repeat(epsilon);
        Self {
            min: tri.v0.inf(&tri.v1).inf(&tri.v2) - pad,
            max: tri.v0.sup(&tri.v1).sup(&tri.v2) + pad,
        }
    }

    fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Find pairs of faces whose triangles intersect.
///
/// The result is the same regardless of the `parallel` feature.
///
/// ```
/// use mesh_clean::{IntersectionParams, Mesh, Vertex, detect_self_intersections};
///
/// let mut mesh = Mesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
///
/// let result = detect_self_intersections(&mesh, &IntersectionParams::default());
/// assert!(result.is_clean());
/// ```
pub fn detect_self_intersections(
    mesh: &Mesh,
    params: &IntersectionParams,
) -> SelfIntersectionResult {
    let face_count = mesh.faces.len();
    if face_count < 2 {
        return SelfIntersectionResult {
            faces_checked: face_count,
            ..Default::default()
        };
    }

    let triangles: Vec<Triangle> = mesh.triangles().collect();
    let boxes: Vec<Aabb> = triangles
        .iter()
        .map(|t| Aabb::from_triangle(t, params.epsilon))
        .collect();

    let mut order: Vec<usize> = (0..face_count).collect();
    order.sort_by(|&a, &b| boxes[a].min.x.total_cmp(&boxes[b].min.x).then(a.cmp(&b)));

    let candidates_from = |slot: usize| -> Vec<(u32, u32)> {
        let i = order[slot];
        let mut found = Vec::new();
        for &j in &order[slot + 1..] {
            if boxes[j].min.x > boxes[i].max.x {
                break;
            }
            if !boxes[i].overlaps(&boxes[j]) || shares_vertex(&mesh.faces[i], &mesh.faces[j]) {
                continue;
            }
            if triangles_intersect(&triangles[i], &triangles[j], params.epsilon) {
                found.push((i.min(j) as u32, i.max(j) as u32));
            }
        }
        found
    };

    #[cfg(feature = "parallel")]
    let mut pairs: Vec<(u32, u32)> = (0..face_count)
        .into_par_iter()
        .flat_map_iter(candidates_from)
        .collect();
    #[cfg(not(feature = "parallel"))]
    let mut pairs: Vec<(u32, u32)> = (0..face_count).flat_map(candidates_from).collect();

    pairs.sort_unstable();
    let intersection_count = pairs.len();
    let truncated = params
        .max_reported
        .is_some_and(|max| intersection_count > max);
    if let Some(max) = params.max_reported {
        pairs.truncate(max);
    }

    if intersection_count > 0 {
        info!(pairs = intersection_count, truncated, "Found self-intersections");
    } else {
        debug!(faces = face_count, "No self-intersections");
    }

    SelfIntersectionResult {
        intersecting_pairs: pairs,
        intersection_count,
        faces_checked: face_count,
        truncated,
    }
}

fn shares_vertex(a: &[u32; 3], b: &[u32; 3]) -> bool {
    a.iter().any(|v| b.contains(v))
}

/// Separating-axis test for two triangles. Touching counts as intersecting.
fn triangles_intersect(t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let n1 = t1.normal_unnormalized();
    let n2 = t2.normal_unnormalized();

    let tiny = epsilon * epsilon;
    if n1.norm_squared() < tiny || n2.norm_squared() < tiny {
        return false;
    }

    let edges1 = [t1.v1 - t1.v0, t1.v2 - t1.v1, t1.v0 - t1.v2];
    let edges2 = [t2.v1 - t2.v0, t2.v2 - t2.v1, t2.v0 - t2.v2];

    let coplanar = n1.cross(&n2).norm_squared() < tiny * n1.norm_squared() * n2.norm_squared();
    if coplanar {
        if separated_by_axis(&n1, t1, t2, epsilon) {
            return false;
        }
        // In-plane edge normals of both triangles.
        let in_plane = edges1
            .iter()
            .map(|e| n1.cross(e))
            .chain(edges2.iter().map(|e| n2.cross(e)));
        for axis in in_plane {
            if separated_by_axis(&axis, t1, t2, epsilon) {
                return false;
            }
        }
        return true;
    }

    if separated_by_axis(&n1, t1, t2, epsilon) || separated_by_axis(&n2, t1, t2, epsilon) {
        return false;
    }
    for e1 in &edges1 {
        for e2 in &edges2 {
            if separated_by_axis(&e1.cross(e2), t1, t2, epsilon) {
                return false;
            }
        }
    }
    true
}

/// Projections of the two triangles onto `axis` are more than `epsilon` apart.
fn separated_by_axis(axis: &Vector3<f64>, t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let Some(axis) = axis.try_normalize(f64::EPSILON) else {
        return false;
    };
    let project = |t: &Triangle| {
        let p = [t.v0, t.v1, t.v2].map(|v| axis.dot(&v.coords));
        (p[0].min(p[1]).min(p[2]), p[0].max(p[1]).max(p[2]))
    };
    let (min1, max1) = project(t1);
    let (min2, max2) = project(t2);
    max1 + epsilon < min2 || max2 + epsilon < min1
}
