//! Cutting a mesh with a plane.
//!
//! Triangles on the discarded side are dropped, triangles crossing the plane
//! are clipped, and the opening left along the plane is closed with a
//! triangulated cap. Intersection points are shared between the two faces of
//! every cut edge, so the clipped surface stays connected.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, warn};

use crate::adjacency::{MeshAdjacency, boundary_half_edges, edge_key};
use crate::holes::trace_loops;
use crate::plane::Plane;
use crate::triangulate::triangulate_planar_rings;
use crate::types::{Mesh, Vertex};

/// Which side of the plane survives a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HalfSpace {
    /// The side the plane normal points to.
    #[default]
    Positive,
    /// The side opposite the normal.
    Negative,
}

/// Parameters for [`slice_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceParams {
    /// Side of the plane to keep.
    pub keep: HalfSpace,
    /// Close the cut with a triangulated cap.
    pub cap: bool,
    /// Vertices closer than this to the plane are treated as lying on it.
    pub epsilon: f64,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            keep: HalfSpace::Positive,
            cap: true,
            epsilon: 1e-9,
        }
    }
}

impl SliceParams {
    /// Keep the side opposite the plane normal.
    pub fn keep_negative(mut self) -> Self {
        self.keep = HalfSpace::Negative;
        self
    }

    /// Leave the cut open.
    pub fn without_cap(mut self) -> Self {
        self.cap = false;
        self
    }

    /// Set the on-plane tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Cut `mesh` with `plane`, keeping one half-space.
///
/// The input is not modified. The result holds only referenced vertices, in
/// their original relative order, followed by the new intersection vertices.
/// Faces lying in the plane are dropped when capping (the cap replaces them)
/// and kept otherwise. If the plane misses the mesh, the result is either the
/// whole mesh or empty.
///
/// ```
/// use mesh_clean::{Mesh, Plane, SliceParams, Vertex, slice_mesh};
/// use nalgebra::{Point3, Vector3};
///
/// let mut mesh = Mesh::new();
/// for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
///     mesh.vertices.push(Vertex::from_coords(p[0], p[1], p[2]));
/// }
/// mesh.faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
///
/// let plane = Plane::new(Point3::new(0.0, 0.0, 0.5), Vector3::z()).unwrap();
/// let top = slice_mesh(&mesh, &plane, &SliceParams::default());
/// assert!(top.is_watertight());
/// assert!(top.vertices.iter().all(|v| v.position.z >= 0.5 - 1e-9));
/// ```
pub fn slice_mesh(mesh: &Mesh, plane: &Plane, params: &SliceParams) -> Mesh {
    let plane = match params.keep {
        HalfSpace::Positive => *plane,
        HalfSpace::Negative => plane.flipped(),
    };

    let distances: Vec<f64> = mesh
        .vertices
        .iter()
        .map(|v| {
            let d = plane.signed_distance(&v.position);
            if d.abs() <= params.epsilon { 0.0 } else { d }
        })
        .collect();

    let mut clipper = Clipper {
        mesh,
        distances: &distances,
        extra: Vec::new(),
        cut_cache: HashMap::new(),
    };

    let mut faces: Vec<[u32; 3]> = Vec::with_capacity(mesh.faces.len());
    let mut clipped = 0usize;
    let mut coplanar = 0usize;

    for &face in &mesh.faces {
        let d = face.map(|v| distances[v as usize]);

        if d.iter().all(|&x| x == 0.0) {
            coplanar += 1;
            if !params.cap {
                faces.push(face);
            }
        } else if d.iter().all(|&x| x >= 0.0) {
            faces.push(face);
        } else if d.iter().any(|&x| x > 0.0) {
            clipped += 1;
            let polygon = clipper.clip(face, d);
            for k in 1..polygon.len().saturating_sub(1) {
                faces.push([polygon[0], polygon[k], polygon[k + 1]]);
            }
        }
    }

    let mut positions = mesh.positions();
    positions.extend_from_slice(&clipper.extra);
    let original_count = mesh.vertices.len();

    let mut cap_faces = 0usize;
    if params.cap && !faces.is_empty() {
        let on_plane = |v: u32| v as usize >= original_count || distances[v as usize] == 0.0;
        let adjacency = MeshAdjacency::build(&faces);
        let rim: Vec<(u32, u32)> = boundary_half_edges(&faces, &adjacency)
            .into_iter()
            .filter(|&(a, b)| on_plane(a) && on_plane(b))
            .map(|(a, b)| (b, a))
            .collect();

        if !rim.is_empty() {
            let traced = trace_loops(&rim);
            if traced.open_chains > 0 {
                warn!(
                    open_chains = traced.open_chains,
                    "Cut boundary has open chains, leaving them uncapped"
                );
            }
            let cap = triangulate_planar_rings(&positions, &traced.loops, &-plane.normal);
            if !cap.fallback_rings.is_empty() {
                warn!(rings = ?cap.fallback_rings, "Cap triangulation used fan fallback");
            }
            cap_faces = cap.triangles.len();
            faces.extend(cap.triangles);
        }
    }

    debug!(
        input_faces = mesh.faces.len(),
        output_faces = faces.len(),
        clipped,
        coplanar,
        cut_vertices = clipper.extra.len(),
        cap_faces,
        "Sliced mesh"
    );

    Mesh {
        vertices: positions.into_iter().map(Vertex::new).collect(),
        faces,
    }
    .compacted()
}

/// Clips faces against the plane, sharing intersection vertices per edge.
struct Clipper<'a> {
    mesh: &'a Mesh,
    distances: &'a [f64],
    /// Intersection vertices; index `i` is vertex `mesh.vertices.len() + i`.
    extra: Vec<Point3<f64>>,
    cut_cache: HashMap<(u32, u32), u32>,
}

impl Clipper<'_> {
    /// Kept part of a straddling face as a polygon (3 or 4 vertices) with the
    /// face's winding.
    fn clip(&mut self, face: [u32; 3], d: [f64; 3]) -> Vec<u32> {
        let mut polygon = Vec::with_capacity(4);
        for k in 0..3 {
            let (i, j) = (face[k], face[(k + 1) % 3]);
            let (di, dj) = (d[k], d[(k + 1) % 3]);
            if di >= 0.0 {
                polygon.push(i);
            }
            if (di > 0.0 && dj < 0.0) || (di < 0.0 && dj > 0.0) {
                polygon.push(self.cut(i, j));
            }
        }
        polygon
    }

    fn cut(&mut self, i: u32, j: u32) -> u32 {
        let key = edge_key(i, j);
        if let Some(&idx) = self.cut_cache.get(&key) {
            return idx;
        }
        // Always interpolate from the lower index so both faces agree bitwise.
        let (a, b) = key;
        let (da, db) = (self.distances[a as usize], self.distances[b as usize]);
        let t = da / (da - db);
        let pa = self.mesh.position(a);
        let pb = self.mesh.position(b);
        let idx = (self.mesh.vertices.len() + self.extra.len()) as u32;
        self.extra.push(pa + (pb - pa) * t);
        self.cut_cache.insert(key, idx);
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{capture_logs, cube, open_cube, unit_cube, uv_sphere};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn horizontal(z: f64) -> Plane {
        Plane::new(Point3::new(0.0, 0.0, z), Vector3::z()).unwrap()
    }

    #[test]
    fn test_cube_half_is_closed() {
        let top = slice_mesh(&unit_cube(), &horizontal(0.5), &SliceParams::default());

        assert!(top.is_watertight());
        assert_relative_eq!(top.signed_volume(), 0.5, epsilon = 1e-12);
        assert!(top.vertices.iter().all(|v| v.position.z >= 0.5 - 1e-12));
    }

    #[test]
    fn test_keep_negative() {
        let params = SliceParams::default().keep_negative();
        let bottom = slice_mesh(&unit_cube(), &horizontal(0.25), &params);

        assert!(bottom.is_watertight());
        assert_relative_eq!(bottom.signed_volume(), 0.25, epsilon = 1e-12);
        assert!(bottom.vertices.iter().all(|v| v.position.z <= 0.25 + 1e-12));
    }

    #[test]
    fn test_without_cap_leaves_opening() {
        let params = SliceParams::default().without_cap();
        let top = slice_mesh(&unit_cube(), &horizontal(0.5), &params);
        assert!(!top.is_watertight());
        assert_eq!(top.boundary_edge_count(), 8);
    }

    #[test]
    fn test_input_is_not_modified() {
        let mesh = unit_cube();
        let before = mesh.clone();
        let _ = slice_mesh(&mesh, &horizontal(0.3), &SliceParams::default());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_plane_misses_mesh() {
        let mesh = unit_cube();
        let all = slice_mesh(&mesh, &horizontal(-1.0), &SliceParams::default());
        assert_eq!(all, mesh);

        let none = slice_mesh(&mesh, &horizontal(2.0), &SliceParams::default());
        assert!(none.is_empty());
        assert_eq!(none.vertex_count(), 0);
    }

    #[test]
    fn test_cut_through_face_plane_recaps() {
        // Plane coincides with the bottom face; the cap replaces it.
        let mesh = unit_cube();
        let out = slice_mesh(&mesh, &horizontal(0.0), &SliceParams::default());
        assert!(out.is_watertight());
        assert_relative_eq!(out.signed_volume(), 1.0, epsilon = 1e-12);
        assert_eq!(out.face_count(), 12);
    }

    #[test]
    fn test_shared_cut_vertices() {
        let top = slice_mesh(&unit_cube(), &horizontal(0.5), &SliceParams::default());
        // 4 original top vertices plus one cut per vertical edge and one per
        // side diagonal crossing the plane.
        assert_eq!(top.vertex_count(), 4 + 8);
    }

    #[test]
    fn test_sphere_cut_is_watertight() {
        let sphere = uv_sphere(0.5, 24, 12);
        let plane = Plane::new(Point3::new(0.0, -0.2, 0.0), Vector3::new(0.1, 1.0, 0.05)).unwrap();
        let cut = slice_mesh(&sphere, &plane, &SliceParams::default());

        assert!(cut.is_watertight());
        assert!(cut.signed_volume() > 0.0);
        for v in &cut.vertices {
            assert!(plane.signed_distance(&v.position) >= -1e-9);
        }
    }

    #[test]
    fn test_tube_cross_section_caps_as_annulus() {
        // Hollow box: outer cube with an inverted inner cube forms a shell.
        let outer = cube(-1.0, 2.0);
        let mut inner = cube(-0.5, 1.0);
        for f in &mut inner.faces {
            f.swap(1, 2);
        }
        let mut shell = outer.clone();
        let offset = shell.vertex_count() as u32;
        shell.vertices.extend(inner.vertices);
        shell
            .faces
            .extend(inner.faces.iter().map(|f| f.map(|v| v + offset)));

        let top = slice_mesh(&shell, &horizontal(0.0), &SliceParams::default());
        assert!(top.is_watertight());
        // Outer half (4) minus inner half (0.5).
        assert_relative_eq!(top.signed_volume(), 3.5, epsilon = 1e-9);
    }

    #[test]
    fn test_open_chains_are_warned() {
        // The cube has no top, so the x = 0.5 section is a U, not a loop.
        let plane = Plane::new(Point3::new(0.5, 0.0, 0.0), Vector3::x()).unwrap();
        let mut cut = Mesh::new();
        let logs = capture_logs(|| {
            cut = slice_mesh(&open_cube(), &plane, &SliceParams::default());
        });

        assert!(!cut.faces.is_empty());
        assert!(cut.vertices.iter().all(|v| v.position.x >= 0.5 - 1e-12));
        let line = logs
            .lines()
            .find(|l| l.contains("open chains"))
            .unwrap_or_else(|| panic!("no open chain warning in:\n{logs}"));
        assert!(line.contains("WARN"), "{line}");
    }
}
