//! Core mesh types.

use hashbrown::HashSet;
use nalgebra::{Matrix3, Point3, Vector3};

use crate::adjacency::MeshAdjacency;
use crate::error::{MeshError, MeshResult};

/// A vertex in a triangle mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in 3D space.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex at the given position.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a vertex from coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    /// Extent along each axis.
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Center of the box.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Largest extent along any axis.
    pub fn max_extent(&self) -> f64 {
        self.size().max()
    }

    /// Whether the point is inside the box, grown by `tolerance` on every side.
    pub fn contains(&self, p: &Point3<f64>, tolerance: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tolerance && p[i] <= self.max[i] + tolerance)
    }
}

/// A triangle mesh with indexed vertices.
///
/// Faces are counter-clockwise when viewed from outside, so the right-hand
/// normal points outward. Every stage of the cleaning pipeline takes a mesh by
/// value (or by reference) and hands back a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,
    /// Triangle faces as indices into the vertex array.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Build a mesh from raw positions and index triples, validating both.
    ///
    /// Fails if any coordinate is NaN/infinite or any face index is out of range.
    pub fn from_raw(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> MeshResult<Self> {
        let mesh = Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            faces,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check that every coordinate is finite and every face index is in range.
    pub fn validate(&self) -> MeshResult<()> {
        for (vi, v) in self.vertices.iter().enumerate() {
            for (axis, name) in ["x", "y", "z"].iter().enumerate() {
                let value = v.position[axis];
                if !value.is_finite() {
                    return Err(MeshError::invalid_coordinate(vi, name, value));
                }
            }
        }

        let n = self.vertices.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&idx| idx as usize >= n) {
                return Err(MeshError::invalid_vertex_index(fi, bad, n));
            }
        }
        Ok(())
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Whether the mesh has no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Vertex positions in order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Position of a vertex by index.
    #[inline]
    pub fn position(&self, idx: u32) -> Point3<f64> {
        self.vertices[idx as usize].position
    }

    /// Axis-aligned bounding box of all vertices, or `None` if there are none.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.vertices.first()?.position;
        let (min, max) = self.vertices[1..]
            .iter()
            .fold((first, first), |(min, max), v| {
                (min.inf(&v.position), max.sup(&v.position))
            });
        Some(Bounds { min, max })
    }

    /// Iterate over all triangles as concrete geometry.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&[a, b, c]| {
            Triangle::new(self.position(a), self.position(b), self.position(c))
        })
    }

    /// Get a single triangle by face index.
    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        let &[a, b, c] = self.faces.get(face_idx)?;
        Some(Triangle::new(
            self.position(a),
            self.position(b),
            self.position(c),
        ))
    }

    /// Build the edge-to-face adjacency of this mesh.
    pub fn adjacency(&self) -> MeshAdjacency {
        MeshAdjacency::build(&self.faces)
    }

    /// Every edge is shared by exactly two faces.
    pub fn is_watertight(&self) -> bool {
        !self.faces.is_empty() && self.adjacency().is_watertight()
    }

    /// Number of edges that belong to exactly one face.
    pub fn boundary_edge_count(&self) -> usize {
        self.adjacency().boundary_edge_count()
    }

    /// Translate every vertex by `offset`.
    pub fn translated(mut self, offset: &Vector3<f64>) -> Self {
        for v in &mut self.vertices {
            v.position += offset;
        }
        self
    }

    /// Scale every vertex about the origin.
    pub fn scaled(mut self, factor: f64) -> Self {
        for v in &mut self.vertices {
            v.position.coords *= factor;
        }
        self
    }

    /// Apply a linear map (usually a rotation) about the origin.
    pub fn rotated(mut self, rotation: &Matrix3<f64>) -> Self {
        for v in &mut self.vertices {
            v.position = Point3::from(rotation * v.position.coords);
        }
        self
    }

    /// Mesh made of the given faces only.
    ///
    /// Faces keep the given order; vertices keep their relative order.
    pub fn submesh(&self, face_ids: &[u32]) -> Mesh {
        let faces: Vec<[u32; 3]> = face_ids.iter().map(|&f| self.faces[f as usize]).collect();
        Mesh {
            vertices: self.vertices.clone(),
            faces,
        }
        .compacted()
    }

    /// Drop vertices no face references, preserving vertex and face order.
    pub fn compacted(self) -> Mesh {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &v in face {
                used[v as usize] = true;
            }
        }
        if used.iter().all(|&u| u) {
            return self;
        }

        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.vertices.len());
        for (old, v) in self.vertices.into_iter().enumerate() {
            if used[old] {
                remap[old] = vertices.len() as u32;
                vertices.push(v);
            }
        }
        let faces = self
            .faces
            .into_iter()
            .map(|[a, b, c]| [remap[a as usize], remap[b as usize], remap[c as usize]])
            .collect();
        Mesh { vertices, faces }
    }

    /// Number of distinct vertices referenced by faces.
    pub fn referenced_vertex_count(&self) -> usize {
        self.faces
            .iter()
            .flatten()
            .copied()
            .collect::<HashSet<u32>>()
            .len()
    }

    /// Compute the signed volume of the mesh.
    ///
    /// Positive for outward-facing normals, negative for inverted ones.
    /// Only meaningful for closed meshes.
    pub fn signed_volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let v0 = self.position(a).coords;
                let v1 = self.position(b).coords;
                let v2 = self.position(c).coords;
                v0.dot(&v1.cross(&v2))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Absolute enclosed volume.
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges from `v0`; length is twice the area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` for a degenerate triangle.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.normal_unnormalized().try_normalize(f64::EPSILON)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }
}
