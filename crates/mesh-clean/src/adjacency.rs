//! Edge and vertex adjacency for indexed triangle meshes.

use hashbrown::HashMap;

/// Adjacency information for a mesh.
///
/// Provides lookups for:
/// - Faces adjacent to an edge
/// - Faces adjacent to a vertex
/// - Boundary edges (exactly one adjacent face)
/// - Non-manifold edges (more than two adjacent faces)
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Maps edge `(v0, v1)` with `v0 < v1` to the faces using it, in face order.
    pub edge_to_faces: HashMap<(u32, u32), Vec<u32>>,
    /// Maps vertex index to the faces using it, in face order.
    pub vertex_to_faces: HashMap<u32, Vec<u32>>,
}

impl MeshAdjacency {
    /// Build adjacency from a face list.
    ///
    /// ```
    /// use mesh_clean::MeshAdjacency;
    ///
    /// let adj = MeshAdjacency::build(&[[0, 1, 2], [1, 3, 2]]);
    /// assert_eq!(adj.boundary_edge_count(), 4);
    /// assert_eq!(adj.edge_count(), 5);
    /// ```
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<u32>> =
            HashMap::with_capacity(faces.len() * 3 / 2);
        let mut vertex_to_faces: HashMap<u32, Vec<u32>> = HashMap::new();

        for (face_idx, face) in faces.iter().enumerate() {
            let face_idx = face_idx as u32;
            for &v in face {
                vertex_to_faces.entry(v).or_default().push(face_idx);
            }
            for (a, b) in face_edges(face) {
                edge_to_faces
                    .entry(edge_key(a, b))
                    .or_default()
                    .push(face_idx);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Faces adjacent to an edge, in either direction.
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> &[u32] {
        self.edge_to_faces
            .get(&edge_key(v0, v1))
            .map_or(&[], Vec::as_slice)
    }

    /// Faces adjacent to a vertex.
    pub fn faces_for_vertex(&self, v: u32) -> &[u32] {
        self.vertex_to_faces.get(&v).map_or(&[], Vec::as_slice)
    }

    /// Number of edges that belong to exactly one face.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() == 1).count()
    }

    /// Edges shared by more than two faces.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(&edge, _)| edge)
    }

    /// Number of edges shared by more than two faces.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() > 2).count()
    }

    /// At most two faces on every edge.
    pub fn is_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() <= 2)
    }

    /// Exactly two faces on every edge.
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() == 2)
    }

    /// Total number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }
}

/// Undirected edge key with the smaller index first.
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// The three directed edges of a face, following its winding.
#[inline]
pub fn face_edges(face: &[u32; 3]) -> [(u32, u32); 3] {
    [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
}

/// Directed boundary half-edges in face order.
///
/// A half-edge `a -> b` is reported when its undirected edge belongs to exactly
/// one face; the direction is the one that face uses. Traversal order depends
/// only on the face list, so callers get deterministic output.
pub fn boundary_half_edges(faces: &[[u32; 3]], adjacency: &MeshAdjacency) -> Vec<(u32, u32)> {
    faces
        .iter()
        .flat_map(face_edges)
        .filter(|&(a, b)| adjacency.faces_for_edge(a, b).len() == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key() {
        assert_eq!(edge_key(5, 2), (2, 5));
        assert_eq!(edge_key(2, 5), (2, 5));
    }

    #[test]
    fn test_two_triangles() {
        let faces = [[0, 1, 2], [1, 3, 2]];
        let adj = MeshAdjacency::build(&faces);

        assert_eq!(adj.faces_for_edge(2, 1), &[0, 1]);
        assert_eq!(adj.faces_for_vertex(3), &[1]);
        assert!(adj.is_manifold());
        assert!(!adj.is_watertight());

        let half = boundary_half_edges(&faces, &adj);
        assert_eq!(half, vec![(0, 1), (2, 0), (1, 3), (3, 2)]);
    }

    #[test]
    fn test_tetrahedron_watertight() {
        let faces = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        let adj = MeshAdjacency::build(&faces);
        assert!(adj.is_watertight());
        assert_eq!(adj.edge_count(), 6);
        assert_eq!(adj.boundary_edge_count(), 0);
    }

    #[test]
    fn test_non_manifold_fin() {
        let faces = [[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.non_manifold_edge_count(), 1);
        assert_eq!(adj.non_manifold_edges().next(), Some((0, 1)));
        assert!(!adj.is_manifold());
    }
}
