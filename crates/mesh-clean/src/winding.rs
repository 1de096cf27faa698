//! Winding order correction.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::adjacency::{MeshAdjacency, face_edges};
use crate::types::Mesh;

/// Make face winding consistent within every connected component.
///
/// Each component is flood-filled from its lowest-index face, which keeps its
/// orientation. A neighbour that walks a shared edge in the same direction as
/// the face it was reached from is flipped. Traversal order depends only on
/// topology, so running this twice gives the same result as running it once.
/// Non-orientable surfaces end up with a seam of disagreeing edges.
///
/// ```
/// use mesh_clean::{Mesh, Vertex, fix_winding};
///
/// let mut mesh = Mesh::new();
/// for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.5, 1.0), (0.5, -1.0)] {
///     mesh.vertices.push(Vertex::from_coords(x, y, 0.0));
/// }
/// mesh.faces = vec![[0, 1, 2], [0, 1, 3]];
///
/// let fixed = fix_winding(mesh);
/// assert_eq!(fixed.faces[1], [0, 3, 1]);
/// ```
pub fn fix_winding(mut mesh: Mesh) -> Mesh {
    let stats = orient_faces(&mut mesh.faces);
    if stats.flipped > 0 {
        info!(
            flipped = stats.flipped,
            components = stats.components,
            "Fixed winding order"
        );
    } else {
        debug!(
            components = stats.components,
            "Winding order already consistent"
        );
    }
    mesh
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WindingStats {
    pub flipped: usize,
    pub components: usize,
}

/// Orient `faces` in place and report how many were flipped.
pub(crate) fn orient_faces(faces: &mut [[u32; 3]]) -> WindingStats {
    let mut stats = WindingStats::default();
    if faces.is_empty() {
        return stats;
    }

    let adjacency = MeshAdjacency::build(faces);
    let mut visited = vec![false; faces.len()];
    let mut queue = VecDeque::new();

    for seed in 0..faces.len() {
        if visited[seed] {
            continue;
        }
        stats.components += 1;
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(face_idx) = queue.pop_front() {
            let face = faces[face_idx];
            for (a, b) in face_edges(&face) {
                for &neighbor in adjacency.faces_for_edge(a, b) {
                    let neighbor = neighbor as usize;
                    if visited[neighbor] {
                        continue;
                    }
                    visited[neighbor] = true;
                    // `face` walks a -> b; a consistent neighbour walks b -> a.
                    if edge_direction_in_face(&faces[neighbor], a, b) == Some(true) {
                        faces[neighbor].swap(1, 2);
                        stats.flipped += 1;
                    }
                    queue.push_back(neighbor);
                }
            }
        }
    }

    stats
}

/// `Some(true)` if the face walks `a -> b`, `Some(false)` for `b -> a`,
/// `None` if the edge is not in the face.
pub(crate) fn edge_direction_in_face(face: &[u32; 3], a: u32, b: u32) -> Option<bool> {
    face_edges(face).into_iter().find_map(|(v0, v1)| {
        if v0 == a && v1 == b {
            Some(true)
        } else if v0 == b && v1 == a {
            Some(false)
        } else {
            None
        }
    })
}
