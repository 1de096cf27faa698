//! Connected component analysis.
//!
//! Faces are nodes of a graph whose edges join faces sharing a mesh edge (or,
//! in [`Connectivity::Vertex`] mode, a vertex). Edges with more than two faces
//! still connect all of them; the graph does not care about manifoldness.

use std::collections::VecDeque;

use hashbrown::HashSet;
use tracing::{debug, info};

use crate::adjacency::{MeshAdjacency, face_edges};
use crate::error::{MeshError, MeshResult};
use crate::types::Mesh;

/// How faces are considered connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Faces sharing an edge.
    #[default]
    Edge,
    /// Faces sharing at least one vertex.
    Vertex,
}

/// A single connected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Face indices in ascending order.
    pub faces: Vec<u32>,
    /// Number of distinct vertices used by the faces.
    pub vertex_count: usize,
}

/// Result of connected component analysis.
#[derive(Debug, Clone, Default)]
pub struct ComponentAnalysis {
    /// Components in discovery order (by lowest face index).
    pub components: Vec<Component>,
}

impl ComponentAnalysis {
    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Check if the mesh is a single component.
    pub fn is_connected(&self) -> bool {
        self.components.len() == 1
    }

    /// Index of the component with the most vertices; ties go to the one found first.
    pub fn largest_by_vertices(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, c) in self.components.iter().enumerate() {
            if best.is_none_or(|(_, count)| c.vertex_count > count) {
                best = Some((i, c.vertex_count));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl std::fmt::Display for ComponentAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Component Analysis:")?;
        writeln!(f, "  Connected components: {}", self.components.len())?;
        if self.components.len() > 1 {
            writeln!(f, "  Component sizes:")?;
            for (i, comp) in self.components.iter().enumerate() {
                writeln!(
                    f,
                    "    Component {}: {} faces, {} vertices",
                    i + 1,
                    comp.faces.len(),
                    comp.vertex_count
                )?;
            }
        }
        Ok(())
    }
}

/// Partition the faces of a mesh into connected components.
///
/// Flood fill from each unvisited face, in face order.
///
/// ```
/// use mesh_clean::{Connectivity, Mesh, Vertex, find_connected_components};
///
/// let mut mesh = Mesh::new();
/// for i in 0..6 {
///     mesh.vertices.push(Vertex::from_coords(i as f64, (i % 2) as f64, 0.0));
/// }
/// mesh.faces = vec![[0, 1, 2], [3, 4, 5]];
///
/// let analysis = find_connected_components(&mesh, Connectivity::Edge);
/// assert_eq!(analysis.component_count(), 2);
/// ```
pub fn find_connected_components(mesh: &Mesh, connectivity: Connectivity) -> ComponentAnalysis {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return ComponentAnalysis::default();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut visited = vec![false; face_count];
    let mut components = Vec::new();

    for seed in 0..face_count {
        if visited[seed] {
            continue;
        }

        let mut faces = Vec::new();
        let mut queue = VecDeque::from([seed as u32]);
        visited[seed] = true;

        while let Some(face_idx) = queue.pop_front() {
            faces.push(face_idx);
            let face = &mesh.faces[face_idx as usize];

            let mut visit = |neighbor: u32| {
                if !visited[neighbor as usize] {
                    visited[neighbor as usize] = true;
                    queue.push_back(neighbor);
                }
            };
            match connectivity {
                Connectivity::Edge => {
                    for (a, b) in face_edges(face) {
                        adjacency.faces_for_edge(a, b).iter().copied().for_each(&mut visit);
                    }
                }
                Connectivity::Vertex => {
                    for &v in face {
                        adjacency.faces_for_vertex(v).iter().copied().for_each(&mut visit);
                    }
                }
            }
        }

        faces.sort_unstable();
        let vertex_count = faces
            .iter()
            .flat_map(|&f| mesh.faces[f as usize])
            .collect::<HashSet<u32>>()
            .len();
        components.push(Component {
            faces,
            vertex_count,
        });
    }

    debug!(
        components = components.len(),
        faces = face_count,
        ?connectivity,
        "Found connected components"
    );
    ComponentAnalysis { components }
}

/// Split a mesh into one mesh per connected component, in discovery order.
pub fn split_into_components(mesh: &Mesh, connectivity: Connectivity) -> Vec<Mesh> {
    find_connected_components(mesh, connectivity)
        .components
        .iter()
        .map(|c| mesh.submesh(&c.faces))
        .collect()
}

/// Keep only the component with the most vertices.
///
/// Ties go to the component containing the lowest face index.
///
/// # Errors
///
/// `EmptyMesh` if the mesh has no faces.
pub fn select_largest_component(mesh: Mesh, connectivity: Connectivity) -> MeshResult<Mesh> {
    let analysis = find_connected_components(&mesh, connectivity);
    let Some(best) = analysis.largest_by_vertices() else {
        return Err(MeshError::empty_mesh(
            "no faces to select a component from",
        ));
    };

    if analysis.is_connected() {
        return Ok(mesh.compacted());
    }

    let chosen = &analysis.components[best];
    info!(
        components = analysis.component_count(),
        kept_faces = chosen.faces.len(),
        kept_vertices = chosen.vertex_count,
        dropped_faces = mesh.face_count() - chosen.faces.len(),
        "Selected largest component"
    );
    Ok(mesh.submesh(&chosen.faces))
}
