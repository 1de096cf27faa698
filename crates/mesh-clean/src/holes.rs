//! Hole detection and filling.
//!
//! Holes are traced along directed boundary edges (edges with exactly one
//! adjacent face), walking against the winding of the faces that own them.
//! Loops therefore come out in the orientation their filling triangles need,
//! and a fill is consistently wound with the surrounding surface without any
//! post-hoc flipping.

use hashbrown::HashMap;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::adjacency::boundary_half_edges;
use crate::triangulate::{Triangulation, triangulate_ring};
use crate::types::Mesh;

/// A closed loop of boundary vertices, ordered for filling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    /// Vertex indices forming the loop. The last vertex connects to the first.
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges in the loop.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Outcome of [`fill_holes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoleFillReport {
    /// Boundary loops found.
    pub holes_detected: usize,
    /// Loops that were triangulated.
    pub holes_filled: usize,
    /// Faces appended to the mesh.
    pub faces_added: usize,
    /// Sizes of loops left open because they exceeded the limit.
    pub skipped: Vec<usize>,
    /// Sizes of loops that needed the fan fallback.
    pub fallbacks: Vec<usize>,
}

/// Closed cycles extracted from a set of directed edges.
#[derive(Debug, Clone, Default)]
pub(crate) struct TracedLoops {
    pub loops: Vec<Vec<u32>>,
    /// Walks that dead-ended before returning to their start.
    pub open_chains: usize,
}

/// Chain directed edges `a -> b` into closed cycles.
///
/// A vertex with several outgoing edges (two holes touching at a corner) is
/// handled by cutting the walk into simple cycles whenever it revisits a
/// vertex. Edges are consumed in input order, so the result is deterministic.
pub(crate) fn trace_loops(edges: &[(u32, u32)]) -> TracedLoops {
    let mut outgoing: HashMap<u32, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, &(a, _)) in edges.iter().enumerate() {
        outgoing.entry(a).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut traced = TracedLoops::default();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let (first, mut current) = edges[start];
        let mut path = vec![first];
        let mut position: HashMap<u32, usize> = HashMap::from([(first, 0)]);

        loop {
            if let Some(&k) = position.get(&current) {
                let cycle = path.split_off(k);
                for v in &cycle {
                    position.remove(v);
                }
                if cycle.len() >= 3 {
                    traced.loops.push(cycle);
                }
                if path.is_empty() {
                    break;
                }
            }
            position.insert(current, path.len());
            path.push(current);

            let next = outgoing
                .get(&current)
                .and_then(|ids| ids.iter().copied().find(|&e| !used[e]));
            match next {
                Some(e) => {
                    used[e] = true;
                    current = edges[e].1;
                }
                None => {
                    traced.open_chains += 1;
                    break;
                }
            }
        }
    }

    traced
}

/// Find every hole in the mesh.
///
/// Each loop is ordered opposite to the boundary edges of its neighbouring
/// faces, which is the winding a patch must use. Non-manifold edges are not
/// boundary edges and never take part in a loop.
pub fn detect_holes(mesh: &Mesh) -> Vec<BoundaryLoop> {
    let adjacency = mesh.adjacency();
    let reversed: Vec<(u32, u32)> = boundary_half_edges(&mesh.faces, &adjacency)
        .into_iter()
        .map(|(a, b)| (b, a))
        .collect();
    if reversed.is_empty() {
        return Vec::new();
    }

    let traced = trace_loops(&reversed);
    if traced.open_chains > 0 {
        warn!(
            open_chains = traced.open_chains,
            "Boundary edges that do not close into loops"
        );
    }
    debug!(
        holes = traced.loops.len(),
        boundary_edges = reversed.len(),
        "Detected holes"
    );

    traced
        .loops
        .into_iter()
        .map(|vertices| BoundaryLoop { vertices })
        .collect()
}

/// Fill every hole of at most `max_edges` edges (no limit when `None`).
///
/// New faces are appended after the existing ones; vertices are untouched.
pub fn fill_holes(mut mesh: Mesh, max_edges: Option<usize>) -> (Mesh, HoleFillReport) {
    let holes = detect_holes(&mesh);
    let mut report = HoleFillReport {
        holes_detected: holes.len(),
        ..Default::default()
    };
    if holes.is_empty() {
        return (mesh, report);
    }

    let (fillable, skipped): (Vec<BoundaryLoop>, Vec<BoundaryLoop>) = holes
        .into_iter()
        .partition(|hole| max_edges.is_none_or(|max| hole.len() <= max));
    for hole in &skipped {
        warn!(
            edges = hole.len(),
            max_edges = ?max_edges,
            "Skipping hole larger than the limit"
        );
        report.skipped.push(hole.len());
    }

    let positions = mesh.positions();

    #[cfg(feature = "parallel")]
    let patches: Vec<Triangulation> = fillable
        .par_iter()
        .map(|hole| triangulate_ring(&positions, &hole.vertices))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let patches: Vec<Triangulation> = fillable
        .iter()
        .map(|hole| triangulate_ring(&positions, &hole.vertices))
        .collect();

    for patch in patches {
        report.faces_added += patch.triangles.len();
        report.fallbacks.extend(patch.fallback_rings);
        mesh.faces.extend(patch.triangles);
        report.holes_filled += 1;
    }

    info!(
        filled = report.holes_filled,
        skipped = report.skipped.len(),
        faces_added = report.faces_added,
        "Filled holes"
    );
    (mesh, report)
}
