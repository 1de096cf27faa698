//! Mesh repair: cleanup, hole filling and intersection resolution.
//!
//! [`repair_mesh`] runs every step in a fixed order and never fails. Anything
//! it cannot fix is reported as a [`RepairWarning`] in the [`RepairReport`].

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::adjacency::MeshAdjacency;
use crate::components::{Connectivity, find_connected_components};
use crate::error::RepairWarning;
use crate::holes::{HoleFillReport, fill_holes};
use crate::intersect::{IntersectionParams, detect_self_intersections};
use crate::types::Mesh;
use crate::winding::orient_faces;

/// Configuration for [`repair_mesh`].
///
/// Thresholds are in mesh units.
///
/// ```
/// use mesh_clean::RepairParams;
///
/// let params = RepairParams {
///     weld_epsilon: 0.01,
///     max_hole_edges: Some(64),
///     ..Default::default()
/// };
/// assert!(params.resolve_intersections);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RepairParams {
    /// Vertices closer than this are merged. Zero disables welding.
    ///
    /// Default: `1e-6`
    pub weld_epsilon: f64,

    /// Faces with an area at or below this are removed.
    ///
    /// Default: `1e-9`
    pub degenerate_area_threshold: f64,

    /// Holes with more boundary edges than this are left open.
    ///
    /// Default: `None` (fill everything)
    pub max_hole_edges: Option<usize>,

    /// Make winding consistent before filling holes.
    ///
    /// Default: `true`
    pub fix_winding: bool,

    /// Keep only the component with the most vertices.
    ///
    /// Default: `false`
    pub remove_small_components: bool,

    /// Remove self-intersecting faces and refill the gaps they leave.
    ///
    /// Default: `true`
    pub resolve_intersections: bool,

    /// Upper bound on remove-and-refill passes.
    ///
    /// Default: `3`
    pub max_intersection_passes: usize,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_epsilon: 1e-6,
            degenerate_area_threshold: 1e-9,
            max_hole_edges: None,
            fix_winding: true,
            remove_small_components: false,
            resolve_intersections: true,
            max_intersection_passes: 3,
        }
    }
}

impl RepairParams {
    /// Settings for noisy scan data: aggressive welding and debris removal.
    pub fn for_scans() -> Self {
        Self {
            weld_epsilon: 0.01,
            degenerate_area_threshold: 1e-4,
            max_hole_edges: Some(200),
            remove_small_components: true,
            ..Default::default()
        }
    }

    /// Only fill holes; leave everything else as it is.
    pub fn minimal() -> Self {
        Self {
            weld_epsilon: 0.0,
            degenerate_area_threshold: 0.0,
            fix_winding: false,
            resolve_intersections: false,
            ..Default::default()
        }
    }

    pub fn with_weld_epsilon(mut self, epsilon: f64) -> Self {
        self.weld_epsilon = epsilon;
        self
    }

    pub fn with_max_hole_edges(mut self, max_edges: usize) -> Self {
        self.max_hole_edges = Some(max_edges);
        self
    }

    pub fn with_small_component_removal(mut self, enabled: bool) -> Self {
        self.remove_small_components = enabled;
        self
    }

    pub fn with_intersection_resolution(mut self, enabled: bool) -> Self {
        self.resolve_intersections = enabled;
        self
    }
}

/// What [`repair_mesh`] changed and what it could not fix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub initial_vertices: usize,
    pub initial_faces: usize,
    pub final_vertices: usize,
    pub final_faces: usize,
    pub degenerate_faces_removed: usize,
    pub vertices_welded: usize,
    pub duplicate_faces_removed: usize,
    pub non_manifold_faces_removed: usize,
    pub small_component_faces_removed: usize,
    pub unreferenced_vertices_removed: usize,
    pub faces_flipped: usize,
    /// Hole filling across the main fill and every intersection pass.
    pub holes: HoleFillReport,
    pub intersection_passes: usize,
    pub intersecting_faces_removed: usize,
    pub warnings: Vec<RepairWarning>,
}

impl RepairReport {
    /// No warning says the result has open boundaries.
    pub fn is_watertight(&self) -> bool {
        !self.warnings.iter().any(RepairWarning::breaks_watertightness)
    }

    /// Whether steps before hole filling changed the mesh.
    pub fn cleanup_changed_mesh(&self) -> bool {
        self.degenerate_faces_removed
            + self.vertices_welded
            + self.duplicate_faces_removed
            + self.non_manifold_faces_removed
            + self.small_component_faces_removed
            + self.unreferenced_vertices_removed
            > 0
    }

    fn absorb_fill(&mut self, fill: HoleFillReport) {
        self.holes.holes_detected += fill.holes_detected;
        self.holes.holes_filled += fill.holes_filled;
        self.holes.faces_added += fill.faces_added;
        self.holes.skipped.extend(fill.skipped);
        self.holes.fallbacks.extend(fill.fallbacks);
    }
}

impl std::fmt::Display for RepairReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Repair Report:")?;
        writeln!(
            f,
            "  Vertices: {} -> {}",
            self.initial_vertices, self.final_vertices
        )?;
        writeln!(f, "  Faces: {} -> {}", self.initial_faces, self.final_faces)?;
        writeln!(
            f,
            "  Holes filled: {} of {} ({} faces added)",
            self.holes.holes_filled, self.holes.holes_detected, self.holes.faces_added
        )?;
        if self.intersection_passes > 0 {
            writeln!(
                f,
                "  Intersection passes: {} ({} faces removed)",
                self.intersection_passes, self.intersecting_faces_removed
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "  Warning [{}]: {}", warning.code(), warning)?;
        }
        Ok(())
    }
}

/// Remove faces with repeated indices or an area at or below `area_threshold`.
///
/// Returns the number of faces removed.
pub fn remove_degenerate_faces(mesh: &mut Mesh, area_threshold: f64) -> usize {
    let before = mesh.faces.len();
    let vertices = &mesh.vertices;
    mesh.faces.retain(|&[a, b, c]| {
        if a == b || b == c || a == c {
            return false;
        }
        let pa = vertices[a as usize].position;
        let pb = vertices[b as usize].position;
        let pc = vertices[c as usize].position;
        (pb - pa).cross(&(pc - pa)).norm() * 0.5 > area_threshold
    });

    let removed = before - mesh.faces.len();
    if removed > 0 {
        debug!(removed, area_threshold, "Removed degenerate faces");
    }
    removed
}

/// Merge vertices within `epsilon` of each other into the lowest index.
///
/// Faces are remapped and those that collapse are dropped. Merged vertices
/// stay in the list unreferenced. Returns the number of vertices merged.
pub fn weld_vertices(mesh: &mut Mesh, epsilon: f64) -> usize {
    if mesh.vertices.is_empty() || epsilon <= 0.0 {
        return 0;
    }

    let cell_size = epsilon * 2.0;
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        grid.entry(cell_of(&vertex.position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged = 0usize;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if remap[idx as usize] != idx {
            continue;
        }
        let (cx, cy, cz) = cell_of(&vertex.position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other as usize] != other {
                            continue;
                        }
                        let distance = (vertex.position - mesh.vertices[other as usize].position).norm();
                        if distance <= epsilon {
                            remap[other as usize] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    for face in &mut mesh.faces {
        *face = face.map(|v| remap[v as usize]);
    }
    mesh.faces.retain(|&[a, b, c]| a != b && b != c && a != c);

    debug!(merged, epsilon, "Welded vertices");
    merged
}

fn cell_of(p: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Remove faces that repeat an earlier face's vertex set, in either winding.
///
/// Returns the number of faces removed.
pub fn remove_duplicate_faces(mesh: &mut Mesh) -> usize {
    let before = mesh.faces.len();
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(before);
    mesh.faces.retain(|face| {
        let mut key = *face;
        key.sort_unstable();
        seen.insert(key)
    });

    let removed = before - mesh.faces.len();
    if removed > 0 {
        debug!(removed, "Removed duplicate faces");
    }
    removed
}

/// Reduce every edge shared by more than two faces to its two largest faces.
///
/// Area ties go to the lower face index. Returns the number of faces removed.
pub fn fix_non_manifold_edges(mesh: &mut Mesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut doomed: HashSet<u32> = HashSet::new();
    let mut edges = 0usize;

    for (a, b) in adjacency.non_manifold_edges() {
        edges += 1;
        let mut ranked: Vec<(u32, f64)> = adjacency
            .faces_for_edge(a, b)
            .iter()
            .map(|&f| {
                let area = mesh.triangle(f as usize).map_or(0.0, |t| t.area());
                (f, area)
            })
            .collect();
        ranked.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
        doomed.extend(ranked.iter().skip(2).map(|&(f, _)| f));
    }

    if doomed.is_empty() {
        return 0;
    }

    let mut index = 0u32;
    mesh.faces.retain(|_| {
        let keep = !doomed.contains(&index);
        index += 1;
        keep
    });

    debug!(edges, removed = doomed.len(), "Fixed non-manifold edges");
    doomed.len()
}

/// Drop vertices no face refers to, keeping the order of the rest.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> usize {
    let referenced = mesh.referenced_vertex_count();
    let removed = mesh.vertices.len() - referenced;
    if removed > 0 {
        *mesh = std::mem::take(mesh).compacted();
        debug!(removed, "Removed unreferenced vertices");
    }
    removed
}

/// Keep the faces of the component with the most vertices.
///
/// Returns the number of faces removed.
fn remove_small_components(mesh: &mut Mesh) -> usize {
    let analysis = find_connected_components(mesh, Connectivity::Edge);
    let Some(best) = analysis.largest_by_vertices() else {
        return 0;
    };
    if analysis.is_connected() {
        return 0;
    }

    let keep: HashSet<u32> = analysis.components[best].faces.iter().copied().collect();
    let before = mesh.faces.len();
    let mut index = 0u32;
    mesh.faces.retain(|_| {
        let kept = keep.contains(&index);
        index += 1;
        kept
    });

    let removed = before - mesh.faces.len();
    debug!(
        components = analysis.component_count() - 1,
        faces = removed,
        "Removed small components"
    );
    removed
}

/// Repair a mesh and report what happened.
///
/// Steps, in order: degenerate faces, welding, duplicate faces, non-manifold
/// edges, small components (optional), unreferenced vertices, winding
/// (optional), hole filling, intersection passes (optional), final checks.
///
/// Hole filling only appends faces, so when the cleanup steps find nothing to
/// do the input's vertices and face order survive as a prefix of the result.
///
/// ```
/// use mesh_clean::{Mesh, RepairParams, Vertex, repair_mesh};
///
/// // A tetrahedron with one face missing.
/// let mut mesh = Mesh::new();
/// for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
///     mesh.vertices.push(Vertex::from_coords(p[0], p[1], p[2]));
/// }
/// mesh.faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2]];
///
/// let (repaired, report) = repair_mesh(mesh, &RepairParams::default());
/// assert!(repaired.is_watertight());
/// assert_eq!(report.holes.faces_added, 1);
/// assert!(report.warnings.is_empty());
/// ```
pub fn repair_mesh(mut mesh: Mesh, params: &RepairParams) -> (Mesh, RepairReport) {
    let mut report = RepairReport {
        initial_vertices: mesh.vertex_count(),
        initial_faces: mesh.face_count(),
        ..Default::default()
    };

    if mesh.faces.is_empty() {
        warn!("Mesh has no faces, skipping repair");
        report.final_vertices = mesh.vertex_count();
        return (mesh, report);
    }

    info!(
        vertices = report.initial_vertices,
        faces = report.initial_faces,
        weld_epsilon = params.weld_epsilon,
        "Repairing mesh"
    );

    report.degenerate_faces_removed =
        remove_degenerate_faces(&mut mesh, params.degenerate_area_threshold);
    report.vertices_welded = weld_vertices(&mut mesh, params.weld_epsilon);
    report.duplicate_faces_removed = remove_duplicate_faces(&mut mesh);
    report.non_manifold_faces_removed = fix_non_manifold_edges(&mut mesh);
    if params.remove_small_components {
        report.small_component_faces_removed = remove_small_components(&mut mesh);
    }
    report.unreferenced_vertices_removed = remove_unreferenced_vertices(&mut mesh);

    if params.fix_winding {
        report.faces_flipped = orient_faces(&mut mesh.faces).flipped;
    }

    let (filled, fill) = fill_holes(mesh, params.max_hole_edges);
    mesh = filled;
    report.absorb_fill(fill);

    if params.resolve_intersections {
        mesh = resolve_intersections(mesh, params, &mut report);
    }

    for &edges in &report.holes.skipped {
        report.warnings.push(RepairWarning::SkippedHole {
            edges,
            max_edges: params.max_hole_edges.unwrap_or(usize::MAX),
        });
    }
    for &loop_len in &report.holes.fallbacks {
        report
            .warnings
            .push(RepairWarning::TriangulationFallback { loop_len });
    }

    let adjacency = mesh.adjacency();
    let boundary_edges = adjacency.boundary_edge_count();
    if boundary_edges > 0 {
        report
            .warnings
            .push(RepairWarning::OpenBoundary { boundary_edges });
    }
    let non_manifold = adjacency.non_manifold_edge_count();
    if non_manifold > 0 {
        report
            .warnings
            .push(RepairWarning::NonManifold { edges: non_manifold });
    }

    for warning in &report.warnings {
        warn!(code = %warning.code(), "{warning}");
    }

    report.final_vertices = mesh.vertex_count();
    report.final_faces = mesh.face_count();
    info!(
        vertices = report.final_vertices,
        faces = report.final_faces,
        holes_filled = report.holes.holes_filled,
        warnings = report.warnings.len(),
        "Repair complete"
    );
    (mesh, report)
}

/// Remove intersecting faces and refill, until clean or out of passes.
fn resolve_intersections(mut mesh: Mesh, params: &RepairParams, report: &mut RepairReport) -> Mesh {
    let detect = IntersectionParams::default();
    let mut result = detect_self_intersections(&mesh, &detect);

    while !result.is_clean() && report.intersection_passes < params.max_intersection_passes {
        report.intersection_passes += 1;
        let offending: HashSet<u32> = result.faces().into_iter().collect();
        report.intersecting_faces_removed += offending.len();

        let mut index = 0u32;
        mesh.faces.retain(|_| {
            let keep = !offending.contains(&index);
            index += 1;
            keep
        });
        remove_unreferenced_vertices(&mut mesh);

        let (filled, fill) = fill_holes(mesh, params.max_hole_edges);
        mesh = filled;
        report.absorb_fill(fill);

        debug!(
            pass = report.intersection_passes,
            removed = offending.len(),
            "Intersection pass"
        );
        result = detect_self_intersections(&mesh, &detect);
    }

    if !result.is_clean() {
        report.warnings.push(RepairWarning::UnresolvedIntersections {
            pairs: result.intersection_count,
        });
    }
    mesh
}
