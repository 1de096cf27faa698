//! Cleanup for raw 3D scan meshes.
//!
//! A handheld or turntable scan of an object contains the object plus the
//! table it stood on and whatever else was nearby. This crate turns that into
//! a single closed, upright mesh:
//!
//! 1. make face winding consistent
//! 2. normalize into a unit box
//! 3. fit the dominant plane with RANSAC and point its normal at the object
//! 4. cut everything below the plane and trim to a centered box
//! 5. keep the largest connected component
//! 6. rotate so the plane normal is +Y and restore the original scale
//! 7. repair: weld, drop degenerate and non-manifold faces, fill holes
//!
//! Each step is also a public function, so the building blocks can be used
//! on their own.
//!
//! # Conventions
//!
//! Faces wind counter-clockwise seen from outside. Cleaned meshes stand on
//! the XZ plane with +Y up. Pipeline distances (`ransac_threshold`,
//! `plane_offset`, `trim_amount`) are in normalized units, where the longest
//! side of the input's bounding box is 1.
//!
//! # Quick Start
//!
//! ```
//! use mesh_clean::{CleanParams, Mesh, Vertex, clean_mesh};
//!
//! // A flat patch alone is all "floor": nothing survives the cut.
//! let mut mesh = Mesh::new();
//! mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
//! mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
//! mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0));
//! mesh.faces.push([0, 2, 1]);
//!
//! let params = CleanParams::default().with_seed(1);
//! assert!(clean_mesh(mesh, &params).is_err());
//! ```
//!
//! # Logging
//!
//! Everything is logged through `tracing`; see [`tracing_ext`]. Callers that
//! want per-stage events as values can pass a [`DiagnosticsSink`] to
//! [`CleanPipeline::with_sink`] and set `verbose`.
//!
//! # Feature flags
//!
//! - `parallel`: rayon for RANSAC scoring, hole filling and self-intersection
//!   detection. Results do not depend on it.
//! - `pipeline-config`: load and save [`CleanParams`] as TOML or JSON.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
pub mod tracing_ext;
mod triangulate;
mod types;

#[cfg(test)]
mod test_fixtures;

pub mod adjacency;
pub mod components;
pub mod diagnostics;
pub mod holes;
pub mod intersect;
pub mod normalize;
pub mod pipeline;
pub mod plane;
pub mod ransac;
pub mod repair;
pub mod rotation;
pub mod slice;
pub mod trim;
pub mod winding;

// Re-export core types at crate root
pub use error::{ErrorCode, MeshError, MeshResult, RecoverySuggestion, RepairWarning};
pub use types::{Bounds, Mesh, Triangle, Vertex};

pub use adjacency::MeshAdjacency;
pub use plane::Plane;
pub use rotation::rotation_between;

// Building blocks
pub use components::{
    Component, ComponentAnalysis, Connectivity, find_connected_components,
    select_largest_component, split_into_components,
};
pub use holes::{BoundaryLoop, HoleFillReport, detect_holes, fill_holes};
pub use intersect::{IntersectionParams, SelfIntersectionResult, detect_self_intersections};
pub use normalize::{Normalization, normalize_mesh};
pub use ransac::{PlaneFit, RansacConfig, fit_plane, fit_plane_to_mesh};
pub use repair::{
    RepairParams, RepairReport, fix_non_manifold_edges, remove_degenerate_faces,
    remove_duplicate_faces, remove_unreferenced_vertices, repair_mesh, weld_vertices,
};
pub use slice::{HalfSpace, SliceParams, slice_mesh};
pub use trim::{box_planes, trim_to_box};
pub use winding::fix_winding;

// Pipeline
pub use diagnostics::{DiagnosticsSink, NullSink, StageEvent, TracingSink};
#[cfg(feature = "pipeline-config")]
pub use pipeline::ConfigError;
pub use pipeline::{CleanParams, CleanPipeline, CleanResult, Stage, clean_mesh};
