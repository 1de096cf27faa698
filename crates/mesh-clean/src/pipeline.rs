//! The scan cleaning pipeline.
//!
//! A raw scan usually contains the object plus the surface it stood on and
//! some of the surroundings. The pipeline finds the dominant plane, cuts
//! everything below it, trims to a box around the center, keeps the largest
//! piece, stands it upright and closes it.
//!
//! # Example
//!
//! ```
//! use mesh_clean::{CleanParams, CleanPipeline, Mesh, Stage, Vertex};
//!
//! // A 10x10 floor with a box hovering just above it.
//! let mut mesh = Mesh::new();
//! for i in 0..=10 {
//!     for j in 0..=10 {
//!         mesh.vertices.push(Vertex::from_coords(i as f64 - 5.0, 0.0, j as f64 - 5.0));
//!     }
//! }
//! for i in 0..10u32 {
//!     for j in 0..10u32 {
//!         let (a, b, c, d) = (i * 11 + j, (i + 1) * 11 + j, i * 11 + j + 1, (i + 1) * 11 + j + 1);
//!         mesh.faces.push([a, c, b]);
//!         mesh.faces.push([b, c, d]);
//!     }
//! }
//! let base = mesh.vertices.len() as u32;
//! for (x, y, z) in [
//!     (-1.0, 0.2, -1.0), (1.0, 0.2, -1.0), (1.0, 1.0, -1.0), (-1.0, 1.0, -1.0),
//!     (-1.0, 0.2, 1.0), (1.0, 0.2, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0),
//! ] {
//!     mesh.vertices.push(Vertex::from_coords(x, y, z));
//! }
//! for f in [
//!     [0, 2, 1], [0, 3, 2], [4, 5, 6], [4, 6, 7], [0, 1, 5], [0, 5, 4],
//!     [3, 7, 6], [3, 6, 2], [0, 4, 7], [0, 7, 3], [1, 2, 6], [1, 6, 5],
//! ] {
//!     mesh.faces.push(f.map(|v: u32| v + base));
//! }
//!
//! let params = CleanParams::default().with_seed(3);
//! let result = CleanPipeline::new(params).run(mesh).unwrap();
//! assert!(result.mesh.is_watertight());
//! assert_eq!(result.stages.last(), Some(&Stage::Done));
//! ```

use std::time::Instant;

use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::components::{Connectivity, select_largest_component};
use crate::diagnostics::{DiagnosticsSink, StageEvent, TracingSink};
use crate::error::{MeshError, MeshResult};
use crate::normalize::{Normalization, normalize_mesh};
use crate::plane::Plane;
use crate::ransac::{RansacConfig, fit_plane_to_mesh};
use crate::repair::{RepairParams, RepairReport, repair_mesh};
use crate::rotation::rotation_between;
use crate::slice::{SliceParams, slice_mesh};
use crate::tracing_ext::{OperationTimer, log_mesh_stats};
use crate::trim::trim_to_box;
use crate::types::Mesh;
use crate::winding::fix_winding;

/// Parameters for a cleaning run.
///
/// Distances are in normalized space, where the input's longest side is 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CleanParams {
    /// Maximum distance from the plane for a RANSAC inlier.
    pub ransac_threshold: f64,
    /// RANSAC candidate planes to try.
    pub ransac_iterations: usize,
    /// How far above the fitted plane the cut is made.
    pub plane_offset: f64,
    /// Side length of the centered box that survives trimming.
    pub trim_amount: f64,
    /// Make winding consistent before anything else.
    pub fix_winding: bool,
    /// Rotate the result so the plane normal points along +Y.
    pub reorient: bool,
    /// Leave the result in normalized space.
    pub normalize: bool,
    /// Keep only the component with the most vertices.
    pub keep_largest: bool,
    /// Repair the result and fill its holes.
    pub close_holes: bool,
    /// Send stage events to the diagnostics sink.
    pub verbose: bool,
    /// Seed for the plane fit. Entropy when `None`.
    pub seed: Option<u64>,
    /// Settings for the final repair.
    pub repair: RepairParams,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            ransac_threshold: 0.01,
            ransac_iterations: 1000,
            plane_offset: 0.005,
            trim_amount: 0.6,
            fix_winding: true,
            reorient: true,
            normalize: false,
            keep_largest: true,
            close_holes: true,
            verbose: false,
            seed: None,
            repair: RepairParams::default(),
        }
    }
}

impl CleanParams {
    pub fn with_ransac_threshold(mut self, threshold: f64) -> Self {
        self.ransac_threshold = threshold;
        self
    }

    pub fn with_ransac_iterations(mut self, iterations: usize) -> Self {
        self.ransac_iterations = iterations;
        self
    }

    pub fn with_plane_offset(mut self, offset: f64) -> Self {
        self.plane_offset = offset;
        self
    }

    pub fn with_trim_amount(mut self, amount: f64) -> Self {
        self.trim_amount = amount;
        self
    }

    pub fn with_fix_winding(mut self, enabled: bool) -> Self {
        self.fix_winding = enabled;
        self
    }

    pub fn with_reorient(mut self, enabled: bool) -> Self {
        self.reorient = enabled;
        self
    }

    pub fn with_normalize(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    pub fn with_keep_largest(mut self, enabled: bool) -> Self {
        self.keep_largest = enabled;
        self
    }

    pub fn with_close_holes(mut self, enabled: bool) -> Self {
        self.close_holes = enabled;
        self
    }

    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_repair(mut self, repair: RepairParams) -> Self {
        self.repair = repair;
        self
    }

    fn ransac_config(&self) -> RansacConfig {
        RansacConfig::default()
            .with_max_iterations(self.ransac_iterations)
            .with_inlier_threshold(self.ransac_threshold)
    }
}

// =========================================================================
// Configuration files
// =========================================================================

/// Errors loading or saving [`CleanParams`].
#[cfg(feature = "pipeline-config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "pipeline-config")]
impl CleanParams {
    /// Parse from TOML. Missing keys take their defaults.
    ///
    /// ```
    /// use mesh_clean::CleanParams;
    ///
    /// let params = CleanParams::from_toml("plane_offset = 0.01\nseed = 9\n").unwrap();
    /// assert_eq!(params.plane_offset, 0.01);
    /// assert_eq!(params.seed, Some(9));
    /// assert!(params.close_holes);
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =========================================================================
// Pipeline
// =========================================================================

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Raw,
    WindingFixed,
    Normalized,
    PlaneFitted,
    Oriented,
    Sliced,
    Trimmed,
    ComponentSelected,
    Reoriented,
    Denormalized,
    Repaired,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::WindingFixed => "winding_fixed",
            Stage::Normalized => "normalized",
            Stage::PlaneFitted => "plane_fitted",
            Stage::Oriented => "oriented",
            Stage::Sliced => "sliced",
            Stage::Trimmed => "trimmed",
            Stage::ComponentSelected => "component_selected",
            Stage::Reoriented => "reoriented",
            Stage::Denormalized => "denormalized",
            Stage::Repaired => "repaired",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleanResult {
    pub mesh: Mesh,
    /// The normalization applied to the input. It has been undone on `mesh`
    /// unless `normalize` was set.
    pub normalization: Normalization,
    /// The ground plane in normalized space, normal pointing at the object.
    pub plane: Plane,
    /// Rotation applied to the mesh (identity when `reorient` is off).
    pub rotation: Matrix3<f64>,
    /// Present when `close_holes` ran the repair.
    pub repair: Option<RepairReport>,
    /// Stages that ran, in order.
    pub stages: Vec<Stage>,
}

impl CleanResult {
    pub fn passed(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Runs the cleaning stages on a mesh.
pub struct CleanPipeline<'s> {
    params: CleanParams,
    sink: Option<Box<dyn DiagnosticsSink + 's>>,
}

impl<'s> CleanPipeline<'s> {
    pub fn new(params: CleanParams) -> Self {
        Self { params, sink: None }
    }

    /// Where stage events go when `verbose` is set. Defaults to [`TracingSink`].
    pub fn with_sink(mut self, sink: impl DiagnosticsSink + 's) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn params(&self) -> &CleanParams {
        &self.params
    }

    /// Clean `mesh` with a generator seeded from `params.seed`, or from
    /// entropy when no seed is set.
    pub fn run(&mut self, mesh: Mesh) -> MeshResult<CleanResult> {
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(mesh, &mut rng)
    }

    /// Clean `mesh` using the caller's random source for the plane fit.
    ///
    /// # Errors
    ///
    /// - `InvalidVertexIndex` / `InvalidCoordinate` for malformed input.
    /// - `EmptyMesh` when there is nothing to normalize, or nothing is left
    ///   after the cut, the trim or component selection.
    /// - `InsufficientData` / `DegenerateGeometry` when no plane can be fit.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &mut self,
        mesh: Mesh,
        rng: &mut R,
    ) -> MeshResult<CleanResult> {
        mesh.validate()?;
        let _timer = OperationTimer::for_mesh("clean_mesh", &mesh);
        let params = self.params.clone();
        let mut fallback_sink = TracingSink;
        let mut run = Run {
            sink: self.sink.as_deref_mut(),
            verbose: params.verbose,
            start: Instant::now(),
            stages: Vec::new(),
        };
        if run.sink.is_none() {
            run.sink = Some(&mut fallback_sink);
        }

        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            reorient = params.reorient,
            normalize = params.normalize,
            keep_largest = params.keep_largest,
            close_holes = params.close_holes,
            fix_winding = params.fix_winding,
            "Cleaning mesh"
        );
        run.record(Stage::Raw, "input", &mesh);

        let mesh = if params.fix_winding {
            let mesh = fix_winding(mesh);
            run.record(Stage::WindingFixed, "winding made consistent", &mesh);
            mesh
        } else {
            mesh
        };

        let (mesh, normalization) = normalize_mesh(mesh)?;
        run.record(
            Stage::Normalized,
            format!("scaled by {:.6}", normalization.scale),
            &mesh,
        );

        let fit = fit_plane_to_mesh(&mesh, &params.ransac_config(), rng)?;
        run.record(
            Stage::PlaneFitted,
            format!(
                "{} inliers after {} iterations",
                fit.inlier_count(),
                fit.iterations
            ),
            &mesh,
        );

        let plane = orient_plane(&mesh, fit.plane, params.ransac_threshold);
        run.record(
            Stage::Oriented,
            format!("normal {:.4?}", plane.normal.as_slice()),
            &mesh,
        );

        let mesh = slice_mesh(
            &mesh,
            &plane.offset(params.plane_offset),
            &SliceParams::default(),
        );
        if mesh.is_empty() {
            return Err(MeshError::empty_mesh("nothing left above the fitted plane"));
        }
        run.record(Stage::Sliced, "removed geometry below the plane", &mesh);

        let mesh = trim_to_box(&mesh, params.trim_amount / 2.0, &SliceParams::default());
        if mesh.is_empty() {
            return Err(MeshError::empty_mesh("nothing left inside the trim box"));
        }
        run.record(
            Stage::Trimmed,
            format!("trimmed to half-extent {}", params.trim_amount / 2.0),
            &mesh,
        );

        let mesh = if params.keep_largest {
            let mesh = select_largest_component(mesh, Connectivity::Edge)?;
            run.record(Stage::ComponentSelected, "kept largest component", &mesh);
            mesh
        } else {
            mesh
        };

        let rotation = if params.reorient {
            rotation_between(&Vector3::y(), &plane.normal).transpose()
        } else {
            Matrix3::identity()
        };
        let mesh = if params.reorient {
            let mesh = mesh.rotated(&rotation);
            run.record(Stage::Reoriented, "plane normal aligned with +Y", &mesh);
            mesh
        } else {
            mesh
        };

        let mesh = if params.normalize {
            mesh
        } else {
            let mesh = normalization.undo(mesh);
            run.record(Stage::Denormalized, "restored original scale", &mesh);
            mesh
        };

        let (mesh, repair) = if params.close_holes {
            let (mesh, report) = repair_mesh(mesh, &params.repair);
            run.record(
                Stage::Repaired,
                format!(
                    "filled {} holes, {} warnings",
                    report.holes.holes_filled,
                    report.warnings.len()
                ),
                &mesh,
            );
            (mesh, Some(report))
        } else {
            (mesh, None)
        };

        run.record(Stage::Done, "finished", &mesh);
        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            watertight = mesh.is_watertight(),
            "Cleaning complete"
        );

        Ok(CleanResult {
            mesh,
            normalization,
            plane,
            rotation,
            repair,
            stages: run.stages,
        })
    }
}

/// Clean a mesh with the given parameters.
pub fn clean_mesh(mesh: Mesh, params: &CleanParams) -> MeshResult<CleanResult> {
    CleanPipeline::new(params.clone()).run(mesh)
}

/// Per-run bookkeeping: stage list and event delivery.
struct Run<'a, 's> {
    sink: Option<&'a mut (dyn DiagnosticsSink + 's)>,
    verbose: bool,
    start: Instant,
    stages: Vec<Stage>,
}

impl Run<'_, '_> {
    fn record(&mut self, stage: Stage, message: impl Into<String>, mesh: &Mesh) {
        self.stages.push(stage);
        log_mesh_stats(mesh, stage.as_str());
        if !self.verbose {
            return;
        }
        if let Some(sink) = self.sink.as_deref_mut() {
            let event = StageEvent::new(stage, message, mesh.vertex_count(), mesh.face_count())
                .with_elapsed(self.start.elapsed());
            sink.report(&event);
        }
    }
}

/// Point the plane normal at the object.
///
/// Counts the vertices kept by a cut `threshold` above the plane and by a cut
/// `threshold` below it; the offset keeps points on the plane itself out of
/// both counts. The normal flips when more survive below. Ties keep the fit.
fn orient_plane(mesh: &Mesh, plane: Plane, threshold: f64) -> Plane {
    let uncapped = SliceParams::default().without_cap();
    let above = slice_mesh(mesh, &plane.offset(threshold), &uncapped).vertex_count();
    let below = slice_mesh(mesh, &plane.offset(-threshold), &uncapped.keep_negative()).vertex_count();

    debug!(above, below, "Orientation vertex counts");
    if below > above {
        plane.flipped()
    } else {
        plane
    }
}
