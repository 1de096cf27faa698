//! Fit a mesh into the unit cube and undo it afterwards.
//!
//! The translation is the bounding-box center and the scale is the reciprocal
//! of the largest extent, so the normalized mesh spans `[-0.5, 0.5]` along its
//! longest axis. Thresholds such as the RANSAC inlier distance are expressed in
//! this normalized space.

use nalgebra::Vector3;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::types::Mesh;

/// Translation and scale applied by [`normalize_mesh`].
///
/// A normalized position is `(p - translation) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub translation: Vector3<f64>,
    pub scale: f64,
}

impl Normalization {
    /// Identity normalization (no translation, unit scale).
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            scale: 1.0,
        }
    }

    /// Compute the normalization for a mesh without applying it.
    ///
    /// Fails with `EmptyMesh` when there are no vertices and with
    /// `DegenerateGeometry` when the bounding box has no (finite) extent.
    pub fn of(mesh: &Mesh) -> MeshResult<Self> {
        let bounds = mesh
            .bounds()
            .ok_or_else(|| MeshError::empty_mesh("cannot normalize a mesh without vertices"))?;
        let extent = bounds.max_extent();
        if !(extent.is_finite() && extent > 0.0) {
            return Err(MeshError::degenerate_geometry(format!(
                "bounding box has max extent {extent}"
            )));
        }

        Ok(Self {
            translation: bounds.center().coords,
            scale: 1.0 / extent,
        })
    }

    /// Map a mesh into normalized space.
    pub fn apply(&self, mesh: Mesh) -> Mesh {
        mesh.translated(&-self.translation).scaled(self.scale)
    }

    /// Map a normalized mesh back to the original coordinates.
    pub fn undo(&self, mesh: Mesh) -> Mesh {
        mesh.scaled(1.0 / self.scale).translated(&self.translation)
    }
}

/// Center the mesh at the origin and scale its longest side to 1.
///
/// Returns the normalized mesh together with the parameters needed to undo it.
pub fn normalize_mesh(mesh: Mesh) -> MeshResult<(Mesh, Normalization)> {
    let normalization = Normalization::of(&mesh)?;
    debug!(
        translation = ?normalization.translation,
        scale = normalization.scale,
        "Normalizing mesh"
    );
    Ok((normalization.apply(mesh), normalization))
}
