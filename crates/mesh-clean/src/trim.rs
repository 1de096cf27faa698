//! Trimming a mesh to an origin-centered cube.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::plane::Plane;
use crate::slice::{HalfSpace, SliceParams, slice_mesh};
use crate::types::Mesh;

/// The six inward-facing planes bounding `[-h, h]³`, ordered +x, -x, +y, -y, +z, -z.
pub fn box_planes(half_extent: f64) -> [Plane; 6] {
    let h = half_extent;
    let face = |axis: Vector3<f64>, sign: f64| Plane {
        point: Point3::from(axis * (sign * h)),
        normal: axis * -sign,
    };
    [
        face(Vector3::x(), 1.0),
        face(Vector3::x(), -1.0),
        face(Vector3::y(), 1.0),
        face(Vector3::y(), -1.0),
        face(Vector3::z(), 1.0),
        face(Vector3::z(), -1.0),
    ]
}

/// Discard everything outside the cube `[-h, h]³`.
///
/// Applies six successive cuts, keeping the inside of each face. The mesh is
/// expected to be centered near the origin already; nothing is recentered.
/// `params.keep` is ignored; the cap and tolerance settings are honored.
pub fn trim_to_box(mesh: &Mesh, half_extent: f64, params: &SliceParams) -> Mesh {
    let params = SliceParams {
        keep: HalfSpace::Positive,
        ..*params
    };

    let mut current = mesh.clone();
    for plane in box_planes(half_extent) {
        if current.is_empty() {
            break;
        }
        current = slice_mesh(&current, &plane, &params);
    }

    debug!(
        half_extent,
        faces_before = mesh.face_count(),
        faces_after = current.face_count(),
        "Trimmed to box"
    );
    current
}
