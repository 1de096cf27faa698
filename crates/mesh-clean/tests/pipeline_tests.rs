//! End-to-end tests for the cleaning pipeline.

mod common;

use std::sync::mpsc;

use approx::assert_relative_eq;
use common::{
    SPHERE_SEGMENTS, box_in_floor, cube, grid_floor, merged, open_cube, scene_sphere,
    sphere_on_floor, uv_sphere,
};
use mesh_clean::{
    CleanParams, CleanPipeline, Connectivity, ErrorCode, Mesh, MeshError, RansacConfig,
    RepairParams, Stage, StageEvent, Vertex, clean_mesh, find_connected_components,
    fit_plane_to_mesh, normalize_mesh,
};
use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn params() -> CleanParams {
    CleanParams::default().with_seed(2024)
}

#[test]
fn test_plane_fit_finds_floor() {
    let (mesh, _) = normalize_mesh(sphere_on_floor()).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let fit = fit_plane_to_mesh(&mesh, &RansacConfig::default(), &mut rng).unwrap();

    let cos = fit.plane.normal.dot(&Vector3::y()).abs();
    assert!(cos > 5.0_f64.to_radians().cos(), "normal {:?}", fit.plane.normal);
    assert!(fit.inlier_count() >= 41 * 41);
}

#[test]
fn test_sphere_on_floor_end_to_end() {
    let result = clean_mesh(sphere_on_floor(), &params()).unwrap();

    // Oriented toward the sphere and within 5 degrees of +Y.
    let angle = result.plane.normal.angle(&Vector3::y());
    assert!(angle < 5.0_f64.to_radians(), "plane normal off by {angle} rad");

    // Only the sphere is left, minus its bottom pole.
    let sphere_vertices = scene_sphere().vertex_count() as f64;
    let kept = result.mesh.vertex_count() as f64;
    assert!(
        (kept - sphere_vertices).abs() / sphere_vertices < 0.01,
        "kept {kept} of {sphere_vertices}"
    );
    let bounds = result.mesh.bounds().unwrap();
    assert!(bounds.min.y > -0.5);
    assert!(bounds.size().x < 1.0 + 1e-6 && bounds.size().z < 1.0 + 1e-6);

    assert!(result.mesh.is_watertight());
    let report = result.repair.as_ref().unwrap();
    assert!(report.is_watertight());
    assert!(report.warnings.is_empty(), "{report}");
}

#[test]
fn test_fit_ignores_the_object() {
    // Only the bottom pole is near the floor, so the fit is the floor itself.
    let result = clean_mesh(sphere_on_floor(), &params()).unwrap();
    assert_relative_eq!(result.plane.normal, Vector3::y(), epsilon = 1e-12);

    // The cut crosses the bottom fan only: the pole goes, one vertex per
    // segment comes in.
    let expected = scene_sphere().vertex_count() - 1 + SPHERE_SEGMENTS as usize;
    assert_eq!(result.mesh.vertex_count(), expected);
}

#[test]
fn test_welded_box_is_separated_from_floor() {
    let scene = box_in_floor();
    assert!(find_connected_components(&scene, Connectivity::Edge).is_connected());

    let result = clean_mesh(scene, &params()).unwrap();
    let angle = result.plane.normal.angle(&Vector3::y());
    assert!(angle < 5.0_f64.to_radians(), "plane normal off by {angle} rad");
    assert!(result.mesh.is_watertight());

    // Walls and lid survive above the cut; nothing of the floor does.
    let b = result.mesh.bounds().unwrap();
    assert!(b.min.y > -0.5 && b.min.y < -0.45, "min y {}", b.min.y);
    assert_relative_eq!(b.max.y, 0.5, epsilon = 1e-9);
    assert!(b.min.x >= -0.5 - 1e-9 && b.max.x <= 0.5 + 1e-9);
    assert!(b.min.z >= -0.5 - 1e-9 && b.max.z <= 0.5 + 1e-9);
}

#[test]
fn test_result_is_upright_after_tilt() {
    // Tilt the whole scene 20 degrees about z; reorientation undoes it.
    let tilt = nalgebra::Rotation3::from_axis_angle(&Vector3::z_axis(), 20.0_f64.to_radians());
    let scene = sphere_on_floor().rotated(tilt.matrix());

    let result = clean_mesh(scene, &params()).unwrap();

    // The fitted plane is the tilted floor, and the rotation maps it to +Y.
    let floor_normal = tilt * Vector3::y();
    let angle = result.plane.normal.angle(&floor_normal);
    assert!(angle < 5.0_f64.to_radians(), "plane normal off by {angle} rad");
    assert!((result.rotation * result.plane.normal - Vector3::y()).norm() < 1e-9);

    // The cut face is horizontal: every cut vertex shares the lowest height.
    let b = result.mesh.bounds().unwrap();
    let bottom = result
        .mesh
        .vertices
        .iter()
        .filter(|v| v.position.y < b.min.y + 1e-6)
        .count();
    assert!(bottom >= SPHERE_SEGMENTS as usize, "{bottom} vertices on the cut");
}

#[test]
fn test_same_seed_same_result() {
    let a = clean_mesh(sphere_on_floor(), &params()).unwrap();
    let b = clean_mesh(sphere_on_floor(), &params()).unwrap();
    assert_eq!(a.mesh, b.mesh);
    assert_eq!(a.plane, b.plane);
}

#[test]
fn test_close_holes_only_appends() {
    let open = clean_mesh(sphere_on_floor(), &params().with_close_holes(false)).unwrap();
    let closed = clean_mesh(sphere_on_floor(), &params()).unwrap();

    assert_eq!(open.mesh.vertices, closed.mesh.vertices);
    assert!(closed.mesh.faces.starts_with(&open.mesh.faces));
    assert!(open.repair.is_none());
    assert!(!open.stages.contains(&Stage::Repaired));
}

#[test]
fn test_normalize_keeps_unit_space() {
    let result = clean_mesh(sphere_on_floor(), &params().with_normalize(true)).unwrap();
    let b = result.mesh.bounds().unwrap();
    assert!(b.max_extent() <= 0.25 + 1e-9);
    assert_relative_eq!(result.normalization.scale, 0.25, epsilon = 1e-12);
    assert!(!result.stages.contains(&Stage::Denormalized));
}

#[test]
fn test_keep_largest_off_keeps_debris() {
    let debris = cube(0.0, 0.1).translated(&Vector3::new(0.9, -0.45, 0.9));
    let scene = merged(sphere_on_floor(), &debris);

    let largest = clean_mesh(scene.clone(), &params()).unwrap();
    let everything = clean_mesh(scene, &params().with_keep_largest(false)).unwrap();

    assert!(largest.mesh.bounds().unwrap().max.x < 0.6);
    assert!(everything.mesh.bounds().unwrap().max.x > 0.9);
}

#[test]
fn test_trim_cuts_far_geometry() {
    // A second sphere far from the center is outside the trim box.
    let far = uv_sphere(0.3, 16, 8).translated(&Vector3::new(1.6, -0.2, 1.6));
    let scene = merged(sphere_on_floor(), &far);
    let result = clean_mesh(scene, &params().with_keep_largest(false)).unwrap();
    assert!(result.mesh.bounds().unwrap().max.x < 1.2 + 1e-9);
}

#[test]
fn test_verbose_events_over_channel() {
    let (tx, rx) = mpsc::channel::<StageEvent>();
    let result = CleanPipeline::new(params().with_verbose(true))
        .with_sink(tx)
        .run(sphere_on_floor())
        .unwrap();

    let stages: Vec<Stage> = rx.try_iter().map(|e| e.stage).collect();
    assert_eq!(stages, result.stages);
    assert_eq!(stages.first(), Some(&Stage::Raw));
    assert_eq!(stages.last(), Some(&Stage::Done));
}

#[test]
fn test_custom_repair_params() {
    // Scan settings weld at 0.01, so use a coarse ball hovering over the floor.
    let ball = uv_sphere(0.5, 24, 12).translated(&Vector3::new(0.0, 0.1, 0.0));
    let scene = merged(grid_floor(2.0, 40, -0.5), &ball);

    let result = clean_mesh(scene, &params().with_repair(RepairParams::for_scans())).unwrap();
    assert!(result.mesh.is_watertight());
    assert_eq!(result.mesh.vertex_count(), ball.vertex_count());
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_empty_mesh_is_an_error() {
    let err = clean_mesh(Mesh::new(), &params()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::EmptyMesh);
}

#[test]
fn test_too_few_vertices() {
    let mut mesh = Mesh::new();
    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
    mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
    let err = clean_mesh(mesh, &params()).unwrap_err();
    assert!(matches!(err, MeshError::InsufficientData { required: 3, actual: 2 }));
}

#[test]
fn test_collinear_points_are_degenerate() {
    let mut mesh = Mesh::new();
    for i in 0..10 {
        mesh.vertices.push(Vertex::from_coords(f64::from(i), 0.0, 0.0));
    }
    let err = clean_mesh(mesh, &params().with_ransac_iterations(50)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DegenerateGeometry);
}

#[test]
fn test_floor_only_leaves_nothing() {
    let err = clean_mesh(grid_floor(1.0, 10, 0.0), &params()).unwrap_err();
    assert!(matches!(err, MeshError::EmptyMesh { .. }), "{err}");
}

#[test]
fn test_out_of_range_index() {
    let mut mesh = open_cube();
    mesh.faces.push([0, 1, 42]);
    let err = clean_mesh(mesh, &params()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidVertexIndex);
}

#[test]
fn test_non_finite_coordinate() {
    let mut mesh = cube(0.0, 1.0);
    mesh.vertices[3] = Vertex::from_coords(f64::NAN, 0.0, 0.0);
    let err = clean_mesh(mesh, &params()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidCoordinate);
}
