//! Mesh fixtures shared by the integration tests.

#![allow(dead_code)]

use std::f64::consts::PI;

use mesh_clean::{Mesh, Vertex};
use nalgebra::Vector3;

/// UV sphere centered at the origin with outward winding.
///
/// Vertex count is `2 + segments * (rings - 1)`.
pub fn uv_sphere(radius: f64, segments: u32, rings: u32) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.vertices.push(Vertex::from_coords(0.0, radius, 0.0));
    for i in 1..rings {
        let phi = PI * f64::from(i) / f64::from(rings);
        for j in 0..segments {
            let theta = 2.0 * PI * f64::from(j) / f64::from(segments);
            mesh.vertices.push(Vertex::from_coords(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            ));
        }
    }
    let bottom = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::from_coords(0.0, -radius, 0.0));

    let ring = |i: u32, j: u32| 1 + (i - 1) * segments + (j % segments);
    for j in 0..segments {
        mesh.faces.push([0, ring(1, j + 1), ring(1, j)]);
    }
    for i in 1..rings - 1 {
        for j in 0..segments {
            let (a, b) = (ring(i, j), ring(i, j + 1));
            let (c, d) = (ring(i + 1, j), ring(i + 1, j + 1));
            mesh.faces.push([a, b, d]);
            mesh.faces.push([a, d, c]);
        }
    }
    for j in 0..segments {
        mesh.faces.push([ring(rings - 1, j), ring(rings - 1, j + 1), bottom]);
    }
    mesh
}

/// Square grid at `y = height` spanning `[-half, half]` in x and z, facing +y.
pub fn grid_floor(half: f64, cells: u32, height: f64) -> Mesh {
    let mut mesh = Mesh::new();
    let step = 2.0 * half / f64::from(cells);
    for i in 0..=cells {
        for j in 0..=cells {
            mesh.vertices.push(Vertex::from_coords(
                -half + step * f64::from(i),
                height,
                -half + step * f64::from(j),
            ));
        }
    }
    let at = |i: u32, j: u32| i * (cells + 1) + j;
    for i in 0..cells {
        for j in 0..cells {
            let (a, b) = (at(i, j), at(i + 1, j));
            let (c, d) = (at(i, j + 1), at(i + 1, j + 1));
            mesh.faces.push([a, c, b]);
            mesh.faces.push([b, c, d]);
        }
    }
    mesh
}

/// Sphere centered at the origin whose lowest latitude ring sits
/// `base_height` above the bottom pole. Rings are evenly spaced in polar angle
/// down to that one, and a single fan closes the bottom. Outward winding.
///
/// Vertex count is `2 + segments * rings`.
pub fn scan_sphere(radius: f64, segments: u32, rings: u32, base_height: f64) -> Mesh {
    let lowest = ((base_height - radius) / radius).acos();
    let mut mesh = Mesh::new();
    mesh.vertices.push(Vertex::from_coords(0.0, radius, 0.0));
    for i in 1..=rings {
        let phi = lowest * f64::from(i) / f64::from(rings);
        for j in 0..segments {
            let theta = 2.0 * PI * f64::from(j) / f64::from(segments);
            mesh.vertices.push(Vertex::from_coords(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            ));
        }
    }
    let bottom = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::from_coords(0.0, -radius, 0.0));

    let ring = |i: u32, j: u32| 1 + (i - 1) * segments + (j % segments);
    for j in 0..segments {
        mesh.faces.push([0, ring(1, j + 1), ring(1, j)]);
    }
    for i in 1..rings {
        for j in 0..segments {
            let (a, b) = (ring(i, j), ring(i, j + 1));
            let (c, d) = (ring(i + 1, j), ring(i + 1, j + 1));
            mesh.faces.push([a, b, d]);
            mesh.faces.push([a, d, c]);
        }
    }
    for j in 0..segments {
        mesh.faces.push([ring(rings, j), ring(rings, j + 1), bottom]);
    }
    mesh
}

/// Append `other` to `mesh` without sharing any vertices.
pub fn merged(mut mesh: Mesh, other: &Mesh) -> Mesh {
    let offset = mesh.vertices.len() as u32;
    mesh.vertices.extend_from_slice(&other.vertices);
    mesh.faces
        .extend(other.faces.iter().map(|f| f.map(|v| v + offset)));
    mesh
}

/// Append `other` to `mesh`, reusing every `mesh` vertex that one of
/// `other`'s vertices lands on.
pub fn welded(mut mesh: Mesh, other: &Mesh) -> Mesh {
    let existing = mesh.vertices.len();
    let mut remap = Vec::with_capacity(other.vertices.len());
    for v in &other.vertices {
        let found = mesh.vertices[..existing]
            .iter()
            .position(|w| (w.position - v.position).norm() < 1e-9);
        remap.push(match found {
            Some(i) => i as u32,
            None => {
                mesh.vertices.push(*v);
                (mesh.vertices.len() - 1) as u32
            }
        });
    }
    mesh.faces
        .extend(other.faces.iter().map(|f| f.map(|v| remap[v as usize])));
    mesh
}

pub const SPHERE_SEGMENTS: u32 = 16;
pub const SPHERE_RINGS: u32 = 150;
/// Height of the sphere's lowest ring above the floor.
pub const SPHERE_BASE: f64 = 0.1;

/// The sphere used by [`sphere_on_floor`]: radius 0.5, 2402 vertices, 4800 faces.
pub fn scene_sphere() -> Mesh {
    scan_sphere(0.5, SPHERE_SEGMENTS, SPHERE_RINGS, SPHERE_BASE)
}

/// A sphere welded by its bottom pole onto the center vertex of a 4x4 floor
/// at `y = -0.5`.
///
/// The floor makes the normalization scale 1/4, so the default cut sits 0.02
/// above the floor and only crosses the bottom fan. Nothing but the pole lies
/// within the RANSAC band of the floor.
pub fn sphere_on_floor() -> Mesh {
    welded(grid_floor(2.0, 40, -0.5), &scene_sphere())
}

/// An open-bottom box standing in a square hole of a 4x4 floor at `y = -0.5`,
/// its rim welded to the hole's boundary so the scan is one surface.
///
/// The box spans `[-0.5, 0.5]` in x and z and rises to `y = 0.5`. Its rim and
/// top outline have 40 vertices each, matching the 0.1 floor cells.
pub fn box_in_floor() -> Mesh {
    let mut floor = grid_floor(2.0, 40, -0.5);
    floor.faces.retain(|f| {
        let c: Vector3<f64> = f
            .iter()
            .map(|&v| floor.vertices[v as usize].position.coords)
            .sum::<Vector3<f64>>()
            / 3.0;
        c.x.abs() > 0.5 || c.z.abs() > 0.5
    });
    let floor = floor.compacted();

    let corners = [(-0.5, 0.5), (0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)];
    let outline: Vec<(f64, f64)> = (0..4)
        .flat_map(|s| {
            let (a, b) = (corners[s], corners[(s + 1) % 4]);
            (0..10).map(move |k| {
                let t = f64::from(k) / 10.0;
                (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
            })
        })
        .collect();

    let n = outline.len() as u32;
    let mut walls = Mesh::new();
    for y in [-0.5, 0.5] {
        for &(x, z) in &outline {
            walls.vertices.push(Vertex::from_coords(x, y, z));
        }
    }
    walls.vertices.push(Vertex::from_coords(0.0, 0.5, 0.0));
    let center = 2 * n;
    for k in 0..n {
        let next = (k + 1) % n;
        let (r0, r1, t0, t1) = (k, next, n + k, n + next);
        walls.faces.push([r0, r1, t1]);
        walls.faces.push([r0, t1, t0]);
        walls.faces.push([center, t0, t1]);
    }
    welded(floor, &walls)
}

/// Axis-aligned cube spanning `[min, min + size]`, outward winding.
pub fn cube(min: f64, size: f64) -> Mesh {
    let hi = min + size;
    let mut mesh = Mesh::new();
    for (x, y, z) in [
        (min, min, min),
        (hi, min, min),
        (hi, hi, min),
        (min, hi, min),
        (min, min, hi),
        (hi, min, hi),
        (hi, hi, hi),
        (min, hi, hi),
    ] {
        mesh.vertices.push(Vertex::from_coords(x, y, z));
    }
    mesh.faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    mesh
}

/// Unit cube missing its top (z = 1) face.
pub fn open_cube() -> Mesh {
    let mut mesh = cube(0.0, 1.0);
    mesh.faces.drain(2..4);
    mesh
}
