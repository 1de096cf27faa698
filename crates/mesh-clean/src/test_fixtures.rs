//! Small meshes shared by unit tests.

use std::f64::consts::PI;
use std::io;
use std::sync::{Arc, Mutex};

use crate::types::{Mesh, Vertex};

/// Axis-aligned cube spanning `[min, min + size]` on every axis, outward winding.
pub(crate) fn cube(min: f64, size: f64) -> Mesh {
    let mut mesh = Mesh::new();
    let hi = min + size;
    for &(x, y, z) in &[
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

/// Unit cube at the origin.
pub(crate) fn unit_cube() -> Mesh {
    cube(0.0, 1.0)
}

/// Unit cube with the two top (z = 1) faces removed.
pub(crate) fn open_cube() -> Mesh {
    let mut mesh = unit_cube();
    mesh.faces.retain(|f| *f != [4, 5, 6] && *f != [4, 6, 7]);
    mesh
}

/// UV sphere centered at the origin with outward winding.
pub(crate) fn uv_sphere(radius: f64, segments: u32, rings: u32) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.vertices.push(Vertex::from_coords(0.0, radius, 0.0));
    for i in 1..rings {
        let phi = PI * f64::from(i) / f64::from(rings);
        let (y, rho) = (radius * phi.cos(), radius * phi.sin());
        for j in 0..segments {
            let theta = 2.0 * PI * f64::from(j) / f64::from(segments);
            mesh.vertices
                .push(Vertex::from_coords(rho * theta.cos(), y, rho * theta.sin()));
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

/// Flat square grid in the plane `y = height`, spanning `[-half, half]` in x
/// and z with `cells` quads per side, facing +y.
pub(crate) fn grid_floor(half: f64, cells: u32, height: f64) -> Mesh {
    let mut mesh = Mesh::new();
    let step = 2.0 * half / f64::from(cells);
    for i in 0..=cells {
        for j in 0..=cells {
            let x = -half + step * f64::from(i);
            let z = -half + step * f64::from(j);
            mesh.vertices.push(Vertex::from_coords(x, height, z));
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

/// Append `other` to `mesh` as a separate piece.
pub(crate) fn merged(mut mesh: Mesh, other: &Mesh) -> Mesh {
    let offset = mesh.vertices.len() as u32;
    mesh.vertices.extend_from_slice(&other.vertices);
    mesh.faces
        .extend(other.faces.iter().map(|f| f.map(|v| v + offset)));
    mesh
}

/// A ball resting on a large floor, the shape of a typical turntable scan.
pub(crate) fn ball_on_floor() -> Mesh {
    merged(uv_sphere(0.5, 24, 12), &grid_floor(2.0, 24, -0.5))
}

/// Runs `f` under a plain-text `fmt` subscriber and returns what it logged.
pub(crate) fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let buffer = buffer.clone();
            move || buffer.clone()
        })
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
