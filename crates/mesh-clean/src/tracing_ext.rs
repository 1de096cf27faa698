//! Timing and mesh-state logging helpers.
//!
//! The crate never installs a subscriber. To see output, set one up in the
//! application:
//!
//! ```no_run
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//! // RUST_LOG=mesh_clean=debug for per-stage detail,
//! // RUST_LOG=mesh_clean::timing=info for timings only.
//! ```

use std::time::{Duration, Instant};

use tracing::{Span, debug, info};

use crate::types::Mesh;

/// Logs how long an operation took when dropped.
///
/// ```
/// use mesh_clean::tracing_ext::OperationTimer;
///
/// let timer = OperationTimer::new("slice");
/// assert!(timer.elapsed() >= std::time::Duration::ZERO);
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("mesh_operation", operation = name);
        debug!(target: "mesh_clean::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Timer whose span also records the size of the input mesh.
    pub fn for_mesh(name: &'static str, mesh: &Mesh) -> Self {
        let span = tracing::info_span!(
            "mesh_operation",
            operation = name,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count()
        );
        debug!(
            target: "mesh_clean::timing",
            operation = name,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "mesh_clean::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed().as_secs_f64() * 1000.0),
            "Operation completed"
        );
    }
}

/// Log vertex/face counts and extent of `mesh` at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let dims = mesh.bounds().map(|b| b.size()).unwrap_or_default();
    debug!(
        target: "mesh_clean::mesh_state",
        context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        boundary_edges = mesh.boundary_edge_count(),
        dimensions = format!("{:.4} x {:.4} x {:.4}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}
