//! Error types for the cleaning pipeline with rich diagnostics.
//!
//! Two kinds of problems are reported:
//! - [`MeshError`]: fatal conditions that make further processing meaningless
//!   (too few points to fit a plane, nothing left after a cut, a zero-size
//!   bounding box). These abort the pipeline.
//! - [`RepairWarning`]: non-fatal repair quality issues. The repairer returns the
//!   best mesh it could produce together with the warnings.
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `MESH-XXXX`:
//! - `MESH-2xxx`: Validation errors (input data, geometry preconditions)
//! - `MESH-3xxx`: Repair warnings (watertightness not fully achieved)
//!
//! # Example
//!
//! ```
//! use mesh_clean::{ErrorCode, MeshError};
//!
//! let err = MeshError::insufficient_data(3, 2);
//! assert_eq!(err.code(), ErrorCode::InsufficientData);
//! assert_eq!(err.code().as_str(), "MESH-2004");
//! ```

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors (2xxx)
    /// MESH-2001: Face references invalid vertex index
    InvalidVertexIndex = 2001,
    /// MESH-2002: Vertex has NaN or Infinity coordinate
    InvalidCoordinate = 2002,
    /// MESH-2003: Mesh has no faces left to process
    EmptyMesh = 2003,
    /// MESH-2004: Too few points for a fit
    InsufficientData = 2004,
    /// MESH-2005: Geometry is degenerate (zero extent, collinear points)
    DegenerateGeometry = 2005,

    // Repair warnings (3xxx)
    /// MESH-3001: Open boundary edges remain after repair
    OpenBoundary = 3001,
    /// MESH-3002: Non-manifold edges remain after repair
    NonManifold = 3002,
    /// MESH-3003: Self-intersections remain after repair
    UnresolvedIntersections = 3003,
    /// MESH-3004: A hole could not be ear-clipped and was fan-filled
    TriangulationFallback = 3004,
    /// MESH-3005: A hole exceeded the size limit and was left open
    SkippedHole = 3005,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `MESH-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidVertexIndex => "MESH-2001",
            ErrorCode::InvalidCoordinate => "MESH-2002",
            ErrorCode::EmptyMesh => "MESH-2003",
            ErrorCode::InsufficientData => "MESH-2004",
            ErrorCode::DegenerateGeometry => "MESH-2005",
            ErrorCode::OpenBoundary => "MESH-3001",
            ErrorCode::NonManifold => "MESH-3002",
            ErrorCode::UnresolvedIntersections => "MESH-3003",
            ErrorCode::TriangulationFallback => "MESH-3004",
            ErrorCode::SkippedHole => "MESH-3005",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for mesh errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check the source scan for issues.
    CheckSourceMesh { checks: Vec<String> },
    /// Adjust pipeline parameters.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source mesh for: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Errors that abort the cleaning pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    /// Not enough points to fit a model.
    #[error("insufficient data: need at least {required} points, got {actual}")]
    #[diagnostic(
        code(mesh_clean::fit::insufficient_data),
        help("Plane fitting needs at least three vertices. Check that the scan was loaded correctly.")
    )]
    InsufficientData { required: usize, actual: usize },

    /// No faces remain (or none were provided).
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(mesh_clean::validation::empty),
        help(
            "All geometry was discarded. Try a larger trim_amount or a smaller plane_offset, or check that the object sits above the detected plane."
        )
    )]
    EmptyMesh { details: String },

    /// Geometry too degenerate to process (zero-size bounds, collinear points).
    #[error("degenerate geometry: {details}")]
    #[diagnostic(
        code(mesh_clean::validation::degenerate),
        help("The input has no spatial extent in at least one required direction.")
    )]
    DegenerateGeometry { details: String },

    /// Invalid vertex index in face data.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(mesh_clean::validation::vertex_index),
        help("Remove faces with out-of-range indices before handing the mesh to the pipeline.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Invalid coordinate value (NaN or Infinity).
    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(mesh_clean::validation::coordinate),
        help("Check the scan export for numerical issues.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },
}

impl MeshError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::InsufficientData { .. } => ErrorCode::InsufficientData,
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            MeshError::DegenerateGeometry { .. } => ErrorCode::DegenerateGeometry,
            MeshError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            MeshError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            MeshError::InsufficientData { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["mesh has vertices".into(), "loader output".into()],
            },
            MeshError::EmptyMesh { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![
                    ("trim_amount".into(), "try a larger value".into()),
                    ("plane_offset".into(), "try a smaller value".into()),
                ],
            },
            MeshError::DegenerateGeometry { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["vertex spread".into(), "duplicate vertices".into()],
            },
            MeshError::InvalidVertexIndex { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["face indices".into()],
            },
            MeshError::InvalidCoordinate { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["coordinate values".into(), "export precision".into()],
            },
        }
    }

    // Constructor helpers

    /// Create an InsufficientData error.
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        MeshError::InsufficientData { required, actual }
    }

    /// Create an EmptyMesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }

    /// Create a DegenerateGeometry error.
    pub fn degenerate_geometry(details: impl Into<String>) -> Self {
        MeshError::DegenerateGeometry {
            details: details.into(),
        }
    }

    /// Create an InvalidVertexIndex error.
    pub fn invalid_vertex_index(face_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        MeshError::InvalidVertexIndex {
            face_index,
            vertex_index,
            vertex_count,
        }
    }

    /// Create an InvalidCoordinate error.
    pub fn invalid_coordinate(vertex_index: usize, coordinate: &'static str, value: f64) -> Self {
        MeshError::InvalidCoordinate {
            vertex_index,
            coordinate,
            value,
        }
    }
}

/// Non-fatal issues raised by the repairer.
///
/// Unlike [`MeshError`], these never stop processing. The repaired mesh is
/// still returned; the warnings tell the caller how far from watertight it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairWarning {
    /// Open boundary edges remain.
    OpenBoundary { boundary_edges: usize },
    /// Edges shared by more than two faces remain.
    NonManifold { edges: usize },
    /// Intersecting face pairs remain after all resolution passes.
    UnresolvedIntersections { pairs: usize },
    /// Ear clipping stalled on a loop; the remainder was fan-filled.
    TriangulationFallback { loop_len: usize },
    /// A hole larger than the configured limit was left open.
    SkippedHole { edges: usize, max_edges: usize },
}

impl RepairWarning {
    /// Returns the warning code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RepairWarning::OpenBoundary { .. } => ErrorCode::OpenBoundary,
            RepairWarning::NonManifold { .. } => ErrorCode::NonManifold,
            RepairWarning::UnresolvedIntersections { .. } => ErrorCode::UnresolvedIntersections,
            RepairWarning::TriangulationFallback { .. } => ErrorCode::TriangulationFallback,
            RepairWarning::SkippedHole { .. } => ErrorCode::SkippedHole,
        }
    }

    /// Whether this warning means the output is not watertight.
    pub fn breaks_watertightness(&self) -> bool {
        matches!(
            self,
            RepairWarning::OpenBoundary { .. } | RepairWarning::SkippedHole { .. }
        )
    }
}

impl std::fmt::Display for RepairWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairWarning::OpenBoundary { boundary_edges } => {
                write!(f, "{} open boundary edges remain", boundary_edges)
            }
            RepairWarning::NonManifold { edges } => {
                write!(f, "{} non-manifold edges remain", edges)
            }
            RepairWarning::UnresolvedIntersections { pairs } => {
                write!(f, "{} intersecting face pairs remain", pairs)
            }
            RepairWarning::TriangulationFallback { loop_len } => {
                write!(
                    f,
                    "hole with {} edges could not be ear-clipped, fan-filled instead",
                    loop_len
                )
            }
            RepairWarning::SkippedHole { edges, max_edges } => {
                write!(
                    f,
                    "hole with {} edges exceeds limit of {} and was left open",
                    edges, max_edges
                )
            }
        }
    }
}
