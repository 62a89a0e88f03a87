//! Error types for warping operations with rich diagnostics.
//!
//! Every error carries a machine-readable code in the format `TPS-XXXX`:
//! - `TPS-1xxx`: I/O errors (file reading, writing, parsing)
//! - `TPS-2xxx`: Mesh validation errors
//! - `TPS-3xxx`: Solver errors
//! - `TPS-4xxx`: Format errors
//!
//! # Example
//!
//! ```
//! use tps_warp::{ErrorCode, WarpError};
//!
//! let err = WarpError::degenerate_system(3, "singular value decomposition failed");
//! assert_eq!(err.code(), ErrorCode::DegenerateSystem);
//! assert_eq!(err.code().as_str(), "TPS-3001");
//! ```

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for warping operations.
pub type WarpResult<T> = Result<T, WarpError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// TPS-1001: Failed to read file
    IoRead = 1001,
    /// TPS-1002: Failed to write file
    IoWrite = 1002,
    /// TPS-1003: Failed to parse file contents
    ParseError = 1003,

    // Validation errors (2xxx)
    /// TPS-2001: Mesh has no vertices or faces
    EmptyMesh = 2001,
    /// TPS-2002: Face references a missing vertex
    InvalidVertexIndex = 2002,
    /// TPS-2003: Vertex has NaN or Infinity coordinate
    InvalidCoordinate = 2003,

    // Solver errors (3xxx)
    /// TPS-3001: Linear system could not be solved
    DegenerateSystem = 3001,

    // Format errors (4xxx)
    /// TPS-4001: Unsupported file format
    UnsupportedFormat = 4001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `TPS-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "TPS-1001",
            ErrorCode::IoWrite => "TPS-1002",
            ErrorCode::ParseError => "TPS-1003",
            ErrorCode::EmptyMesh => "TPS-2001",
            ErrorCode::InvalidVertexIndex => "TPS-2002",
            ErrorCode::InvalidCoordinate => "TPS-2003",
            ErrorCode::DegenerateSystem => "TPS-3001",
            ErrorCode::UnsupportedFormat => "TPS-4001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while loading meshes or solving warps.
#[derive(Debug, Error, Diagnostic)]
pub enum WarpError {
    /// Error reading from a file.
    #[error("failed to read mesh from {path}")]
    #[diagnostic(
        code(tps::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write mesh to {path}")]
    #[diagnostic(
        code(tps::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a mesh file.
    #[error("failed to parse mesh from {path}: {details}")]
    #[diagnostic(
        code(tps::parse::error),
        help("The file may be corrupted. Try re-exporting it as binary STL or OBJ.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file format.
    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(code(tps::format::unsupported), help("Supported formats: STL, OBJ"))]
    UnsupportedFormat { extension: Option<String> },

    /// Empty mesh (no vertices or faces).
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(tps::validation::empty),
        help("The mesh must have at least one vertex and one face.")
    )]
    EmptyMesh { details: String },

    /// Invalid vertex index in face data.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(tps::validation::vertex_index),
        help("Check the mesh export settings; faces must reference existing vertices.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Invalid coordinate value (NaN or Infinity).
    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(tps::validation::coordinate),
        help("Check for numerical issues in the source data.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    /// The thin-plate spline system could not be solved.
    #[error("could not solve warp for {landmark_count} landmarks: {details}")]
    #[diagnostic(
        code(tps::solve::degenerate),
        help(
            "Landmarks may be duplicated or contain non-finite coordinates. Remove or move the offending landmarks."
        )
    )]
    DegenerateSystem {
        landmark_count: usize,
        details: String,
    },
}

impl WarpError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            WarpError::IoRead { .. } => ErrorCode::IoRead,
            WarpError::IoWrite { .. } => ErrorCode::IoWrite,
            WarpError::ParseError { .. } => ErrorCode::ParseError,
            WarpError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            WarpError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            WarpError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            WarpError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            WarpError::DegenerateSystem { .. } => ErrorCode::DegenerateSystem,
        }
    }

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WarpError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WarpError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        WarpError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create an EmptyMesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        WarpError::EmptyMesh {
            details: details.into(),
        }
    }

    /// Create a DegenerateSystem error.
    pub fn degenerate_system(landmark_count: usize, details: impl Into<String>) -> Self {
        WarpError::DegenerateSystem {
            landmark_count,
            details: details.into(),
        }
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported_format(extension: Option<String>) -> Self {
        WarpError::UnsupportedFormat { extension }
    }
}
