//! Error types for document operations.
//!
//! Codes follow the pattern `TPSDOC-XXXX` where:
//! - 1xxx = file and stream errors
//! - 2xxx = landmark table errors
//! - 3xxx = settings errors
//!
//! Errors from the warp engine pass through unchanged (with their own
//! `TPS-XXXX` codes) via [`DocumentError::Warp`].

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;
use tps_warp::WarpError;

/// Result type alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Machine-readable error codes for document operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentErrorCode {
    /// TPSDOC-1001: Failed to open a file for reading
    IoRead = 1001,
    /// TPSDOC-1002: Failed to create or write a file
    IoWrite = 1002,

    /// TPSDOC-2001: Failed to read a landmark table
    CsvRead = 2001,
    /// TPSDOC-2002: Failed to write a landmark table
    CsvWrite = 2002,

    /// TPSDOC-3001: Settings could not be parsed or saved
    Settings = 3001,

    /// Error raised by the warp engine.
    Warp = 9001,
}

impl DocumentErrorCode {
    /// Returns the error code as a string in the format `TPSDOC-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentErrorCode::IoRead => "TPSDOC-1001",
            DocumentErrorCode::IoWrite => "TPSDOC-1002",
            DocumentErrorCode::CsvRead => "TPSDOC-2001",
            DocumentErrorCode::CsvWrite => "TPSDOC-2002",
            DocumentErrorCode::Settings => "TPSDOC-3001",
            DocumentErrorCode::Warp => "TPSDOC-9001",
        }
    }
}

impl std::fmt::Display for DocumentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while editing, loading or saving a document.
#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    /// A file could not be opened.
    #[error("failed to open {path}")]
    #[diagnostic(
        code(tps_document::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be created.
    #[error("failed to create {path}")]
    #[diagnostic(
        code(tps_document::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The landmark table stream failed.
    ///
    /// Malformed rows never cause this; they are skipped.
    #[error("failed to read landmark table")]
    #[diagnostic(code(tps_document::csv::read))]
    CsvRead {
        #[source]
        source: csv::Error,
    },

    /// A landmark table could not be written.
    #[error("failed to write landmark table")]
    #[diagnostic(code(tps_document::csv::write))]
    CsvWrite {
        #[source]
        source: csv::Error,
    },

    /// Settings could not be parsed or serialized.
    #[error("invalid settings: {details}")]
    #[diagnostic(
        code(tps_document::settings),
        help("Compare the file against the output of WarperSettings::to_toml")
    )]
    Settings { details: String },

    /// Error from the warp engine (mesh I/O, validation).
    #[error(transparent)]
    #[diagnostic(code(tps_document::warp))]
    Warp(#[from] WarpError),
}

impl DocumentError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> DocumentErrorCode {
        match self {
            DocumentError::IoRead { .. } => DocumentErrorCode::IoRead,
            DocumentError::IoWrite { .. } => DocumentErrorCode::IoWrite,
            DocumentError::CsvRead { .. } => DocumentErrorCode::CsvRead,
            DocumentError::CsvWrite { .. } => DocumentErrorCode::CsvWrite,
            DocumentError::Settings { .. } => DocumentErrorCode::Settings,
            DocumentError::Warp(_) => DocumentErrorCode::Warp,
        }
    }

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a Settings error.
    pub fn settings(details: impl Into<String>) -> Self {
        DocumentError::Settings {
            details: details.into(),
        }
    }
}
