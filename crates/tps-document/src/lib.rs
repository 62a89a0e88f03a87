//! Undoable landmark documents for TPS mesh warping.
//!
//! This crate holds the editable state of a warping session and keeps the
//! expensive results of [`tps_warp`] up to date without recomputing them
//! every frame.
//!
//! # Features
//!
//! - **Document**: source and destination meshes, landmark pairs that may be
//!   half-placed, non-participating landmarks, and warp settings
//! - **History**: snapshot-based undo/redo with commit messages and an
//!   optional cap
//! - **Actions**: named edits that commit exactly when they change something
//! - **Cache**: re-solves and re-warps only when the relevant inputs change
//! - **CSV**: forgiving landmark import, plain and paired export
//! - **Settings**: serializable defaults for new documents (`config` feature)
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Point3;
//! use tps_document::{TpsDocumentInputIdentifier, TpsResultCache, UndoableTpsDocument, actions};
//!
//! let mut doc = UndoableTpsDocument::default();
//! actions::action_add_landmark(&mut doc, TpsDocumentInputIdentifier::Source, Point3::new(0.0, 1.0, 0.0));
//! actions::action_add_landmark(&mut doc, TpsDocumentInputIdentifier::Destination, Point3::new(0.0, 1.5, 0.0));
//!
//! let mut cache = TpsResultCache::new();
//! let warped = cache.lookup(doc.scratch());
//! assert_eq!(warped.face_count(), doc.scratch().source_mesh.face_count());
//!
//! actions::action_undo(&mut doc);
//! assert_eq!(doc.scratch().landmark_pairs[0].maybe_destination, None);
//! ```
//!
//! # Error Handling
//!
//! File-based actions return [`DocumentResult`]. Errors from mesh I/O pass
//! through as [`DocumentError::Warp`] with their own codes; everything else
//! carries a `TPSDOC-XXXX` [`DocumentErrorCode`]. Failed actions never
//! modify the document.

mod document;
mod error;

pub mod actions;
pub mod cache;
pub mod config;
pub mod helpers;
pub mod landmark_csv;
pub mod undo_redo;

pub use cache::{CacheStats, TpsResultCache};
pub use config::WarperSettings;
pub use document::{
    TpsDocument, TpsDocumentElementId, TpsDocumentInputIdentifier, TpsDocumentLandmarkPair,
    TpsDocumentNonParticipatingLandmark, UndoableTpsDocument,
};
pub use error::{DocumentError, DocumentErrorCode, DocumentResult};
pub use landmark_csv::{CsvExportOptions, CsvLandmark};
pub use undo_redo::{UndoRedo, UndoRedoEntry};

impl TpsDocument {
    /// A default document seeded with `settings`.
    pub fn from_settings(settings: &WarperSettings) -> Self {
        settings.create_document()
    }
}
