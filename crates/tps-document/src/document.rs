//! The warping document: two meshes, their landmarks, and warp settings.

use std::sync::Arc;

use nalgebra::Point3;
use tps_warp::{LandmarkPair3D, Mesh, TpsWarpOptions, shapes};

use crate::undo_redo::UndoRedo;

/// A document wrapped in undo/redo history.
pub type UndoableTpsDocument = UndoRedo<TpsDocument>;

/// Which of the two inputs something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TpsDocumentInputIdentifier {
    Source,
    Destination,
}

impl TpsDocumentInputIdentifier {
    /// Both inputs, source first.
    pub const ALL: [Self; 2] = [Self::Source, Self::Destination];

    /// The other input.
    pub fn other(self) -> Self {
        match self {
            Self::Source => Self::Destination,
            Self::Destination => Self::Source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }
}

impl std::fmt::Display for TpsDocumentInputIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one selectable element of a document.
///
/// Used for selection sets, hover state and bulk deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TpsDocumentElementId {
    /// One side of a landmark pair.
    Landmark {
        id: String,
        input: TpsDocumentInputIdentifier,
    },
    /// A point that is warped along with the mesh but doesn't drive the warp.
    NonParticipatingLandmark { id: String },
}

impl TpsDocumentElementId {
    pub fn landmark(id: impl Into<String>, input: TpsDocumentInputIdentifier) -> Self {
        Self::Landmark {
            id: id.into(),
            input,
        }
    }

    pub fn non_participating_landmark(id: impl Into<String>) -> Self {
        Self::NonParticipatingLandmark { id: id.into() }
    }

    /// The element's id within its collection.
    pub fn id(&self) -> &str {
        match self {
            Self::Landmark { id, .. } | Self::NonParticipatingLandmark { id } => id,
        }
    }
}

/// A landmark pair that may only have one side placed.
///
/// A pair with neither side placed is never stored in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct TpsDocumentLandmarkPair {
    /// Unique among the document's landmark pairs. Doubles as the display name.
    pub id: String,
    pub maybe_source: Option<Point3<f64>>,
    pub maybe_destination: Option<Point3<f64>>,
}

impl TpsDocumentLandmarkPair {
    /// An empty pair. Callers must place at least one side before storing it.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            maybe_source: None,
            maybe_destination: None,
        }
    }

    pub fn location(&self, which: TpsDocumentInputIdentifier) -> Option<Point3<f64>> {
        match which {
            TpsDocumentInputIdentifier::Source => self.maybe_source,
            TpsDocumentInputIdentifier::Destination => self.maybe_destination,
        }
    }

    pub fn location_mut(&mut self, which: TpsDocumentInputIdentifier) -> &mut Option<Point3<f64>> {
        match which {
            TpsDocumentInputIdentifier::Source => &mut self.maybe_source,
            TpsDocumentInputIdentifier::Destination => &mut self.maybe_destination,
        }
    }

    pub fn has_location(&self, which: TpsDocumentInputIdentifier) -> bool {
        self.location(which).is_some()
    }

    pub fn is_fully_paired(&self) -> bool {
        self.maybe_source.is_some() && self.maybe_destination.is_some()
    }

    /// Neither side is placed.
    pub fn is_empty(&self) -> bool {
        self.maybe_source.is_none() && self.maybe_destination.is_none()
    }

    /// The solver-ready pair, if both sides are placed.
    pub fn as_pair(&self) -> Option<LandmarkPair3D> {
        Some(LandmarkPair3D::new(self.maybe_source?, self.maybe_destination?))
    }
}

/// A source-space point that is carried along by the warp.
#[derive(Debug, Clone, PartialEq)]
pub struct TpsDocumentNonParticipatingLandmark {
    pub id: String,
    pub location: Point3<f64>,
}

impl TpsDocumentNonParticipatingLandmark {
    pub fn new(id: impl Into<String>, location: Point3<f64>) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }
}

/// Everything the user edits in the warping workflow.
///
/// Meshes are reference-counted so that history snapshots share them;
/// equality still compares them by value.
#[derive(Debug, Clone, PartialEq)]
pub struct TpsDocument {
    pub source_mesh: Arc<Mesh>,
    pub destination_mesh: Arc<Mesh>,
    /// Insertion order is significant: it is the solver's landmark order.
    pub landmark_pairs: Vec<TpsDocumentLandmarkPair>,
    pub non_participating_landmarks: Vec<TpsDocumentNonParticipatingLandmark>,
    /// 0 shows the source mesh unwarped, 1 the full warp.
    pub blending_factor: f64,
    pub warp_options: TpsWarpOptions,
    /// Recompute normals of the warped mesh instead of keeping the source's.
    pub recalculate_normals: bool,
    pub next_landmark_id: u64,
    pub next_non_participating_landmark_id: u64,
}

impl Default for TpsDocument {
    fn default() -> Self {
        Self::new(shapes::uv_sphere(16, 16), shapes::y_to_y_cylinder(16))
    }
}

impl TpsDocument {
    /// A document with the given meshes and no landmarks.
    pub fn new(source_mesh: Mesh, destination_mesh: Mesh) -> Self {
        Self {
            source_mesh: Arc::new(source_mesh),
            destination_mesh: Arc::new(destination_mesh),
            landmark_pairs: Vec::new(),
            non_participating_landmarks: Vec::new(),
            blending_factor: 1.0,
            warp_options: TpsWarpOptions::default(),
            recalculate_normals: false,
            next_landmark_id: 0,
            next_non_participating_landmark_id: 0,
        }
    }

    pub fn mesh(&self, which: TpsDocumentInputIdentifier) -> &Arc<Mesh> {
        match which {
            TpsDocumentInputIdentifier::Source => &self.source_mesh,
            TpsDocumentInputIdentifier::Destination => &self.destination_mesh,
        }
    }

    pub fn mesh_mut(&mut self, which: TpsDocumentInputIdentifier) -> &mut Arc<Mesh> {
        match which {
            TpsDocumentInputIdentifier::Source => &mut self.source_mesh,
            TpsDocumentInputIdentifier::Destination => &mut self.destination_mesh,
        }
    }
}
