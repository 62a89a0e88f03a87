//! Landmark correspondences.

use nalgebra::{Point3, Vector3};

/// A single source-to-destination point correspondence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LandmarkPair3D {
    /// Where the point is in the source space.
    pub source: Point3<f64>,

    /// Where the warp should move it to.
    pub destination: Point3<f64>,
}

impl LandmarkPair3D {
    /// Create a landmark pair.
    #[inline]
    pub fn new(source: Point3<f64>, destination: Point3<f64>) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Create a landmark pair from a source point and a displacement.
    pub fn displaced(source: Point3<f64>, displacement: Vector3<f64>) -> Self {
        Self::new(source, source + displacement)
    }

    /// Displacement from source to destination.
    pub fn displacement(&self) -> Vector3<f64> {
        self.destination - self.source
    }

    /// Whether both points have finite coordinates.
    pub fn is_finite(&self) -> bool {
        self.source.iter().chain(self.destination.iter()).all(|c| c.is_finite())
    }
}

impl std::fmt::Display for LandmarkPair3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LandmarkPair3D(source = ({}, {}, {}), destination = ({}, {}, {}))",
            self.source.x,
            self.source.y,
            self.source.z,
            self.destination.x,
            self.destination.y,
            self.destination.z
        )
    }
}

/// A landmark pair that carries its user-facing name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLandmarkPair3D {
    pub name: String,
    pub pair: LandmarkPair3D,
}

impl NamedLandmarkPair3D {
    pub fn new(name: impl Into<String>, pair: LandmarkPair3D) -> Self {
        Self {
            name: name.into(),
            pair,
        }
    }
}
