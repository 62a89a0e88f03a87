//! Landmark-driven 3D thin-plate spline warping for triangle meshes.
//!
//! This crate solves for a smooth 3D warp from a set of source→destination
//! landmark pairs and applies it to points and meshes.
//!
//! # Features
//!
//! - **Solver**: joint SVD solve of the `(N+4)×(N+4)` TPS system with kernel `U(r) = r`
//! - **Evaluator**: warp single points, point lists, or every vertex of a mesh (parallel with rayon)
//! - **Blending**: interpolate between the identity (`0.0`) and the full warp (`1.0`)
//! - **Warp options**: mask out translation, scale, rotation, or the non-affine part
//! - **File I/O**: load and save STL and OBJ meshes
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Point3;
//! use tps_warp::{LandmarkPair3D, TpsCoefficientSolverInputs3D, calc_coefficients, shapes, warp_mesh};
//!
//! let source = shapes::uv_sphere(16, 16);
//!
//! let landmarks = vec![
//!     LandmarkPair3D::new(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 1.5, 0.0)),
//!     LandmarkPair3D::new(Point3::new(0.0, -1.0, 0.0), Point3::new(0.0, -1.5, 0.0)),
//!     LandmarkPair3D::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
//!     LandmarkPair3D::new(Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 1.0)),
//!     LandmarkPair3D::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)),
//! ];
//!
//! let coefficients = calc_coefficients(&TpsCoefficientSolverInputs3D::new(landmarks, 1.0));
//! let warped = warp_mesh(&coefficients, &source);
//!
//! assert_eq!(warped.faces, source.faces);
//! ```
//!
//! # Error Handling
//!
//! Fallible operations return [`WarpResult`]. Every [`WarpError`] carries a
//! machine-readable [`ErrorCode`] and renders through `miette`:
//!
//! ```no_run
//! use tps_warp::Mesh;
//!
//! match Mesh::load("femur.stl") {
//!     Ok(mesh) => println!("{} vertices", mesh.vertex_count()),
//!     Err(e) => eprintln!("[{}] {}", e.code(), e),
//! }
//! ```
//!
//! The solver has an infallible entry point, [`calc_coefficients`], that
//! falls back to the identity warp, and a fallible one,
//! [`try_calc_coefficients`], for callers that want to see the failure.

mod error;
mod landmark;
mod types;

pub mod io;
pub mod normals;
pub mod shapes;
pub mod tps;
pub mod tracing_ext;

pub use error::{ErrorCode, WarpError, WarpResult};
pub use io::{MeshFormat, load_mesh, save_mesh, validate_mesh_data};
pub use landmark::{LandmarkPair3D, NamedLandmarkPair3D};
pub use normals::compute_vertex_normals;
pub use tps::{
    TpsCoefficientSolverInputs3D, TpsCoefficients3D, TpsNonAffineTerm3D, TpsWarpOptions,
    calc_coefficients, try_calc_coefficients, warp_mesh, warp_points, warp_points_in_place,
};
pub use tracing_ext::OperationTimer;
pub use types::{Mesh, Triangle, Vertex};

// Convenience methods on Mesh
impl Mesh {
    /// Load a mesh from a file, auto-detecting format from extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> WarpResult<Self> {
        io::load_mesh(path.as_ref())
    }

    /// Save the mesh to a file, auto-detecting format from extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> WarpResult<()> {
        io::save_mesh(self, path.as_ref())
    }

    /// Return a warped copy of this mesh.
    pub fn warped(&self, coefficients: &TpsCoefficients3D) -> Mesh {
        tps::warp_mesh(coefficients, self)
    }

    /// Recompute per-vertex normals from the faces.
    pub fn compute_vertex_normals(&mut self) {
        normals::compute_vertex_normals(self);
    }
}
