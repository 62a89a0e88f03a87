//! 3D thin-plate spline solving and evaluation.
//!
//! A warp is described by an affine part and one radial term per landmark:
//!
//! ```text
//! f(p) = a1 + a2·x + a3·y + a4·z + Σ wᵢ·U(|cᵢ − p|),   U(r) = r
//! ```
//!
//! The coefficients come from solving the `(N+4)×(N+4)` system
//!
//! ```text
//! | K   P | |w|   |d|
//! | Pᵀ  0 | |a| = |0|
//! ```
//!
//! where `K[i][j] = U(|sᵢ − sⱼ|)`, `P[i] = [1, xᵢ, yᵢ, zᵢ]` for each source
//! landmark `sᵢ`, and `d` holds the destination coordinates. The three output
//! channels share the left-hand side and are solved together.
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use tps_warp::{LandmarkPair3D, TpsCoefficientSolverInputs3D, calc_coefficients};
//!
//! let inputs = TpsCoefficientSolverInputs3D::new(
//!     vec![LandmarkPair3D::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0))],
//!     1.0,
//! );
//! let coefficients = calc_coefficients(&inputs);
//! let warped = coefficients.evaluate(&Point3::origin());
//! assert!((warped.x - 1.0).abs() < 1e-9);
//! ```

use nalgebra::{DMatrix, Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{WarpError, WarpResult};
use crate::tracing_ext::OperationTimer;
use crate::{LandmarkPair3D, Mesh};

/// Singular values at or below `SVD_RELATIVE_CUTOFF · size · σ_max` are
/// treated as zero when solving.
pub const SVD_RELATIVE_CUTOFF: f64 = f64::EPSILON;

/// Minimum number of points handed to each rayon task when evaluating.
pub const PARALLEL_MIN_CHUNK: usize = 8192;

/// Radial basis kernel for 3D thin-plate splines.
#[inline]
pub fn radial_basis(r: f64) -> f64 {
    r
}

/// Which parts of a solved warp are kept.
///
/// All parts are applied by default. Disabling a part masks the solved
/// coefficients before blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TpsWarpOptions {
    /// Keep `a1`. Otherwise it is zeroed.
    pub apply_affine_translation: bool,

    /// Keep the lengths of `a2..a4`. Otherwise they are normalized.
    pub apply_affine_scale: bool,

    /// Keep the directions of `a2..a4`. Otherwise each is projected back
    /// onto its own axis, preserving length.
    pub apply_affine_rotation: bool,

    /// Keep the radial terms. Otherwise they are dropped.
    pub apply_non_affine_warp: bool,
}

impl Default for TpsWarpOptions {
    fn default() -> Self {
        Self {
            apply_affine_translation: true,
            apply_affine_scale: true,
            apply_affine_rotation: true,
            apply_non_affine_warp: true,
        }
    }
}

impl TpsWarpOptions {
    /// Options that only keep the affine part of the warp.
    pub fn affine_only() -> Self {
        Self::default().without_non_affine_warp()
    }

    pub fn without_affine_translation(mut self) -> Self {
        self.apply_affine_translation = false;
        self
    }

    pub fn without_affine_scale(mut self) -> Self {
        self.apply_affine_scale = false;
        self
    }

    pub fn without_affine_rotation(mut self) -> Self {
        self.apply_affine_rotation = false;
        self
    }

    pub fn without_non_affine_warp(mut self) -> Self {
        self.apply_non_affine_warp = false;
        self
    }
}

/// Everything needed to solve for a set of coefficients.
///
/// Two inputs that compare equal always solve to the same coefficients,
/// which is what lets callers skip re-solving.
#[derive(Debug, Clone, PartialEq)]
pub struct TpsCoefficientSolverInputs3D {
    /// Fully paired landmarks, in order.
    pub landmarks: Vec<LandmarkPair3D>,

    /// How far along the warp to go: 0 is the identity, 1 is the full warp.
    /// Values outside `[0, 1]` extrapolate.
    pub blending_factor: f64,

    /// Which parts of the solved warp are kept.
    pub options: TpsWarpOptions,
}

impl Default for TpsCoefficientSolverInputs3D {
    fn default() -> Self {
        Self {
            landmarks: Vec::new(),
            blending_factor: 1.0,
            options: TpsWarpOptions::default(),
        }
    }
}

impl TpsCoefficientSolverInputs3D {
    pub fn new(landmarks: Vec<LandmarkPair3D>, blending_factor: f64) -> Self {
        Self {
            landmarks,
            blending_factor,
            options: TpsWarpOptions::default(),
        }
    }

    /// Set the warp options.
    pub fn with_options(mut self, options: TpsWarpOptions) -> Self {
        self.options = options;
        self
    }
}

/// One radial term of the warp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TpsNonAffineTerm3D {
    pub weight: Vector3<f64>,
    pub control_point: Point3<f64>,
}

impl TpsNonAffineTerm3D {
    pub fn new(weight: Vector3<f64>, control_point: Point3<f64>) -> Self {
        Self {
            weight,
            control_point,
        }
    }
}

/// Solved warp coefficients.
///
/// The default value is the identity warp.
#[derive(Debug, Clone, PartialEq)]
pub struct TpsCoefficients3D {
    /// Translation.
    pub a1: Vector3<f64>,
    /// Image of the x axis.
    pub a2: Vector3<f64>,
    /// Image of the y axis.
    pub a3: Vector3<f64>,
    /// Image of the z axis.
    pub a4: Vector3<f64>,
    /// Radial terms, one per landmark.
    pub non_affine_terms: Vec<TpsNonAffineTerm3D>,
}

impl Default for TpsCoefficients3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl TpsCoefficients3D {
    /// Coefficients that map every point onto itself.
    pub fn identity() -> Self {
        Self {
            a1: Vector3::zeros(),
            a2: Vector3::x(),
            a3: Vector3::y(),
            a4: Vector3::z(),
            non_affine_terms: Vec::new(),
        }
    }

    /// Evaluate the warp at a single point.
    pub fn evaluate(&self, p: &Point3<f64>) -> Point3<f64> {
        let mut rv = self.a1 + self.a2 * p.x + self.a3 * p.y + self.a4 * p.z;
        for term in &self.non_affine_terms {
            rv += term.weight * radial_basis((term.control_point - p).norm());
        }
        Point3::from(rv)
    }

    fn apply_options(&mut self, options: &TpsWarpOptions) {
        if !options.apply_affine_translation {
            self.a1 = Vector3::zeros();
        }
        if !options.apply_affine_scale {
            for a in [&mut self.a2, &mut self.a3, &mut self.a4] {
                if let Some(unit) = a.try_normalize(f64::EPSILON) {
                    *a = unit;
                }
            }
        }
        if !options.apply_affine_rotation {
            self.a2 = Vector3::x() * self.a2.norm();
            self.a3 = Vector3::y() * self.a3.norm();
            self.a4 = Vector3::z() * self.a4.norm();
        }
        if !options.apply_non_affine_warp {
            self.non_affine_terms.clear();
        }
    }

    // Linear interpolation from the identity. Evaluating the result equals
    // lerp(p, f(p), t) because f is linear in its coefficients.
    fn blend_with_identity(&mut self, t: f64) {
        if t == 1.0 {
            return;
        }
        self.a1 *= t;
        self.a2 = Vector3::x().lerp(&self.a2, t);
        self.a3 = Vector3::y().lerp(&self.a3, t);
        self.a4 = Vector3::z().lerp(&self.a4, t);
        for term in &mut self.non_affine_terms {
            term.weight *= t;
        }
    }
}

impl std::fmt::Display for TpsCoefficients3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = |v: &Vector3<f64>| format!("({}, {}, {})", v.x, v.y, v.z);
        writeln!(f, "TpsCoefficients3D {{")?;
        writeln!(f, "    a1 = {}", v(&self.a1))?;
        writeln!(f, "    a2 = {}", v(&self.a2))?;
        writeln!(f, "    a3 = {}", v(&self.a3))?;
        writeln!(f, "    a4 = {}", v(&self.a4))?;
        for (i, term) in self.non_affine_terms.iter().enumerate() {
            writeln!(
                f,
                "    w{} = {}, control_point = {}",
                i,
                v(&term.weight),
                v(&term.control_point.coords)
            )?;
        }
        write!(f, "}}")
    }
}

/// Solve for warp coefficients.
///
/// Zero landmarks produce the identity. Rank-deficient systems (duplicate,
/// coplanar, or too few landmarks) are solved in the least-squares sense
/// through the SVD pseudo-inverse.
///
/// # Errors
///
/// Returns [`WarpError::DegenerateSystem`] if a landmark has a non-finite
/// coordinate, the decomposition fails, or the solution is not finite.
pub fn try_calc_coefficients(inputs: &TpsCoefficientSolverInputs3D) -> WarpResult<TpsCoefficients3D> {
    let n = inputs.landmarks.len();
    if n == 0 {
        return Ok(TpsCoefficients3D::identity());
    }

    let _timer = OperationTimer::with_context("calc_coefficients", n, 0);

    if let Some(bad) = inputs.landmarks.iter().position(|lm| !lm.is_finite()) {
        return Err(WarpError::degenerate_system(
            n,
            format!("landmark {} has a non-finite coordinate", bad),
        ));
    }

    let size = n + 4;
    let mut l = DMatrix::<f64>::zeros(size, size);
    let mut rhs = DMatrix::<f64>::zeros(size, 3);

    for (i, lm_i) in inputs.landmarks.iter().enumerate() {
        for (j, lm_j) in inputs.landmarks.iter().enumerate() {
            l[(i, j)] = radial_basis((lm_i.source - lm_j.source).norm());
        }

        let s = &lm_i.source;
        l[(i, n)] = 1.0;
        l[(i, n + 1)] = s.x;
        l[(i, n + 2)] = s.y;
        l[(i, n + 3)] = s.z;

        l[(n, i)] = 1.0;
        l[(n + 1, i)] = s.x;
        l[(n + 2, i)] = s.y;
        l[(n + 3, i)] = s.z;

        rhs[(i, 0)] = lm_i.destination.x;
        rhs[(i, 1)] = lm_i.destination.y;
        rhs[(i, 2)] = lm_i.destination.z;
    }

    debug!(target: "tps_warp::solver", landmarks = n, system_size = size, "Solving TPS system");

    let svd = l.try_svd(true, true, f64::EPSILON, 0).ok_or_else(|| {
        WarpError::degenerate_system(n, "singular value decomposition did not converge")
    })?;
    let cutoff = SVD_RELATIVE_CUTOFF * size as f64 * svd.singular_values.max();
    if !cutoff.is_finite() {
        return Err(WarpError::degenerate_system(n, "system matrix has non-finite singular values"));
    }
    let solution = svd
        .solve(&rhs, cutoff)
        .map_err(|e| WarpError::degenerate_system(n, e))?;

    if solution.iter().any(|c| !c.is_finite()) {
        return Err(WarpError::degenerate_system(n, "solution has non-finite coefficients"));
    }

    let row = |r: usize| Vector3::new(solution[(r, 0)], solution[(r, 1)], solution[(r, 2)]);

    let mut coefficients = TpsCoefficients3D {
        a1: row(n),
        a2: row(n + 1),
        a3: row(n + 2),
        a4: row(n + 3),
        non_affine_terms: inputs
            .landmarks
            .iter()
            .enumerate()
            .map(|(i, lm)| TpsNonAffineTerm3D::new(row(i), lm.source))
            .collect(),
    };

    coefficients.apply_options(&inputs.options);
    coefficients.blend_with_identity(inputs.blending_factor);

    Ok(coefficients)
}

/// Solve for warp coefficients, falling back to the identity on failure.
///
/// Failures are logged at `warn` level.
pub fn calc_coefficients(inputs: &TpsCoefficientSolverInputs3D) -> TpsCoefficients3D {
    try_calc_coefficients(inputs).unwrap_or_else(|err| {
        warn!(
            target: "tps_warp::solver",
            code = %err.code(),
            error = %err,
            "TPS solve failed, falling back to identity warp"
        );
        TpsCoefficients3D::identity()
    })
}

/// Warp every point in place.
pub fn warp_points_in_place(coefficients: &TpsCoefficients3D, points: &mut [Point3<f64>]) {
    points
        .par_iter_mut()
        .with_min_len(PARALLEL_MIN_CHUNK)
        .for_each(|p| *p = coefficients.evaluate(p));
}

/// Warp a list of points, returning the warped copies in the same order.
pub fn warp_points(coefficients: &TpsCoefficients3D, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    points
        .par_iter()
        .with_min_len(PARALLEL_MIN_CHUNK)
        .map(|p| coefficients.evaluate(p))
        .collect()
}

/// Warp every vertex of a mesh.
///
/// Returns a new mesh with the same faces and vertex attributes; only
/// positions change. Normals are carried over untouched, so callers that
/// need shading-correct normals should recompute them afterwards.
pub fn warp_mesh(coefficients: &TpsCoefficients3D, mesh: &Mesh) -> Mesh {
    let _timer = OperationTimer::with_context(
        "warp_mesh",
        coefficients.non_affine_terms.len(),
        mesh.vertex_count(),
    );

    let mut warped = mesh.clone();
    warped
        .vertices
        .par_iter_mut()
        .with_min_len(PARALLEL_MIN_CHUNK)
        .for_each(|v| v.position = coefficients.evaluate(&v.position));
    warped
}
