//! Memoized warp results for a [`TpsDocument`].
//!
//! Rendering code asks for the warped mesh every frame. [`TpsResultCache`]
//! re-solves only when the solver inputs change and re-warps only when the
//! coefficients, the source mesh or the normals setting change. The
//! destination mesh is display-only and never invalidates anything.

use std::sync::Arc;

use nalgebra::Point3;
use tps_warp::{
    Mesh, TpsCoefficientSolverInputs3D, TpsCoefficients3D, calc_coefficients, compute_vertex_normals, warp_mesh,
    warp_points,
};
use tracing::debug;

use crate::document::TpsDocument;
use crate::helpers::solver_inputs;

/// How much work a [`TpsResultCache`] has done since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Coefficient solves.
    pub solves: u64,
    /// Source mesh warps.
    pub mesh_warps: u64,
    /// Non-participating landmark warps.
    pub point_warps: u64,
}

/// Caches the coefficients, warped mesh and warped non-participating
/// landmarks of the most recently looked-up document.
#[derive(Debug, Default)]
pub struct TpsResultCache {
    cached_inputs: Option<TpsCoefficientSolverInputs3D>,
    cached_coefficients: TpsCoefficients3D,
    // bumped on every solve
    coefficients_version: u64,

    cached_source_mesh: Option<Arc<Mesh>>,
    cached_recalculate_normals: bool,
    // coefficients version the result mesh was warped with
    mesh_version: Option<u64>,
    cached_result_mesh: Mesh,

    cached_points: Vec<Point3<f64>>,
    points_version: Option<u64>,
    cached_warped_points: Vec<Point3<f64>>,

    stats: CacheStats,
}

impl TpsResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The warped source mesh for `doc`.
    ///
    /// The borrow ends at the next call on the cache, which may replace the mesh.
    pub fn lookup(&mut self, doc: &TpsDocument) -> &Mesh {
        let coefficients_changed = self.update_coefficients(doc);
        let mesh_changed = self.update_source_mesh(doc);
        let normals_changed = self.cached_recalculate_normals != doc.recalculate_normals;
        let stale = self.mesh_version != Some(self.coefficients_version);

        if coefficients_changed || mesh_changed || normals_changed || stale {
            if let Some(source) = &self.cached_source_mesh {
                let mut result = warp_mesh(&self.cached_coefficients, source);
                if doc.recalculate_normals {
                    compute_vertex_normals(&mut result);
                }
                self.cached_result_mesh = result;
            }
            self.cached_recalculate_normals = doc.recalculate_normals;
            self.mesh_version = Some(self.coefficients_version);
            self.stats.mesh_warps += 1;

            debug!(
                target: "tps_document::cache",
                coefficients_changed,
                mesh_changed,
                normals_changed,
                vertices = self.cached_result_mesh.vertex_count(),
                "rewarped source mesh"
            );
        }

        &self.cached_result_mesh
    }

    /// The non-participating landmarks of `doc`, carried through the warp.
    ///
    /// Same order as `doc.non_participating_landmarks`.
    pub fn warped_non_participating_landmarks(&mut self, doc: &TpsDocument) -> &[Point3<f64>] {
        self.update_coefficients(doc);

        let points_changed = !self
            .cached_points
            .iter()
            .map(point_bits)
            .eq(doc.non_participating_landmarks.iter().map(|l| point_bits(&l.location)));
        let stale = self.points_version != Some(self.coefficients_version);

        if points_changed || stale {
            if points_changed {
                self.cached_points = doc.non_participating_landmarks.iter().map(|l| l.location).collect();
            }
            self.cached_warped_points = warp_points(&self.cached_coefficients, &self.cached_points);
            self.points_version = Some(self.coefficients_version);
            self.stats.point_warps += 1;

            debug!(
                target: "tps_document::cache",
                points = self.cached_points.len(),
                "rewarped non-participating landmarks"
            );
        }

        &self.cached_warped_points
    }

    /// The solved coefficients for `doc`.
    pub fn coefficients(&mut self, doc: &TpsDocument) -> &TpsCoefficients3D {
        self.update_coefficients(doc);
        &self.cached_coefficients
    }

    fn update_coefficients(&mut self, doc: &TpsDocument) -> bool {
        let inputs = solver_inputs(doc);
        if self
            .cached_inputs
            .as_ref()
            .is_some_and(|cached| same_solver_inputs(cached, &inputs))
        {
            return false;
        }

        self.cached_coefficients = calc_coefficients(&inputs);
        debug!(
            target: "tps_document::cache",
            landmarks = inputs.landmarks.len(),
            blending_factor = inputs.blending_factor,
            "re-solved coefficients"
        );
        self.cached_inputs = Some(inputs);
        self.coefficients_version += 1;
        self.stats.solves += 1;
        true
    }

    // Pointer equality first; a value-equal mesh behind a different Arc
    // is adopted without rewarping.
    fn update_source_mesh(&mut self, doc: &TpsDocument) -> bool {
        let unchanged = self
            .cached_source_mesh
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(cached, &doc.source_mesh) || **cached == *doc.source_mesh);
        self.cached_source_mesh = Some(Arc::clone(&doc.source_mesh));
        !unchanged
    }
}

// Bitwise so that a NaN coordinate or blend factor still counts as unchanged.
fn point_bits(p: &Point3<f64>) -> [u64; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

fn same_solver_inputs(a: &TpsCoefficientSolverInputs3D, b: &TpsCoefficientSolverInputs3D) -> bool {
    a.blending_factor.to_bits() == b.blending_factor.to_bits()
        && a.options == b.options
        && a.landmarks.len() == b.landmarks.len()
        && a.landmarks.iter().zip(&b.landmarks).all(|(x, y)| {
            point_bits(&x.source) == point_bits(&y.source) && point_bits(&x.destination) == point_bits(&y.destination)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TpsDocumentInputIdentifier::{Destination, Source};
    use crate::helpers::{add_landmark_to_input, add_non_participating_landmark};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use tps_warp::shapes;

    fn paired_document() -> TpsDocument {
        let mut doc = TpsDocument::default();
        add_landmark_to_input(&mut doc, Source, Point3::new(0.0, 0.0, 0.0), None);
        add_landmark_to_input(&mut doc, Destination, Point3::new(1.0, 0.0, 0.0), None);
        doc
    }

    /// Non-coplanar landmarks that all move one unit along +x.
    fn shifted_document() -> TpsDocument {
        let mut doc = TpsDocument::default();
        for source in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ] {
            add_landmark_to_input(&mut doc, Source, source, None);
            add_landmark_to_input(&mut doc, Destination, source + Vector3::x(), None);
        }
        doc
    }

    #[test]
    fn test_repeated_lookup_computes_once() {
        let doc = paired_document();
        let mut cache = TpsResultCache::new();

        let first = cache.lookup(&doc).clone();
        let second = cache.lookup(&doc).clone();
        assert_eq!(first, second);
        assert_eq!(
            cache.stats(),
            CacheStats {
                solves: 1,
                mesh_warps: 1,
                point_warps: 0
            }
        );
    }

    #[test]
    fn test_rigid_shift_moves_every_vertex() {
        let doc = shifted_document();
        let mut cache = TpsResultCache::new();
        let result = cache.lookup(&doc);
        for (warped, original) in result.positions().zip(doc.source_mesh.positions()) {
            assert_relative_eq!(warped.x, original.x + 1.0, epsilon = 1e-6);
            assert_relative_eq!(warped.y, original.y, epsilon = 1e-6);
            assert_relative_eq!(warped.z, original.z, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_blend_change_rewarps() {
        let mut doc = paired_document();
        let mut cache = TpsResultCache::new();
        cache.lookup(&doc);

        doc.blending_factor = 0.0;
        let result = cache.lookup(&doc).clone();
        assert_eq!(cache.stats().solves, 2);
        assert_eq!(cache.stats().mesh_warps, 2);
        assert!(result.positions().eq(doc.source_mesh.positions()));
    }

    #[test]
    fn test_destination_mesh_swap_is_ignored() {
        let mut doc = paired_document();
        let mut cache = TpsResultCache::new();
        cache.lookup(&doc);

        doc.destination_mesh = Arc::new(shapes::uv_sphere(5, 5));
        cache.lookup(&doc);
        assert_eq!(cache.stats().solves, 1);
        assert_eq!(cache.stats().mesh_warps, 1);
    }

    #[test]
    fn test_equal_source_mesh_behind_new_arc_is_not_rewarped() {
        let mut doc = paired_document();
        let mut cache = TpsResultCache::new();
        cache.lookup(&doc);

        doc.source_mesh = Arc::new((*doc.source_mesh).clone());
        cache.lookup(&doc);
        assert_eq!(cache.stats().mesh_warps, 1);

        doc.source_mesh = Arc::new(shapes::y_to_y_cylinder(8));
        cache.lookup(&doc);
        assert_eq!(cache.stats().solves, 1);
        assert_eq!(cache.stats().mesh_warps, 2);
    }

    #[test]
    fn test_recalculate_normals_rewarps_without_solving() {
        let mut doc = shifted_document();
        let mut cache = TpsResultCache::new();
        cache.lookup(&doc);

        doc.recalculate_normals = true;
        assert!(cache.lookup(&doc).has_normals());
        assert_eq!(cache.stats().solves, 1);
        assert_eq!(cache.stats().mesh_warps, 2);
    }

    #[test]
    fn test_warped_non_participating_landmarks() {
        let mut doc = shifted_document();
        add_non_participating_landmark(&mut doc, Point3::new(0.0, 2.0, 0.0), None);
        let mut cache = TpsResultCache::new();

        let warped = cache.warped_non_participating_landmarks(&doc).to_vec();
        assert_eq!(warped.len(), 1);
        assert_relative_eq!(warped[0].x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(warped[0].y, 2.0, epsilon = 1e-6);

        cache.warped_non_participating_landmarks(&doc);
        cache.lookup(&doc);
        assert_eq!(
            cache.stats(),
            CacheStats {
                solves: 1,
                mesh_warps: 1,
                point_warps: 1
            }
        );

        add_non_participating_landmark(&mut doc, Point3::new(0.0, 0.0, 3.0), None);
        assert_eq!(cache.warped_non_participating_landmarks(&doc).len(), 2);
        assert_eq!(cache.stats().point_warps, 2);
        assert_eq!(cache.stats().solves, 1);
    }

    #[test]
    fn test_nan_inputs_are_solved_once() {
        let mut doc = paired_document();
        doc.blending_factor = f64::NAN;
        add_non_participating_landmark(&mut doc, Point3::new(f64::NAN, 0.0, 0.0), None);
        let mut cache = TpsResultCache::new();

        for _ in 0..5 {
            cache.lookup(&doc);
            cache.warped_non_participating_landmarks(&doc);
        }
        assert_eq!(
            cache.stats(),
            CacheStats {
                solves: 1,
                mesh_warps: 1,
                point_warps: 1
            }
        );
    }

    #[test]
    fn test_out_of_range_faces_do_not_panic() {
        let mut doc = shifted_document();
        doc.recalculate_normals = true;
        doc.source_mesh = Arc::new(Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 7]],
        ));
        let mut cache = TpsResultCache::new();

        let result = cache.lookup(&doc);
        assert_eq!(result.vertex_count(), 3);
        assert!(result.vertices.iter().all(|v| v.normal.is_some()));
    }

    #[test]
    fn test_coefficients_follow_document() {
        let doc = paired_document();
        let mut cache = TpsResultCache::new();
        let p = cache.coefficients(&doc).evaluate(&Point3::origin());
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-4);
    }
}
