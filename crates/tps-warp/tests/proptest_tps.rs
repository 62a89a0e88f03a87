//! Property-based tests for the TPS solver and evaluator.
//!
//! Run with: cargo test -p tps-warp -- proptest

use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use tps_warp::{
    LandmarkPair3D, TpsCoefficientSolverInputs3D, TpsCoefficients3D, calc_coefficients, warp_points,
};

// =============================================================================
// Strategies
// =============================================================================

/// Generate a random position in a bounded range.
fn arb_position() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Generate a small displacement.
fn arb_offset(range: f64) -> impl Strategy<Value = Vector3<f64>> {
    prop::array::uniform3(-range..range).prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

/// Landmarks on jittered cube corners plus the center, so the sources are
/// well separated and never coplanar.
fn arb_well_conditioned_landmarks() -> impl Strategy<Value = Vec<LandmarkPair3D>> {
    (
        prop::collection::vec(arb_offset(0.2), 9),
        prop::collection::vec(arb_offset(1.0), 9),
    )
        .prop_map(|(jitters, displacements)| {
            let mut sources = Vec::with_capacity(9);
            for x in [-1.0, 1.0] {
                for y in [-1.0, 1.0] {
                    for z in [-1.0, 1.0] {
                        sources.push(Point3::new(x, y, z));
                    }
                }
            }
            sources.push(Point3::origin());

            sources
                .into_iter()
                .zip(jitters)
                .zip(displacements)
                .map(|((s, j), d)| LandmarkPair3D::displaced(s + j, d))
                .collect()
        })
}

fn close(a: &Point3<f64>, b: &Point3<f64>, eps: f64) -> bool {
    (a - b).norm() <= eps
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_zero_landmarks_is_identity(p in arb_position(), blend in -2.0..2.0f64) {
        let coefficients = calc_coefficients(&TpsCoefficientSolverInputs3D::new(Vec::new(), blend));
        prop_assert_eq!(&coefficients, &TpsCoefficients3D::identity());
        prop_assert_eq!(coefficients.evaluate(&p), p);
    }

    #[test]
    fn proptest_full_blend_interpolates_landmarks(landmarks in arb_well_conditioned_landmarks()) {
        let coefficients = calc_coefficients(&TpsCoefficientSolverInputs3D::new(landmarks.clone(), 1.0));
        for lm in &landmarks {
            let warped = coefficients.evaluate(&lm.source);
            prop_assert!(close(&warped, &lm.destination, 1e-4), "{} -> {:?}", lm, warped);
        }
    }

    #[test]
    fn proptest_zero_blend_is_identity(
        landmarks in arb_well_conditioned_landmarks(),
        p in arb_position(),
    ) {
        let coefficients = calc_coefficients(&TpsCoefficientSolverInputs3D::new(landmarks, 0.0));
        prop_assert!(close(&coefficients.evaluate(&p), &p, 1e-9));
    }

    #[test]
    fn proptest_blend_is_linear(
        landmarks in arb_well_conditioned_landmarks(),
        p in prop::array::uniform3(-3.0..3.0f64),
        t in 0.0..1.0f64,
    ) {
        let p = Point3::from(p);
        let at = |b: f64| calc_coefficients(&TpsCoefficientSolverInputs3D::new(landmarks.clone(), b)).evaluate(&p);

        let (start, end, mid) = (at(0.0), at(1.0), at(t));
        let expected = Point3::from(start.coords.lerp(&end.coords, t));
        prop_assert!(close(&mid, &expected, 1e-8));
    }

    #[test]
    fn proptest_warp_points_preserves_order(
        landmarks in arb_well_conditioned_landmarks(),
        points in prop::collection::vec(arb_position(), 0..64),
    ) {
        let coefficients = calc_coefficients(&TpsCoefficientSolverInputs3D::new(landmarks, 1.0));
        let warped = warp_points(&coefficients, &points);

        prop_assert_eq!(warped.len(), points.len());
        for (w, p) in warped.iter().zip(&points) {
            prop_assert_eq!(*w, coefficients.evaluate(p));
        }
    }
}
