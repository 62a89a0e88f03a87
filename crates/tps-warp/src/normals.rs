//! Vertex normal recomputation.

use tracing::debug;

use crate::Mesh;

/// Recompute per-vertex normals from area-weighted face normals.
///
/// Vertices that touch no (non-degenerate) face end up with `normal = None`.
/// Faces with out-of-range indices contribute nothing.
pub fn compute_vertex_normals(mesh: &mut Mesh) {
    let mut normal_accum = vec![nalgebra::Vector3::zeros(); mesh.vertices.len()];

    for &face in &mesh.faces {
        let Some(tri) = mesh.triangle(face) else {
            continue;
        };

        // unnormalized normal has length 2*area
        let weighted_normal = tri.normal_unnormalized();

        for index in face {
            normal_accum[index as usize] += weighted_normal;
        }
    }

    for (vertex, accum) in mesh.vertices.iter_mut().zip(normal_accum) {
        let len_sq = accum.norm_squared();
        vertex.normal = (len_sq > f64::EPSILON).then(|| accum / len_sq.sqrt());
    }

    debug!(
        target: "tps_warp::normals",
        vertices = mesh.vertices.len(),
        "Recomputed vertex normals"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_flat_quad_normals_point_up() {
        let mut mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );

        compute_vertex_normals(&mut mesh);

        for v in &mesh.vertices {
            let n = v.normal.expect("every vertex touches a face");
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_isolated_vertex_has_no_normal() {
        let mut mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(5.0, 5.0, 5.0),
            ],
            vec![[0, 1, 2]],
        );

        compute_vertex_normals(&mut mesh);

        assert!(mesh.vertices[3].normal.is_none());
        assert!(mesh.vertices[0].normal.is_some());
    }

    #[test]
    fn test_out_of_range_face_is_ignored() {
        let mut mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 7]],
        );

        compute_vertex_normals(&mut mesh);

        let n = mesh.vertices[0].normal.expect("first face is valid");
        assert_relative_eq!(n.z, 1.0, epsilon = 1e-12);
    }
}
