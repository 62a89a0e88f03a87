//! Procedural meshes used as default warp inputs and test fixtures.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::normals::compute_vertex_normals;
use crate::{Mesh, Vertex};

/// Generate a unit UV sphere centered on the origin.
///
/// `sectors` is the number of longitudinal slices and `stacks` the number of
/// latitudinal bands. Poles are single vertices. Values below the minimum
/// (3 sectors, 2 stacks) are clamped.
pub fn uv_sphere(sectors: usize, stacks: usize) -> Mesh {
    let sectors = sectors.max(3);
    let stacks = stacks.max(2);

    let ring_count = stacks - 1;
    let mut mesh = Mesh::with_capacity(2 + ring_count * sectors, 2 * sectors * stacks);

    mesh.vertices.push(Vertex::with_normal(
        Point3::new(0.0, 1.0, 0.0),
        Vector3::y(),
    ));
    for i in 1..stacks {
        let phi = PI * i as f64 / stacks as f64;
        let (r, y) = (phi.sin(), phi.cos());
        for j in 0..sectors {
            let theta = 2.0 * PI * j as f64 / sectors as f64;
            let p = Point3::new(r * theta.cos(), y, r * theta.sin());
            mesh.vertices.push(Vertex::with_normal(p, p.coords));
        }
    }
    mesh.vertices.push(Vertex::with_normal(
        Point3::new(0.0, -1.0, 0.0),
        -Vector3::y(),
    ));

    let bottom = (mesh.vertices.len() - 1) as u32;
    let ring = |i: usize, j: usize| (1 + i * sectors + j % sectors) as u32;

    for j in 0..sectors {
        mesh.faces.push([0, ring(0, j + 1), ring(0, j)]);
    }
    for i in 0..ring_count.saturating_sub(1) {
        for j in 0..sectors {
            let (a, b) = (ring(i, j), ring(i, j + 1));
            let (c, d) = (ring(i + 1, j), ring(i + 1, j + 1));
            mesh.faces.push([a, b, d]);
            mesh.faces.push([a, d, c]);
        }
    }
    for j in 0..sectors {
        mesh.faces.push([ring(ring_count - 1, j), ring(ring_count - 1, j + 1), bottom]);
    }

    mesh
}

/// Generate a closed cylinder of radius 1 spanning `y = -1` to `y = 1`.
pub fn y_to_y_cylinder(segments: usize) -> Mesh {
    let segments = segments.max(3);
    let mut mesh = Mesh::with_capacity(2 * segments + 2, 4 * segments);

    for y in [1.0, -1.0] {
        for j in 0..segments {
            let theta = 2.0 * PI * j as f64 / segments as f64;
            mesh.vertices
                .push(Vertex::from_coords(theta.cos(), y, theta.sin()));
        }
    }
    let top_center = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
    let bottom_center = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::from_coords(0.0, -1.0, 0.0));

    let top = |j: usize| (j % segments) as u32;
    let bottom = |j: usize| (segments + j % segments) as u32;

    for j in 0..segments {
        let (a, b) = (top(j), top(j + 1));
        let (c, d) = (bottom(j), bottom(j + 1));
        mesh.faces.push([a, b, d]);
        mesh.faces.push([a, d, c]);
        mesh.faces.push([top_center, b, a]);
        mesh.faces.push([c, d, bottom_center]);
    }

    compute_vertex_normals(&mut mesh);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outward_facing(mesh: &Mesh) -> bool {
        mesh.triangles().all(|tri| {
            let centroid = (tri.v0.coords + tri.v1.coords + tri.v2.coords) / 3.0;
            tri.normal_unnormalized().dot(&centroid) > 0.0
        })
    }

    #[test]
    fn test_uv_sphere_counts() {
        let mesh = uv_sphere(16, 16);
        assert_eq!(mesh.vertex_count(), 2 + 15 * 16);
        assert_eq!(mesh.face_count(), 2 * 16 * 16 - 2 * 16);
        assert!(mesh.has_normals());
    }

    #[test]
    fn test_uv_sphere_vertices_on_unit_sphere() {
        let mesh = uv_sphere(8, 6);
        for p in mesh.positions() {
            assert!((p.coords.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_uv_sphere_winding_is_outward() {
        assert!(outward_facing(&uv_sphere(12, 8)));
    }

    #[test]
    fn test_cylinder_winding_is_outward() {
        let mesh = y_to_y_cylinder(16);
        assert_eq!(mesh.vertex_count(), 34);
        assert_eq!(mesh.face_count(), 64);
        assert!(outward_facing(&mesh));
    }

    #[test]
    fn test_minimum_resolution_is_clamped() {
        let mesh = uv_sphere(0, 0);
        assert_eq!(mesh.vertex_count(), 2 + 3);
        assert_eq!(mesh.face_count(), 6);
        assert!(mesh.faces.iter().flatten().all(|&i| (i as usize) < mesh.vertex_count()));
    }
}
