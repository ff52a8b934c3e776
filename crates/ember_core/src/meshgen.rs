//! Procedural test geometry.

use ember_math::{Vec2, Vec3};

use crate::mesh::{Mesh, Vertex};

/// Latitude/longitude sphere centered at the origin, wound counter-clockwise
/// so the geometric normals face outward.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Mesh {
    assert!(segments >= 3 && rings >= 2, "sphere too coarse to close");

    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    for ring in 0..=rings {
        let theta = std::f32::consts::PI * ring as f32 / rings as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..=segments {
            let phi = std::f32::consts::TAU * segment as f32 / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let normal = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            vertices.push(Vertex {
                position: normal * radius,
                normal,
                tangent: Vec3::new(-sin_phi, 0.0, cos_phi),
                uv: Vec2::new(
                    segment as f32 / segments as f32,
                    ring as f32 / rings as f32,
                ),
            });
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let i0 = ring * stride + segment;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            // Degenerate pole triangles are kept; they have zero area and the
            // intersector rejects them.
            indices.extend_from_slice(&[i0, i1, i2]);
            indices.extend_from_slice(&[i1, i3, i2]);
        }
    }

    Mesh::new(vertices, indices).expect("generated indices are in bounds")
}

/// Unit quad in the XY plane, facing +Z.
pub fn unit_quad() -> Mesh {
    let corners = [
        (Vec3::new(-0.5, -0.5, 0.0), Vec2::new(0.0, 0.0)),
        (Vec3::new(0.5, -0.5, 0.0), Vec2::new(1.0, 0.0)),
        (Vec3::new(0.5, 0.5, 0.0), Vec2::new(1.0, 1.0)),
        (Vec3::new(-0.5, 0.5, 0.0), Vec2::new(0.0, 1.0)),
    ];
    let vertices = corners
        .iter()
        .map(|&(position, uv)| Vertex {
            position,
            normal: Vec3::Z,
            tangent: Vec3::X,
            uv,
        })
        .collect();
    Mesh::new(vertices, vec![0, 1, 2, 0, 2, 3]).expect("static indices are in bounds")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = uv_sphere(2.0, 16, 8);
        for vertex in mesh.vertices() {
            assert!((vertex.position.length() - 2.0).abs() < 1e-5);
            assert!((vertex.normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_winding_faces_outward() {
        let mesh = uv_sphere(1.0, 12, 6);
        let indices = mesh.indices();
        let vertices = mesh.vertices();
        let mut outward = 0usize;
        let mut total = 0usize;
        for tri in indices.chunks_exact(3) {
            let a = vertices[tri[0] as usize].position;
            let b = vertices[tri[1] as usize].position;
            let c = vertices[tri[2] as usize].position;
            let n = (b - a).cross(c - a);
            if n.length_squared() < 1e-12 {
                continue; // pole sliver
            }
            total += 1;
            let centroid = (a + b + c) / 3.0;
            if n.dot(centroid) > 0.0 {
                outward += 1;
            }
        }
        assert_eq!(outward, total);
    }

    #[test]
    fn test_quad_has_two_triangles() {
        let mesh = unit_quad();
        assert_eq!(mesh.indices().len(), 6);
    }
}
