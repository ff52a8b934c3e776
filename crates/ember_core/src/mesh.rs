//! Indexed triangle meshes and world-space baked instances.

use ember_math::{Aabb, Mat4, Vec2, Vec3};
use thiserror::Error;

/// Errors raised when constructing a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
}

/// One mesh vertex.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
}

/// Shared, untransformed mesh data.
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Create a validated indexed triangle mesh.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }
        for &index in &indices {
            if index as usize >= vertices.len() {
                return Err(MeshError::IndexOutOfBounds {
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }
        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Non-positional vertex data, transformed alongside positions.
#[derive(Debug, Clone, Copy)]
pub struct VertexAttributes {
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
}

/// A mesh placed in the world.
///
/// Positions and attributes are baked into world space once, so intersection
/// never multiplies matrices per ray. The acceleration structure is built on
/// top of these buffers and shares ownership of the instance for as long as
/// its leaves reference them.
pub struct MeshInstance {
    positions: Vec<Vec3>,
    attributes: Vec<VertexAttributes>,
    indices: Vec<u32>,
}

impl MeshInstance {
    pub fn new(mesh: &Mesh, transform: Mat4) -> Self {
        let positions = mesh
            .vertices()
            .iter()
            .map(|v| transform.transform_point3(v.position))
            .collect();

        // Normals/tangents transform by the inverse transpose so non-uniform
        // scaling keeps them perpendicular to the surface.
        let normal_transform = glam::Mat3::from_mat4(transform).inverse().transpose();
        let attributes = mesh
            .vertices()
            .iter()
            .map(|v| VertexAttributes {
                normal: (normal_transform * v.normal).normalize_or_zero(),
                tangent: (normal_transform * v.tangent).normalize_or_zero(),
                uv: v.uv,
            })
            .collect();

        Self {
            positions,
            attributes,
            indices: mesh.indices().to_vec(),
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Triangles are numbered by their index-buffer offset / 3.
    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }

    /// The three world-space corners of one triangle.
    #[inline]
    pub fn triangle(&self, primitive: u32) -> [Vec3; 3] {
        let base = primitive as usize * 3;
        [
            self.positions[self.indices[base] as usize],
            self.positions[self.indices[base + 1] as usize],
            self.positions[self.indices[base + 2] as usize],
        ]
    }

    /// Bounding box of one triangle.
    pub fn primitive_aabb(&self, primitive: u32) -> Aabb {
        let [a, b, c] = self.triangle(primitive);
        Aabb::from_points(a, b).grow(c)
    }

    /// Barycentric interpolation of the shading attributes of a triangle.
    pub fn interpolate(&self, primitive: u32, barycentric: Vec2) -> VertexAttributes {
        let base = primitive as usize * 3;
        let a = &self.attributes[self.indices[base] as usize];
        let b = &self.attributes[self.indices[base + 1] as usize];
        let c = &self.attributes[self.indices[base + 2] as usize];

        let w = 1.0 - barycentric.x - barycentric.y;
        VertexAttributes {
            normal: (a.normal * w + b.normal * barycentric.x + c.normal * barycentric.y)
                .normalize_or_zero(),
            tangent: (a.tangent * w + b.tangent * barycentric.x + c.tangent * barycentric.y)
                .normalize_or_zero(),
            uv: a.uv * w + b.uv * barycentric.x + c.uv * barycentric.y,
        }
    }
}
