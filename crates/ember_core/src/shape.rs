//! Shape capability: ray intersection, bounds, and shading-point lookup.

use ember_math::{Aabb, Ray, Vec2, Vec3};

/// Record of the closest ray-shape intersection.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// Ray parameter of the hit
    pub t: f32,
    /// World-space hit position
    pub position: Vec3,
    /// Barycentric (u, v) of the hit triangle
    pub barycentric: Vec2,
    /// Geometric per-facet normal, flipped to face the incoming ray
    pub flat_normal: Vec3,
    /// Index of the primitive that was hit
    pub primitive: u32,
    /// True when the ray arrived at the front side of the facet
    pub front_facing: bool,
    /// Number of box/primitive tests performed. Cost diagnostic only,
    /// has no bearing on correctness.
    pub num_tests: u32,
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            position: Vec3::ZERO,
            barycentric: Vec2::ZERO,
            flat_normal: Vec3::ZERO,
            primitive: 0,
            front_facing: true,
            num_tests: 0,
        }
    }
}

/// Interpolated shading inputs at a hit point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fragment {
    pub position: Vec3,
    /// Interpolated shading normal
    pub normal: Vec3,
    /// Geometric facet normal
    pub flat_normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    pub front_facing: bool,
}

/// Trait for anything the renderer can cast rays against.
pub trait Shape: Send + Sync {
    /// Find the closest hit within the ray's `[t_min, t_max]` interval.
    fn intersect(&self, ray: &Ray) -> Option<Intersection>;

    /// World-space bounds of the shape.
    fn aabb(&self) -> Aabb;

    /// Turn a raw geometric hit into interpolated shading inputs.
    fn sample_fragment(&self, hit: &Intersection) -> Fragment;
}
