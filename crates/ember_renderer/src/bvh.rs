//! Per-mesh bounding volume hierarchy.
//!
//! Nodes live in one flat array. Children are always appended after their
//! parent, so index 0 is the root and a child index of 0 means "no child".
//! Leaves are primitive groups holding triangle indices into the shared
//! mesh-instance buffers.
//!
//! Splits use the median of primitive-box midpoints along a cyclically
//! advancing axis. The median resists outlier geometry skewing the partition
//! the way a mean split would.

use std::sync::Arc;

use ember_core::{Fragment, Intersection, MeshInstance, Shape};
use ember_math::{Aabb, Ray, Vec3};

/// Triangles per leaf before a node stops splitting.
pub const MAX_PRIMITIVES_PER_LEAF: usize = 8;

/// Hard recursion limit for the build; bounds the traversal stack.
pub const MAX_DEPTH: usize = 32;

const STACK_SIZE: usize = 2 * MAX_DEPTH + 1;

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    aabb: Aabb,
    left: u32,
    right: u32,
    leaf: Option<u32>,
}

impl Default for BvhNode {
    fn default() -> Self {
        Self {
            aabb: Aabb::EMPTY,
            left: 0,
            right: 0,
            leaf: None,
        }
    }
}

/// A leaf's owned primitive list. Vertex data is not copied; triangles are
/// fetched from the mesh instance shared by the whole tree.
struct PrimitiveGroup {
    primitives: Vec<u32>,
}

/// BVH over one mesh instance's triangles.
pub struct Bvh {
    instance: Arc<MeshInstance>,
    nodes: Vec<BvhNode>,
    leaves: Vec<PrimitiveGroup>,
}

impl Bvh {
    pub fn build(instance: Arc<MeshInstance>) -> Self {
        let primitives: Vec<u32> = (0..instance.triangle_count()).collect();
        let mut bvh = Self {
            instance,
            nodes: vec![BvhNode::default()],
            leaves: Vec::new(),
        };
        if !primitives.is_empty() {
            bvh.nodes.reserve(primitives.len());
            bvh.build_node(0, primitives, 0, 0);
        }
        log::debug!(
            "built bvh: {} nodes, {} leaves, {} triangles",
            bvh.nodes.len(),
            bvh.leaves.len(),
            bvh.instance.triangle_count()
        );
        bvh
    }

    fn build_node(&mut self, node_index: usize, primitives: Vec<u32>, depth: usize, axis: usize) {
        let mut aabb = Aabb::EMPTY;
        for &primitive in &primitives {
            aabb = aabb.union(&self.instance.primitive_aabb(primitive));
        }
        self.nodes[node_index].aabb = aabb;

        if primitives.len() < MAX_PRIMITIVES_PER_LEAF || depth >= MAX_DEPTH {
            self.build_leaf(node_index, primitives);
            return;
        }

        let mut midpoints: Vec<f32> = primitives
            .iter()
            .map(|&primitive| self.instance.primitive_aabb(primitive).centroid_axis(axis))
            .collect();
        midpoints.sort_by(f32::total_cmp);
        let median = if midpoints.len() % 2 == 0 {
            let hi = midpoints.len() / 2;
            (midpoints[hi - 1] + midpoints[hi]) * 0.5
        } else {
            midpoints[midpoints.len() / 2]
        };

        let (left, right): (Vec<u32>, Vec<u32>) = primitives
            .iter()
            .partition(|&&primitive| self.instance.primitive_aabb(primitive).centroid_axis(axis) < median);

        // All midpoints coincident: splitting cannot make progress, so stop
        // here instead of recursing forever.
        if left.is_empty() || right.is_empty() {
            self.build_leaf(node_index, primitives);
            return;
        }

        let next_axis = (axis + 1) % 3;

        let left_index = self.nodes.len();
        self.nodes[node_index].left = left_index as u32;
        self.nodes.push(BvhNode::default());
        self.build_node(left_index, left, depth + 1, next_axis);

        let right_index = self.nodes.len();
        self.nodes[node_index].right = right_index as u32;
        self.nodes.push(BvhNode::default());
        self.build_node(right_index, right, depth + 1, next_axis);
    }

    fn build_leaf(&mut self, node_index: usize, primitives: Vec<u32>) {
        self.nodes[node_index].leaf = Some(self.leaves.len() as u32);
        self.leaves.push(PrimitiveGroup { primitives });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Any-hit query; cheaper contract than [`Shape::intersect`] even though
    /// it shares the traversal.
    pub fn occluded(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}

impl Shape for Bvh {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let mut stack = [0u32; STACK_SIZE];
        let mut stack_len = 1usize;
        stack[0] = 0;

        // Local copy whose t_max narrows as primitive hits confirm; box tests
        // against it then reject anything farther than the current best.
        let mut query = *ray;
        let mut best: Option<Intersection> = None;
        let mut num_tests = 0u32;

        while stack_len > 0 {
            stack_len -= 1;
            let node = &self.nodes[stack[stack_len] as usize];

            num_tests += 1;
            if node.aabb.intersect(&query).is_none() {
                continue;
            }

            if node.left > 0 && stack_len < STACK_SIZE {
                stack[stack_len] = node.left;
                stack_len += 1;
            }
            if node.right > 0 && stack_len < STACK_SIZE {
                stack[stack_len] = node.right;
                stack_len += 1;
            }

            if let Some(leaf) = node.leaf {
                let group = &self.leaves[leaf as usize];
                for &primitive in &group.primitives {
                    num_tests += 1;
                    let [a, b, c] = self.instance.triangle(primitive);
                    if let Some(hit) = intersect_triangle(&query, a, b, c, primitive) {
                        query.t_max = hit.t;
                        best = Some(hit);
                    }
                }
            }
        }

        best.map(|mut hit| {
            hit.num_tests = num_tests;
            hit
        })
    }

    fn aabb(&self) -> Aabb {
        self.nodes[0].aabb
    }

    fn sample_fragment(&self, hit: &Intersection) -> Fragment {
        let attrs = self.instance.interpolate(hit.primitive, hit.barycentric);
        // Shading attributes follow the side the ray arrived on.
        let sign = if hit.front_facing { 1.0 } else { -1.0 };
        Fragment {
            position: hit.position,
            normal: attrs.normal * sign,
            flat_normal: hit.flat_normal,
            tangent: attrs.tangent,
            uv: attrs.uv,
            front_facing: hit.front_facing,
        }
    }
}

/// Moller-Trumbore triangle test, two-sided.
///
/// The determinant's sign tells which side the ray approaches from; the flat
/// normal is flipped toward the ray for back-face hits and `front_facing`
/// records the original orientation.
fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3, primitive: u32) -> Option<Intersection> {
    let ab = b - a;
    let ac = c - a;

    let pvec = ray.direction.cross(ac);
    let det = ab.dot(pvec);
    // Near-zero determinant: ray parallel to the plane, or a degenerate
    // triangle. Reject instead of dividing toward NaN.
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(ab);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = ac.dot(qvec) * inv_det;
    if !ray.contains(t) {
        return None;
    }

    // Winding is counter-clockwise, so det > 0 means the geometric normal
    // opposes the ray (front face).
    let front_facing = det > 0.0;
    let normal = ab.cross(ac).normalize();
    let flat_normal = if front_facing { normal } else { -normal };

    Some(Intersection {
        t,
        position: ray.at(t),
        barycentric: ember_math::Vec2::new(u, v),
        flat_normal,
        primitive,
        front_facing,
        num_tests: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::meshgen::uv_sphere;
    use ember_core::Mesh;
    use ember_core::Vertex;
    use ember_math::{Mat4, Vec2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sphere_bvh() -> Bvh {
        let mesh = uv_sphere(1.0, 24, 12);
        Bvh::build(Arc::new(MeshInstance::new(&mesh, Mat4::IDENTITY)))
    }

    /// Closest hit by testing every triangle, no acceleration.
    fn brute_force(instance: &MeshInstance, ray: &Ray) -> Option<Intersection> {
        let mut query = *ray;
        let mut best = None;
        for primitive in 0..instance.triangle_count() {
            let [a, b, c] = instance.triangle(primitive);
            if let Some(hit) = intersect_triangle(&query, a, b, c, primitive) {
                query.t_max = hit.t;
                best = Some(hit);
            }
        }
        best
    }

    #[test]
    fn test_matches_brute_force_on_random_rays() {
        let mesh = uv_sphere(1.0, 24, 12);
        let instance = Arc::new(MeshInstance::new(&mesh, Mat4::IDENTITY));
        let bvh = Bvh::build(instance.clone());
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let origin = Vec3::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            );
            let target = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            let direction = (target - origin).normalize_or_zero();
            if direction == Vec3::ZERO {
                continue;
            }
            let ray = Ray::new(origin, direction, 1e-4, f32::INFINITY);

            let expected = brute_force(&instance, &ray);
            let actual = bvh.intersect(&ray);

            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => {
                    assert!((e.t - a.t).abs() < 1e-4, "t mismatch: {} vs {}", e.t, a.t);
                    assert_eq!(e.primitive, a.primitive);
                    assert_eq!(e.front_facing, a.front_facing);
                }
                (e, a) => panic!("hit mismatch: expected {:?}, got {:?}", e.map(|h| h.t), a.map(|h| h.t)),
            }
        }
    }

    #[test]
    fn test_ray_through_center_hits_near_surface() {
        let bvh = sphere_bvh();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 1e-4, f32::INFINITY);
        let hit = bvh.intersect(&ray).unwrap();
        // Faceted sphere: the surface sits slightly inside the unit radius.
        assert!((hit.t - 4.0).abs() < 0.05);
        assert!(hit.front_facing);
        assert!(hit.flat_normal.dot(Vec3::Z) < 0.0);
    }

    #[test]
    fn test_back_face_hit_flips_flat_normal() {
        let bvh = sphere_bvh();
        // From inside the sphere: every hit is a back face.
        let ray = Ray::new(Vec3::ZERO, Vec3::Z, 1e-4, f32::INFINITY);
        let hit = bvh.intersect(&ray).unwrap();
        assert!(!hit.front_facing);
        // Flipped toward the ray origin.
        assert!(hit.flat_normal.dot(Vec3::Z) < 0.0);
    }

    #[test]
    fn test_miss_returns_none() {
        let bvh = sphere_bvh();
        let ray = Ray::new(Vec3::new(0.0, 5.0, -5.0), Vec3::Z, 1e-4, f32::INFINITY);
        assert!(bvh.intersect(&ray).is_none());
        assert!(!bvh.occluded(&ray));
    }

    #[test]
    fn test_t_max_limits_hits() {
        let bvh = sphere_bvh();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 1e-4, 2.0);
        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn test_empty_mesh_never_hits() {
        let mesh = Mesh::new(Vec::new(), Vec::new()).unwrap();
        let bvh = Bvh::build(Arc::new(MeshInstance::new(&mesh, Mat4::IDENTITY)));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z, 0.0, f32::INFINITY);
        assert!(bvh.intersect(&ray).is_none());
        assert!(!bvh.occluded(&ray));
    }

    #[test]
    fn test_degenerate_triangle_rejected() {
        let v = Vertex {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            tangent: Vec3::X,
            uv: Vec2::ZERO,
        };
        // All three corners identical.
        let mesh = Mesh::new(vec![v, v, v], vec![0, 1, 2]).unwrap();
        let bvh = Bvh::build(Arc::new(MeshInstance::new(&mesh, Mat4::IDENTITY)));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, 1e-4, f32::INFINITY);
        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn test_counts_intersection_tests() {
        let bvh = sphere_bvh();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 1e-4, f32::INFINITY);
        let hit = bvh.intersect(&ray).unwrap();
        assert!(hit.num_tests > 0);
        // Far fewer tests than brute force over every triangle.
        assert!(hit.num_tests < bvh.instance.triangle_count());
    }

    #[test]
    fn test_every_primitive_in_exactly_one_leaf() {
        let bvh = sphere_bvh();
        let mut seen = vec![0u32; bvh.instance.triangle_count() as usize];
        let mut leaf_union = Aabb::EMPTY;

        for node in &bvh.nodes {
            if let Some(leaf) = node.leaf {
                leaf_union = leaf_union.union(&node.aabb);
                for &primitive in &bvh.leaves[leaf as usize].primitives {
                    seen[primitive as usize] += 1;
                }
            }
        }

        for (primitive, &count) in seen.iter().enumerate() {
            assert_eq!(count, 1, "triangle {primitive} held by {count} leaves");
        }

        // Leaves partition the geometry, so their boxes cover the root box.
        let root = bvh.aabb();
        assert!(leaf_union.min.cmple(root.min).all());
        assert!(leaf_union.max.cmpge(root.max).all());
    }

    #[test]
    fn test_leaf_threshold_produces_multiple_nodes() {
        let bvh = sphere_bvh();
        assert!(bvh.node_count() > 1);
    }
}
