use crate::{Ray, Vec3};

/// Axis-aligned bounding box defined by min/max corners.
///
/// The empty box uses inverted infinite corners so that `union` with any
/// real box yields that box unchanged.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An empty AABB (contains nothing).
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create an AABB from min/max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box to contain a point.
    pub fn grow(&self, p: Vec3) -> Aabb {
        Aabb {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// Center of the box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Midpoint of the box along one axis (0=X, 1=Y, 2=Z).
    pub fn centroid_axis(&self, axis: usize) -> f32 {
        (self.min[axis] + self.max[axis]) * 0.5
    }

    /// Slab-test intersection against the ray's `[t_min, t_max]` interval.
    ///
    /// Returns the entry/exit parametric distances on a hit. A tiny bias is
    /// added to each direction component before inverting so axis-aligned
    /// rays (zero component) never produce a NaN comparison. `signum`
    /// returns 1.0 for +0.0, so the divisor is always non-zero.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        let inv_dir = (ray.direction + ray.direction.signum() * 1e-9).recip();

        let t_lo = (self.min - ray.origin) * inv_dir;
        let t_hi = (self.max - ray.origin) * inv_dir;

        let t_near = t_lo.min(t_hi);
        let t_far = t_lo.max(t_hi);

        let t_in = t_near.max_element();
        let t_out = t_far.min_element();

        if t_in > t_out {
            return None;
        }
        if t_out < ray.t_min || t_in > ray.t_max {
            return None;
        }
        Some((t_in, t_out))
    }

    /// Boolean form of [`Aabb::intersect`].
    #[inline]
    pub fn hit(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_aabb_union() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let b = Aabb::from_points(Vec3::new(3.0, 3.0, 3.0), Vec3::new(10.0, 10.0, 10.0));
        let u = a.union(&b);

        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let u = Aabb::EMPTY.union(&a);
        assert_eq!(u, a);
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = unit_box();

        // Ray pointing at center
        let ray = Ray::unbounded(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0);
        let (t_in, t_out) = aabb.intersect(&ray).expect("should hit");
        assert!((t_in - 4.0).abs() < 1e-5);
        assert!((t_out - 6.0).abs() < 1e-5);

        // Ray pointing away
        let ray = Ray::unbounded(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z, 0.0);
        assert!(!aabb.hit(&ray));

        // Ray missing the box
        let ray = Ray::unbounded(Vec3::new(10.0, 0.0, 0.0), Vec3::Z, 0.0);
        assert!(!aabb.hit(&ray));
    }

    #[test]
    fn test_axis_aligned_ray_no_nan() {
        // Direction components of exactly zero must not poison the slab test
        let aabb = unit_box();
        let ray = Ray::unbounded(Vec3::new(0.5, 0.5, -5.0), Vec3::new(0.0, 0.0, 1.0), 0.0);
        assert!(aabb.hit(&ray));

        // Same ray shifted outside the box misses cleanly
        let ray = Ray::unbounded(Vec3::new(2.0, 0.5, -5.0), Vec3::new(0.0, 0.0, 1.0), 0.0);
        assert!(!aabb.hit(&ray));
    }

    #[test]
    fn test_interval_rejection() {
        let aabb = unit_box();

        // Box fully behind t_min
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 7.0, 100.0);
        assert!(!aabb.hit(&ray));

        // Box fully past t_max
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, 3.0);
        assert!(!aabb.hit(&ray));
    }

    #[test]
    fn test_ray_starting_inside() {
        let aabb = unit_box();
        let ray = Ray::unbounded(Vec3::ZERO, Vec3::Z, 0.0);
        let (t_in, t_out) = aabb.intersect(&ray).expect("should hit from inside");
        assert!(t_in < 0.0);
        assert!((t_out - 1.0).abs() < 1e-5);
    }
}
