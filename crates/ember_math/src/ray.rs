use crate::Vec3;

/// A ray in 3D space with a valid parametric interval `[t_min, t_max]`.
///
/// Callers are expected (but not required by contract) to pass a normalized
/// direction. `t_max` is mutable on purpose: intersection routines shrink it
/// as closer hits are found, so a hit recorded at parameter `t` can never be
/// replaced by a farther candidate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    /// Create a new ray with an explicit parametric interval.
    pub fn new(origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> Self {
        Self {
            origin,
            direction,
            t_min,
            t_max,
        }
    }

    /// Create a ray valid on `[t_min, +inf)`.
    pub fn unbounded(origin: Vec3, direction: Vec3, t_min: f32) -> Self {
        Self::new(origin, direction, t_min, f32::INFINITY)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Returns true if t lies inside the ray's valid interval.
    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        self.t_min <= t && t <= self.t_max
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::unbounded(Vec3::ZERO, Vec3::Z, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::unbounded(Vec3::ZERO, Vec3::X, 0.0);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_interval() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 0.5, 10.0);

        assert!(ray.contains(0.5));
        assert!(ray.contains(10.0));
        assert!(!ray.contains(0.4));
        assert!(!ray.contains(10.1));
    }

    #[test]
    fn test_ray_narrowing() {
        let mut ray = Ray::unbounded(Vec3::ZERO, Vec3::X, 0.0);
        ray.t_max = 5.0;

        // A farther candidate is now outside the valid interval
        assert!(!ray.contains(7.0));
        assert!(ray.contains(3.0));
    }
}
