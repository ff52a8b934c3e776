//! Environment capability: radiance for rays that leave the scene.

use ember_math::Vec3;

/// Trait for environment lighting.
pub trait Sky: Send + Sync {
    fn sample_radiance(&self, direction: Vec3) -> Vec3;
}

/// Constant radiance in every direction.
#[derive(Debug, Clone, Copy)]
pub struct UniformSky {
    pub radiance: Vec3,
}

impl UniformSky {
    pub fn new(radiance: Vec3) -> Self {
        Self { radiance }
    }
}

impl Sky for UniformSky {
    fn sample_radiance(&self, _direction: Vec3) -> Vec3 {
        self.radiance
    }
}

/// Vertical gradient between a horizon and a zenith color.
#[derive(Debug, Clone, Copy)]
pub struct GradientSky {
    pub horizon: Vec3,
    pub zenith: Vec3,
}

impl GradientSky {
    pub fn new(horizon: Vec3, zenith: Vec3) -> Self {
        Self { horizon, zenith }
    }
}

impl Sky for GradientSky {
    fn sample_radiance(&self, direction: Vec3) -> Vec3 {
        let a = 0.5 * (direction.normalize_or_zero().y + 1.0);
        self.horizon * (1.0 - a) + self.zenith * a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_endpoints() {
        let sky = GradientSky::new(Vec3::ONE, Vec3::new(0.5, 0.7, 1.0));

        let up = sky.sample_radiance(Vec3::Y);
        let down = sky.sample_radiance(Vec3::new(0.0, -1.0, 0.0));

        assert!((up - Vec3::new(0.5, 0.7, 1.0)).abs().max_element() < 1e-6);
        assert!((down - Vec3::ONE).abs().max_element() < 1e-6);
    }
}
