//! Light capability: sample incident radiance toward a surface point.

use ember_math::Vec3;
use rand::RngCore;

use crate::sampling::uniform_cone;

/// One light sample toward a shading point.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Unit direction from the point toward the light
    pub direction: Vec3,
    /// Incident radiance arriving along `direction`
    pub radiance: Vec3,
    /// Distance to the light; shadow rays stop here
    pub distance: f32,
}

/// Trait for light sources.
pub trait Light: Send + Sync {
    fn sample(&self, point: Vec3, rng: &mut dyn RngCore) -> LightSample;
}

/// Omnidirectional emitter with inverse-square falloff.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: Vec3,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: Vec3) -> Self {
        Self {
            position,
            intensity,
        }
    }
}

impl Light for PointLight {
    fn sample(&self, point: Vec3, _rng: &mut dyn RngCore) -> LightSample {
        let to_light = self.position - point;
        let dist_sq = to_light.length_squared().max(1e-8);
        let distance = dist_sq.sqrt();

        LightSample {
            direction: to_light / distance,
            radiance: self.intensity / dist_sq,
            distance,
        }
    }
}

/// Sun-style light: parallel rays jittered within a small source cone so
/// shadows have soft edges.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    direction: Vec3,
    intensity: Vec3,
    cos_source_angle: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, intensity: Vec3, source_angle_deg: f32) -> Self {
        Self {
            direction: direction.normalize(),
            intensity,
            cos_source_angle: source_angle_deg.to_radians().cos(),
        }
    }
}

impl Light for DirectionalLight {
    fn sample(&self, _point: Vec3, rng: &mut dyn RngCore) -> LightSample {
        LightSample {
            direction: uniform_cone(-self.direction, self.cos_source_angle, rng),
            radiance: self.intensity,
            distance: f32::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_point_light_inverse_square() {
        let light = PointLight::new(Vec3::new(0.0, 10.0, 0.0), Vec3::splat(50.0));
        let mut rng = StdRng::seed_from_u64(1);

        let near = light.sample(Vec3::new(0.0, 5.0, 0.0), &mut rng);
        let far = light.sample(Vec3::ZERO, &mut rng);

        assert!((near.distance - 5.0).abs() < 1e-5);
        assert!((far.distance - 10.0).abs() < 1e-5);
        // Twice the distance, a quarter the radiance
        assert!((near.radiance.x / far.radiance.x - 4.0).abs() < 1e-4);
        assert!((near.direction - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_directional_light_cone() {
        let light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, 2.0);
        let mut rng = StdRng::seed_from_u64(4);
        let cos_max = 2f32.to_radians().cos();

        for _ in 0..200 {
            let sample = light.sample(Vec3::ZERO, &mut rng);
            assert!(sample.distance.is_infinite());
            // Samples point back toward the source, within the cone
            assert!(sample.direction.dot(Vec3::Y) >= cos_max - 1e-4);
        }
    }
}
