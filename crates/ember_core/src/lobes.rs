//! Concrete BSDF lobes used by the built-in materials.

use ember_math::Vec3;
use rand::RngCore;

use crate::bsdf::{Lobe, LobeKind};
use crate::sampling::{cosine_hemisphere, gen_f32};

/// Ideal diffuse (Lambertian) reflection.
#[derive(Debug, Clone, Copy)]
pub struct LambertLobe {
    reflectance: Vec3,
    normal: Vec3,
}

impl LambertLobe {
    pub fn new(reflectance: Vec3, normal: Vec3) -> Self {
        Self {
            reflectance,
            normal,
        }
    }
}

impl Lobe for LambertLobe {
    fn evaluate_cos(&self, _wo: Vec3, _wm: Vec3, wi: Vec3) -> Vec3 {
        wi.dot(self.normal).max(0.0) * self.reflectance * std::f32::consts::FRAC_1_PI
    }

    fn pdf(&self, _wo: Vec3, _wm: Vec3, wi: Vec3) -> f32 {
        wi.dot(self.normal).max(0.0) * std::f32::consts::FRAC_1_PI
    }

    fn sample(&self, _wo: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        cosine_hemisphere(self.normal, rng)
    }

    fn kind(&self) -> LobeKind {
        LobeKind::DIFFUSE
    }
}

/// Dirac forward transmission: light passes straight through, attenuated by
/// the transmission color and the material's opacity. Used for thin cutout
/// surfaces and by the shadow-transmission walk.
#[derive(Debug, Clone, Copy)]
pub struct PassthroughLobe {
    transmission: Vec3,
    opacity: f32,
}

impl PassthroughLobe {
    /// `wi` counts as "straight through" when dot(wi, -wo) exceeds this.
    const DIRAC_EPSILON: f32 = 1.0 - 1e-6;

    pub fn new(transmission: Vec3, opacity: f32) -> Self {
        Self {
            transmission,
            opacity,
        }
    }
}

impl Lobe for PassthroughLobe {
    fn evaluate_cos(&self, wo: Vec3, _wm: Vec3, wi: Vec3) -> Vec3 {
        if wi.dot(-wo) > Self::DIRAC_EPSILON {
            self.transmission * (1.0 - self.opacity)
        } else {
            Vec3::ZERO
        }
    }

    fn pdf(&self, wo: Vec3, _wm: Vec3, wi: Vec3) -> f32 {
        if wi.dot(-wo) > Self::DIRAC_EPSILON {
            1.0 - self.opacity
        } else {
            0.0
        }
    }

    fn sample(&self, wo: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        if gen_f32(rng) < self.opacity {
            // Absorbed; the integrator treats a degenerate direction as a
            // terminated path.
            return Vec3::ZERO;
        }
        -wo
    }

    fn kind(&self) -> LobeKind {
        LobeKind::TRANSMISSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lambert_energy_non_negative() {
        let lobe = LambertLobe::new(Vec3::new(0.8, 0.6, 0.4), Vec3::Y);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let wo = cosine_hemisphere(Vec3::Y, &mut rng);
            let wi = cosine_hemisphere(Vec3::Y, &mut rng);
            let wm = (wo + wi).normalize();
            let f = lobe.evaluate_cos(wo, wm, wi);
            assert!(f.min_element() >= 0.0, "negative energy: {f:?}");
        }
    }

    #[test]
    fn test_lambert_below_horizon_is_black() {
        let lobe = LambertLobe::new(Vec3::ONE, Vec3::Y);
        let wi = Vec3::new(0.0, -1.0, 0.0);
        assert_eq!(lobe.evaluate_cos(Vec3::Y, Vec3::Y, wi), Vec3::ZERO);
        assert_eq!(lobe.pdf(Vec3::Y, Vec3::Y, wi), 0.0);
    }

    #[test]
    fn test_lambert_sample_matches_pdf_support() {
        let lobe = LambertLobe::new(Vec3::ONE, Vec3::Y);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let wi = lobe.sample(Vec3::Y, &mut rng);
            assert!(lobe.pdf(Vec3::Y, Vec3::Y, wi) > 0.0);
        }
    }

    #[test]
    fn test_passthrough_forward_only() {
        let lobe = PassthroughLobe::new(Vec3::splat(0.9), 0.0);
        let wo = Vec3::Z;

        // Straight through: wi = -wo
        let f = lobe.evaluate_cos(wo, wo, -wo);
        assert!((f - Vec3::splat(0.9)).abs().max_element() < 1e-6);

        // Any other direction transmits nothing
        let f = lobe.evaluate_cos(wo, wo, Vec3::X);
        assert_eq!(f, Vec3::ZERO);
    }

    #[test]
    fn test_passthrough_opacity_attenuates() {
        let lobe = PassthroughLobe::new(Vec3::ONE, 0.75);
        let wo = Vec3::Z;
        let f = lobe.evaluate_cos(wo, wo, -wo);
        assert!((f - Vec3::splat(0.25)).abs().max_element() < 1e-6);
        assert!((lobe.pdf(wo, wo, -wo) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_fully_opaque_passthrough_absorbs() {
        let lobe = PassthroughLobe::new(Vec3::ONE, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            assert_eq!(lobe.sample(Vec3::Z, &mut rng), Vec3::ZERO);
        }
    }
}
