//! Material capability: turn a shading point into BSDF lobes + emission.

use ember_math::Vec3;

use crate::bsdf::Bsdf;
use crate::lobes::{LambertLobe, PassthroughLobe};
use crate::shape::Fragment;

/// Trait for materials.
///
/// `evaluate` populates the caller-owned composer with zero or more lobes
/// and returns the surface's emission (black for non-emitters). A material
/// adding zero lobes marks a fully emissive or fully discarded surface; the
/// integrator skips direct lighting and bounce sampling for it.
pub trait Material: Send + Sync {
    fn evaluate(&self, fragment: &Fragment, bsdf: &mut Bsdf) -> Vec3;

    /// Alpha-test hook: true means the hit must be rejected before it is
    /// accepted as the closest one (cutout geometry).
    fn should_discard(&self, _fragment: &Fragment) -> bool {
        false
    }
}

/// Plain diffuse surface.
#[derive(Debug, Clone, Copy)]
pub struct DiffuseMaterial {
    pub albedo: Vec3,
}

impl DiffuseMaterial {
    pub fn new(albedo: Vec3) -> Self {
        Self { albedo }
    }
}

impl Material for DiffuseMaterial {
    fn evaluate(&self, fragment: &Fragment, bsdf: &mut Bsdf) -> Vec3 {
        bsdf.add(LambertLobe::new(self.albedo, fragment.normal));
        Vec3::ZERO
    }
}

/// Pure emitter. Adds no lobes, so paths terminate here.
#[derive(Debug, Clone, Copy)]
pub struct EmissiveMaterial {
    pub emission: Vec3,
}

impl EmissiveMaterial {
    pub fn new(emission: Vec3) -> Self {
        Self { emission }
    }
}

impl Material for EmissiveMaterial {
    fn evaluate(&self, _fragment: &Fragment, _bsdf: &mut Bsdf) -> Vec3 {
        self.emission
    }
}

/// Thin transparent surface with partial opacity. The diffuse part scatters,
/// the pass-through part lets shadow rays walk through the surface.
#[derive(Debug, Clone, Copy)]
pub struct TransparentMaterial {
    pub transmission: Vec3,
    pub opacity: f32,
}

impl TransparentMaterial {
    pub fn new(transmission: Vec3, opacity: f32) -> Self {
        Self {
            transmission,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

impl Material for TransparentMaterial {
    fn evaluate(&self, _fragment: &Fragment, bsdf: &mut Bsdf) -> Vec3 {
        bsdf.add(PassthroughLobe::new(self.transmission, self.opacity));
        Vec3::ZERO
    }
}

/// Diffuse surface with a UV checker cutout. Cells alternate between solid
/// and discarded, exercising the alpha-test path.
#[derive(Debug, Clone, Copy)]
pub struct CutoutMaterial {
    pub albedo: Vec3,
    /// Checker cells per UV unit
    pub cells: f32,
}

impl CutoutMaterial {
    pub fn new(albedo: Vec3, cells: f32) -> Self {
        Self { albedo, cells }
    }
}

impl Material for CutoutMaterial {
    fn evaluate(&self, fragment: &Fragment, bsdf: &mut Bsdf) -> Vec3 {
        bsdf.add(LambertLobe::new(self.albedo, fragment.normal));
        Vec3::ZERO
    }

    fn should_discard(&self, fragment: &Fragment) -> bool {
        let u = (fragment.uv.x * self.cells).floor() as i32;
        let v = (fragment.uv.y * self.cells).floor() as i32;
        (u + v).rem_euclid(2) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_math::Vec2;

    fn fragment() -> Fragment {
        Fragment {
            normal: Vec3::Y,
            flat_normal: Vec3::Y,
            front_facing: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_diffuse_populates_one_lobe() {
        let mut bsdf = Bsdf::new();
        let emission = DiffuseMaterial::new(Vec3::splat(0.5)).evaluate(&fragment(), &mut bsdf);
        assert_eq!(bsdf.lobe_count(), 1);
        assert_eq!(emission, Vec3::ZERO);
    }

    #[test]
    fn test_emissive_adds_no_lobes() {
        let mut bsdf = Bsdf::new();
        let emission = EmissiveMaterial::new(Vec3::new(2.0, 1.0, 0.5)).evaluate(&fragment(), &mut bsdf);
        assert!(!bsdf.has_lobes());
        assert_eq!(emission, Vec3::new(2.0, 1.0, 0.5));
    }

    #[test]
    fn test_cutout_checker() {
        let material = CutoutMaterial::new(Vec3::ONE, 2.0);

        let mut solid = fragment();
        solid.uv = Vec2::new(0.1, 0.1); // cell (0, 0)
        assert!(!material.should_discard(&solid));

        let mut hole = fragment();
        hole.uv = Vec2::new(0.6, 0.1); // cell (1, 0)
        assert!(material.should_discard(&hole));
    }
}
