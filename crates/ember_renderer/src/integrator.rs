//! Iterative path integrator with next-event estimation.

use std::cell::RefCell;

use ember_core::sampling::gen_f32;
use ember_core::{BakedScene, Bsdf, DrawableActor, Intersection, LobeKind, Sky};
use ember_math::{Ray, Vec3};
use rand::RngCore;

/// Offset applied along the normal (or shadow ray direction) when respawning
/// a ray at a surface, so it does not re-hit the same facet. Scenes are
/// expected to be roughly unit scale.
pub const SURFACE_BIAS: f32 = 1e-6;

/// Shadow rays start slightly off the surface as well, but with a larger
/// margin since they originate at un-offset hit positions.
const SHADOW_T_MIN: f32 = 1e-3;

/// Transparent surfaces a shadow ray may pass through before the light is
/// assumed blocked.
const MAX_TRANSPARENT_LAYERS: u32 = 8;

/// Roulette only kicks in once a path has had a chance to carry energy.
const ROULETTE_START_BOUNCE: u32 = 3;

/// Cutout surfaces a single scene query may skip before giving up.
const MAX_DISCARD_RETRIES: u32 = 64;

thread_local! {
    // Reused per ray-surface interaction; steady state allocates nothing.
    static SCRATCH_BSDF: RefCell<Bsdf> = RefCell::new(Bsdf::new());
    // Separate composer for the shadow walk, which runs while the primary
    // hit's composer is still borrowed.
    static SHADOW_BSDF: RefCell<Bsdf> = RefCell::new(Bsdf::new());
}

/// Per-frame integration settings, resolved by the renderer from its public
/// parameters before workers start.
#[derive(Debug, Clone, Copy)]
pub struct PathSettings {
    pub max_bounces: u32,
    /// Upper bound applied to each bounce's radiance contribution.
    /// `f32::INFINITY` disables clamping.
    pub radiance_clamp: f32,
    /// Probabilistic termination of long low-energy paths.
    pub russian_roulette: bool,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            max_bounces: 4,
            radiance_clamp: f32::INFINITY,
            russian_roulette: true,
        }
    }
}

/// Borrowed view of everything a worker needs to trace rays for one frame.
#[derive(Clone, Copy)]
pub struct Integrator<'a> {
    pub scene: &'a BakedScene,
    pub sky: &'a dyn Sky,
    pub settings: PathSettings,
}

impl<'a> Integrator<'a> {
    /// Monte Carlo estimate of the radiance arriving along `ray`.
    pub fn trace_path(&self, ray: Ray, rng: &mut dyn RngCore) -> Vec3 {
        let mut ray = ray;
        let mut radiance = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let clamp = Vec3::splat(self.settings.radiance_clamp);

        for bounce in 0..=self.settings.max_bounces {
            let Some((hit, actor)) = self.intersect_scene(&ray) else {
                radiance += throughput * self.sky.sample_radiance(ray.direction);
                break;
            };
            let wo = -ray.direction;
            let fragment = actor.shape.sample_fragment(&hit);

            let sample = SCRATCH_BSDF.with(|cell| {
                let bsdf = &mut *cell.borrow_mut();
                bsdf.reset();
                let emission = actor.material.evaluate(&fragment, bsdf);

                let direct = if bsdf.has_lobes() {
                    self.direct_lighting(hit.position, wo, bsdf, rng).min(clamp)
                } else {
                    Vec3::ZERO
                };
                radiance += (throughput * (direct + emission)).min(clamp);

                if bounce == self.settings.max_bounces {
                    return None;
                }
                bsdf.sample_evaluate(wo, rng)
            });

            let Some(sample) = sample else { break };
            // Degenerate samples are treated as absorbed, not as errors; a
            // single malformed sample must not poison the accumulated image.
            if !sample.pdf.is_finite()
                || sample.pdf < f32::EPSILON
                || sample.value.cmplt(Vec3::splat(f32::EPSILON)).all()
                || sample.value.is_nan()
            {
                break;
            }
            throughput *= sample.value / sample.pdf;

            let sign = sample.wi.dot(hit.flat_normal).signum();
            ray = Ray::unbounded(
                hit.position + sign * hit.flat_normal * SURFACE_BIAS,
                sample.wi,
                ray.t_min,
            );

            if self.settings.russian_roulette && bounce > ROULETTE_START_BOUNCE {
                let p = throughput.max_element().min(1.0);
                if gen_f32(rng) > p {
                    break;
                }
                // The compensating division is what keeps the estimator
                // unbiased; dropping it darkens the image systematically.
                throughput /= p;
            }
        }

        radiance
    }

    /// Closest non-discarded hit across the flat drawable list.
    pub fn intersect_scene(&self, ray: &Ray) -> Option<(Intersection, &'a DrawableActor)> {
        let mut query = *ray;
        let mut closest = None;

        for actor in &self.scene.drawables {
            if let Some(hit) = intersect_actor(actor, &query) {
                query.t_max = hit.t;
                closest = Some((hit, actor));
            }
        }
        closest
    }

    /// Next-event estimation over every light in the scene.
    fn direct_lighting(
        &self,
        position: Vec3,
        wo: Vec3,
        bsdf: &Bsdf,
        rng: &mut dyn RngCore,
    ) -> Vec3 {
        let mut direct = Vec3::ZERO;

        for light_actor in &self.scene.lights {
            let sample = light_actor.light.sample(position, rng);
            let shadow_ray = Ray::new(position, sample.direction, SHADOW_T_MIN, sample.distance);
            let transmission = self.shadow_transmission(shadow_ray);

            if transmission.length_squared() > 0.0 {
                let wm = half_vector(wo, sample.direction);
                direct +=
                    transmission * sample.radiance * bsdf.evaluate(wo, wm, sample.direction);
            }
        }
        direct
    }

    /// Walks a shadow ray through transparent surfaces, accumulating the
    /// forward-transmission factor. Opaque surfaces and too many layers both
    /// resolve to fully blocked.
    fn shadow_transmission(&self, mut ray: Ray) -> Vec3 {
        let mut transmission = Vec3::ONE;

        for _ in 0..MAX_TRANSPARENT_LAYERS {
            let Some((hit, actor)) = self.intersect_scene(&ray) else {
                return transmission;
            };
            let fragment = actor.shape.sample_fragment(&hit);

            let layer = SHADOW_BSDF.with(|cell| {
                let bsdf = &mut *cell.borrow_mut();
                bsdf.reset();
                actor.material.evaluate(&fragment, bsdf);
                if !bsdf.kind().intersects(LobeKind::TRANSMISSION) {
                    return Vec3::ZERO;
                }
                // "How much light passes straight through?"
                bsdf.evaluate(-ray.direction, ray.direction, ray.direction)
            });

            if layer.length_squared() < 1e-6 {
                return Vec3::ZERO;
            }
            transmission *= layer;

            ray.origin = hit.position + ray.direction * SURFACE_BIAS;
            ray.t_max -= hit.t;
        }

        Vec3::ZERO
    }
}

/// Intersects one actor, skipping hits its material discards (alpha cutout).
/// Discard is decided before a hit may become the closest one.
fn intersect_actor(actor: &DrawableActor, ray: &Ray) -> Option<Intersection> {
    let mut query = *ray;
    for _ in 0..MAX_DISCARD_RETRIES {
        let hit = actor.shape.intersect(&query)?;
        let fragment = actor.shape.sample_fragment(&hit);
        if actor.material.should_discard(&fragment) {
            query.t_min = hit.t + SURFACE_BIAS;
            continue;
        }
        return Some(hit);
    }
    None
}

/// Half-vector between view and light directions, degenerating to `wo` when
/// they oppose each other (forward transmission).
fn half_vector(wo: Vec3, wi: Vec3) -> Vec3 {
    if wi.dot(wo).abs() > 1.0 - f32::EPSILON {
        wo
    } else {
        (wi + wo).normalize()
    }
}
