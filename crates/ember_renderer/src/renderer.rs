//! Progressive renderer facade tying camera, scene, integrator, buffer and
//! scheduler together.

use std::sync::Arc;

use ember_core::{BakedScene, Sky, UniformSky};
use ember_math::{Vec2, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::accum::{AccumBuffer, Rgba8};
use crate::camera::Camera;
use crate::integrator::{Integrator, PathSettings};
use crate::rng::{pixel_seed, HashRng};
use crate::scheduler::TileScheduler;
use crate::tile::tiles_for;

/// User-facing render settings. Changing any of them invalidates the
/// accumulated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParameters {
    pub max_bounces: u32,
    /// Sum samples across frames when true; overwrite each frame when false.
    pub accumulate: bool,
    /// Bound per-bounce radiance by the inverse camera exposure to suppress
    /// fireflies.
    pub radiance_clamping: bool,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            max_bounces: 4,
            accumulate: true,
            radiance_clamping: true,
        }
    }
}

pub struct Renderer {
    scene: BakedScene,
    sky: Arc<dyn Sky>,
    camera: Camera,
    parameters: RenderParameters,
    accum: AccumBuffer,
    scheduler: TileScheduler,
    inv_size: Vec2,
    aspect: f32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = clamp_size(width, height);
        let mut renderer = Self {
            scene: BakedScene::default(),
            sky: Arc::new(UniformSky::new(Vec3::ONE)),
            camera: Camera::default(),
            parameters: RenderParameters::default(),
            accum: AccumBuffer::new(width, height),
            scheduler: TileScheduler::new(),
            inv_size: Vec2::ONE,
            aspect: 1.0,
        };
        renderer.resize(width, height);
        renderer
    }

    pub fn width(&self) -> u32 {
        self.accum.width()
    }

    pub fn height(&self) -> u32 {
        self.accum.height()
    }

    pub fn sample_count(&self) -> u32 {
        self.accum.sample_count()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn parameters(&self) -> &RenderParameters {
        &self.parameters
    }

    /// Resize the output image. Degenerate sizes are clamped to 1x1.
    pub fn resize(&mut self, width: u32, height: u32) {
        debug_assert!(width > 0 && height > 0, "bad resize: {width}x{height}");
        let (width, height) = clamp_size(width, height);
        self.inv_size = Vec2::new(1.0 / width as f32, 1.0 / height as f32);
        self.aspect = width as f32 * self.inv_size.y;
        self.accum.resize(width, height);
        log::debug!("resized to {width}x{height}");
    }

    /// Replace the flattened scene. Restarts accumulation.
    pub fn set_scene(&mut self, scene: BakedScene) {
        self.scene = scene;
        self.on_parameter_change();
    }

    pub fn set_sky(&mut self, sky: Arc<dyn Sky>) {
        self.sky = sky;
        self.on_parameter_change();
    }

    /// Move or reconfigure the camera. Restarts accumulation.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.on_parameter_change();
    }

    pub fn set_parameters(&mut self, parameters: RenderParameters) {
        if parameters == self.parameters {
            return;
        }
        self.accum.set_accumulate(parameters.accumulate);
        self.parameters = parameters;
        self.on_parameter_change();
    }

    /// Discard all accumulated samples. Called automatically by every setter
    /// that invalidates them; failing to reset would silently blend stale and
    /// fresh samples.
    pub fn on_parameter_change(&mut self) {
        self.accum.reset();
    }

    /// Trace one jittered sample through a pixel, fold it into the running
    /// sum, and return the pixel's current mean radiance.
    pub fn evaluate_pixel(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Vec3 {
        let radiance = self.sample_radiance(x, y, rng);
        self.accum.add_sample(x, y, radiance);
        self.accum.resolve(x, y)
    }

    /// Render one full frame across the worker pool, adding one sample per
    /// pixel (or overwriting, when accumulation is off). Blocks until done.
    pub fn render_frame(&mut self) {
        let sample_index = self.accum.begin_frame();
        let tiles = tiles_for(self.accum.width(), self.accum.height());

        let renderer = &*self;
        self.scheduler.render_frame(tiles, move |tile| {
            for (x, y) in tile.pixels() {
                let mut rng = HashRng::new(pixel_seed(x, y, sample_index));
                let radiance = renderer.sample_radiance(x, y, &mut rng);
                renderer.accum.add_sample(x, y, radiance);
            }
        });
    }

    /// Resolve the accumulated image through a display transform.
    pub fn resolve_rgba8(&self, transform: impl Fn(Vec3) -> Vec3) -> Vec<Rgba8> {
        self.accum.resolve_rgba8(transform)
    }

    /// Mean linear radiance of one pixel.
    pub fn resolve(&self, x: u32, y: u32) -> Vec3 {
        self.accum.resolve(x, y)
    }

    fn path_settings(&self) -> PathSettings {
        let radiance_clamp = if self.parameters.radiance_clamping {
            1.0 / self.camera.exposure_factor().max(1e-4)
        } else {
            f32::INFINITY
        };
        PathSettings {
            max_bounces: self.parameters.max_bounces,
            radiance_clamp,
            russian_roulette: true,
        }
    }

    fn sample_radiance(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Vec3 {
        let jitter_x = ember_core::sampling::gen_f32(rng) - 0.5;
        let jitter_y = ember_core::sampling::gen_f32(rng) - 0.5;
        let px = x as f32 + 0.5 + jitter_x;
        let py = y as f32 + 0.5 + jitter_y;

        let mut ndc = Vec2::new(
            px * self.inv_size.x * 2.0 - 1.0,
            py * self.inv_size.y * 2.0 - 1.0,
        );
        ndc.x *= self.aspect;
        ndc.y = -ndc.y;

        let integrator = Integrator {
            scene: &self.scene,
            sky: self.sky.as_ref(),
            settings: self.path_settings(),
        };
        integrator.trace_path(self.camera.ray(ndc), rng)
    }
}

fn clamp_size(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}
