//! Renders a small demo scene progressively and writes a PNG.
//!
//! Run with `cargo run --release --example render_demo`.

use std::sync::Arc;

use anyhow::{Context, Result};
use ember_core::meshgen::{unit_quad, uv_sphere};
use ember_core::{
    BakedScene, CutoutMaterial, DiffuseMaterial, GradientSky, MeshInstance, PointLight, Scene,
    TransparentMaterial,
};
use ember_math::{Mat4, Quat, Vec3};
use ember_renderer::{Bvh, Camera, RenderParameters, Renderer};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;
const FRAMES: u32 = 64;

fn sphere(center: Vec3, radius: f32) -> Arc<Bvh> {
    let mesh = uv_sphere(radius, 48, 24);
    let instance = MeshInstance::new(&mesh, Mat4::from_translation(center));
    Arc::new(Bvh::build(Arc::new(instance)))
}

fn build_scene() -> BakedScene {
    let mut scene = Scene::new();

    scene.new_drawable_actor(
        sphere(Vec3::new(-1.2, 0.0, 5.0), 1.0),
        Arc::new(DiffuseMaterial::new(Vec3::new(0.8, 0.3, 0.25))),
    );
    scene.new_drawable_actor(
        sphere(Vec3::new(1.2, 0.0, 5.0), 1.0),
        Arc::new(TransparentMaterial::new(Vec3::new(0.6, 0.8, 0.9), 0.1)),
    );

    // Cutout floor
    let floor = unit_quad();
    let floor_instance = MeshInstance::new(
        &floor,
        Mat4::from_scale_rotation_translation(
            Vec3::splat(20.0),
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, -1.0, 5.0),
        ),
    );
    scene.new_drawable_actor(
        Arc::new(Bvh::build(Arc::new(floor_instance))),
        Arc::new(CutoutMaterial::new(Vec3::splat(0.7), 20.0)),
    );

    scene.new_light_actor(Arc::new(PointLight::new(
        Vec3::new(4.0, 6.0, 2.0),
        Vec3::splat(250.0),
    )));
    scene.new_light_actor(Arc::new(PointLight::new(
        Vec3::new(-4.0, 3.0, 7.0),
        Vec3::new(40.0, 60.0, 120.0),
    )));

    BakedScene::bake(&scene)
}

fn main() -> Result<()> {
    env_logger::init();

    let mut renderer = Renderer::new(WIDTH, HEIGHT);
    renderer.set_scene(build_scene());
    renderer.set_sky(Arc::new(GradientSky::new(
        Vec3::new(0.9, 0.85, 0.8),
        Vec3::new(0.25, 0.45, 0.85),
    )));

    let mut camera = Camera::default();
    camera.look_at(
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 5.0),
        60.0,
        Vec3::Y,
    );
    camera.set_log_exposure(10.0);
    renderer.set_camera(camera);

    renderer.set_parameters(RenderParameters {
        max_bounces: 4,
        accumulate: true,
        radiance_clamping: true,
    });

    for frame in 0..FRAMES {
        renderer.render_frame();
        if (frame + 1) % 8 == 0 {
            log::info!("rendered {} / {FRAMES} samples per pixel", frame + 1);
        }
    }

    let exposure = renderer.camera().exposure_factor();
    let pixels = renderer.resolve_rgba8(|radiance| {
        let hdr = radiance * exposure;
        // Filmic-ish rolloff plus gamma
        let mapped = Vec3::ONE - (-hdr).exp();
        mapped.powf(1.0 / 2.2)
    });

    let bytes: &[u8] = bytemuck::cast_slice(&pixels);
    image::save_buffer(
        "render_demo.png",
        bytes,
        WIDTH,
        HEIGHT,
        image::ColorType::Rgba8,
    )
    .context("failed to write render_demo.png")?;

    log::info!("wrote render_demo.png ({WIDTH}x{HEIGHT}, {FRAMES} spp)");
    Ok(())
}
