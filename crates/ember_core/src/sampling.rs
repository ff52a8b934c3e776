//! Shared sampling helpers for lobes and lights.

use ember_math::Vec3;
use rand::RngCore;

/// Uniform f32 in [0, 1) from any RngCore.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    // 24 high bits give every representable step in [0, 1)
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

/// Build an orthonormal basis around a unit vector.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let a = if n.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
    let t = n.cross(a).normalize();
    let b = n.cross(t);
    (t, b)
}

/// Cosine-weighted direction on the hemisphere around `normal`.
pub fn cosine_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);

    let phi = std::f32::consts::TAU * r1;
    let r = r2.sqrt();
    let x = phi.cos() * r;
    let y = phi.sin() * r;
    let z = (1.0 - r2).max(0.0).sqrt();

    let (t, b) = orthonormal_basis(normal);
    (t * x + b * y + normal * z).normalize()
}

/// Uniform direction inside the cone around `axis` with half-angle
/// `cos_angle_max` (cosine of the cone half-angle).
pub fn uniform_cone(axis: Vec3, cos_angle_max: f32, rng: &mut dyn RngCore) -> Vec3 {
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);

    let cos_theta = 1.0 - r1 * (1.0 - cos_angle_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = std::f32::consts::TAU * r2;

    let (t, b) = orthonormal_basis(axis);
    (t * (phi.cos() * sin_theta) + b * (phi.sin() * sin_theta) + axis * cos_theta).normalize()
}
