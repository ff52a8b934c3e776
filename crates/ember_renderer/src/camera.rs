//! Pinhole camera with a physical sensor exposure model.

use ember_math::{Ray, Vec2, Vec3};

/// Pinhole camera. Rays are generated from normalized device coordinates,
/// with the horizontal axis pre-scaled by aspect ratio by the caller.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    focal_length: f32,
    log_exposure: f32,
    aperture: f32,
    shutter_speed: f32,
    iso: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
            focal_length: 1.0,
            log_exposure: 0.0,
            aperture: 16.0,
            shutter_speed: 1.0 / 125.0,
            iso: 100.0,
        }
    }
}

impl Camera {
    /// Orients the camera along `direction` (must be normalized) with the
    /// given vertical field of view.
    pub fn look_dir(&mut self, direction: Vec3, fov_degrees: f32, up: Vec3) {
        debug_assert!(
            (direction.length() - 1.0).abs() < 1e-4,
            "look direction must be normalized"
        );
        self.focal_length = 1.0 / (fov_degrees.to_radians() * 0.5).tan();
        self.forward = direction;
        self.right = up.cross(self.forward).normalize();
        self.up = self.forward.cross(self.right).normalize();
    }

    pub fn look_at(&mut self, origin: Vec3, target: Vec3, fov_degrees: f32, up: Vec3) {
        debug_assert!(origin.distance(target) > f32::EPSILON);
        self.position = origin;
        self.look_dir((target - origin).normalize(), fov_degrees, up);
    }

    /// Primary ray through a point in normalized device coordinates
    /// (x in [-aspect, aspect], y in [-1, 1], +y up).
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let direction =
            (self.right * ndc.x + self.up * ndc.y + self.forward * self.focal_length).normalize();
        Ray::new(self.position, direction, 1e-6, f32::INFINITY)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_sensor(&mut self, aperture: f32, inv_shutter_speed: f32, iso: f32) {
        self.aperture = aperture;
        self.shutter_speed = 1.0 / inv_shutter_speed;
        self.iso = iso;
    }

    pub fn log_exposure(&self) -> f32 {
        self.log_exposure
    }

    pub fn set_log_exposure(&mut self, log_exposure: f32) {
        self.log_exposure = log_exposure;
    }

    /// Scale factor mapping scene radiance to display-relative luminance,
    /// from the sensor's EV100 plus an artistic log-exposure offset.
    pub fn exposure_factor(&self) -> f32 {
        let mut ev100 = ((self.aperture * self.aperture) / self.shutter_speed).log2();
        ev100 -= (self.iso / 100.0).log2();
        let max_luminance = 1.2 * ev100.exp2();
        self.log_exposure.exp() / max_luminance
    }
}
