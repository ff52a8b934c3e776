//! Progressive accumulation buffer.
//!
//! Running radiance sums are stored in double precision so long progressive
//! runs don't lose small contributions to float cancellation. Workers write
//! through [`std::cell::UnsafeCell`]; the tile scheduler guarantees each
//! pixel belongs to exactly one tile and each tile to exactly one worker per
//! frame, which is what makes the `Sync` impl sound.

use std::cell::UnsafeCell;

use bytemuck::{Pod, Zeroable};
use ember_math::{DVec3, Vec3};

/// Packed 8-bit output pixel, suitable for direct upload or image encoding.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub struct AccumBuffer {
    width: u32,
    height: u32,
    pixels: Vec<UnsafeCell<DVec3>>,
    sample_count: u32,
    accumulate: bool,
}

// SAFETY: concurrent access is only ever per-pixel, and the tile scheduler
// hands each pixel to exactly one worker per frame. No two threads touch the
// same cell between frame dispatch and frame completion.
unsafe impl Sync for AccumBuffer {}

impl AccumBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            sample_count: 0,
            accumulate: true,
        };
        buffer.resize(width, height);
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples accumulated so far, including the frame in flight.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn accumulate(&self) -> bool {
        self.accumulate
    }

    /// Toggles progressive accumulation. Turning it on or off restarts the
    /// sum, otherwise stale samples from the other mode would blend in.
    pub fn set_accumulate(&mut self, accumulate: bool) {
        if self.accumulate != accumulate {
            self.accumulate = accumulate;
            self.reset();
        }
    }

    /// Reallocates for a new resolution and clears the history.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = (0..(width as usize * height as usize))
            .map(|_| UnsafeCell::new(DVec3::ZERO))
            .collect();
        self.sample_count = 0;
    }

    /// Zeroes every pixel and the sample count.
    pub fn reset(&mut self) {
        for pixel in &mut self.pixels {
            *pixel.get_mut() = DVec3::ZERO;
        }
        self.sample_count = 0;
    }

    /// Advances the frame state: bumps the sample count when accumulating,
    /// restarts the sum when not. Returns the sample count the frame's
    /// contributions will be divided by.
    pub fn begin_frame(&mut self) -> u32 {
        if self.accumulate {
            self.sample_count += 1;
        } else {
            self.reset();
            self.sample_count = 1;
        }
        self.sample_count
    }

    /// Adds one radiance sample to a pixel's running sum.
    ///
    /// Callers must hold exclusive logical ownership of `(x, y)` for the
    /// current frame; the tile scheduler provides that.
    #[allow(clippy::mut_from_ref)]
    pub fn add_sample(&self, x: u32, y: u32, radiance: Vec3) {
        debug_assert!(x < self.width && y < self.height);
        let index = (y * self.width + x) as usize;
        // SAFETY: exclusive per-pixel ownership per the Sync contract above.
        let sum = unsafe { &mut *self.pixels[index].get() };
        *sum += radiance.as_dvec3();
    }

    /// Mean radiance of a pixel over all accumulated samples.
    pub fn resolve(&self, x: u32, y: u32) -> Vec3 {
        let index = (y * self.width + x) as usize;
        // SAFETY: called between frames, when no worker holds the buffer.
        let sum = unsafe { *self.pixels[index].get() };
        let n = self.sample_count.max(1) as f64;
        (sum / n).as_vec3()
    }

    /// Resolves the whole image through a color transform into packed 8-bit.
    pub fn resolve_rgba8(&self, transform: impl Fn(Vec3) -> Vec3) -> Vec<Rgba8> {
        let mut out = Vec::with_capacity(self.pixels.len());
        for y in 0..self.height {
            for x in 0..self.width {
                let c = transform(self.resolve(x, y)).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
                out.push(Rgba8 {
                    r: c.x as u8,
                    g: c.y as u8,
                    b: c.z as u8,
                    a: 255,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progressive_average() {
        let mut buffer = AccumBuffer::new(2, 2);
        buffer.begin_frame();
        buffer.add_sample(0, 0, Vec3::splat(1.0));
        buffer.begin_frame();
        buffer.add_sample(0, 0, Vec3::splat(3.0));
        assert_eq!(buffer.sample_count(), 2);
        assert!((buffer.resolve(0, 0) - Vec3::splat(2.0)).length() < 1e-6);
    }

    #[test]
    fn test_overwrite_mode_discards_history() {
        let mut buffer = AccumBuffer::new(1, 1);
        buffer.set_accumulate(false);
        buffer.begin_frame();
        buffer.add_sample(0, 0, Vec3::splat(1.0));
        buffer.begin_frame();
        buffer.add_sample(0, 0, Vec3::splat(5.0));
        assert!((buffer.resolve(0, 0) - Vec3::splat(5.0)).length() < 1e-6);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut buffer = AccumBuffer::new(2, 1);
        buffer.begin_frame();
        buffer.add_sample(1, 0, Vec3::ONE);
        buffer.reset();
        assert_eq!(buffer.sample_count(), 0);
        assert_eq!(buffer.resolve(1, 0), Vec3::ZERO);
    }

    #[test]
    fn test_resize_clears() {
        let mut buffer = AccumBuffer::new(4, 4);
        buffer.begin_frame();
        buffer.add_sample(0, 0, Vec3::ONE);
        buffer.resize(8, 8);
        assert_eq!(buffer.sample_count(), 0);
        assert_eq!(buffer.resolve(0, 0), Vec3::ZERO);
    }

    #[test]
    fn test_rgba8_pod_roundtrip() {
        let pixels = [Rgba8 { r: 1, g: 2, b: 3, a: 255 }; 2];
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[7], 255);
    }
}
