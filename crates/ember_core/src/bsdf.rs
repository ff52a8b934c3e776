//! BSDF lobe composer.
//!
//! A material populates a caller-owned `Bsdf` with one or more lobes at each
//! shading point. The composer owns a reusable byte arena so the steady state
//! is zero allocations: `reset` drops the lobes but keeps the buffer, and the
//! arena only grows when a material needs more room than any before it.
//!
//! Lobes are addressed by byte offset plus a per-entry vtable-reconstruction
//! function, never by stored pointer, so a buffer reallocation can never
//! leave a lobe reference dangling.

use ember_math::Vec3;
use rand::RngCore;

use crate::sampling::gen_f32;

/// Classification flags for a lobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LobeKind(u8);

impl LobeKind {
    pub const NONE: LobeKind = LobeKind(0);
    pub const DIFFUSE: LobeKind = LobeKind(1);
    pub const SPECULAR: LobeKind = LobeKind(1 << 1);
    pub const TRANSMISSION: LobeKind = LobeKind(1 << 2);

    /// True if any flag is shared with `other`.
    #[inline]
    pub fn intersects(self, other: LobeKind) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for LobeKind {
    type Output = LobeKind;
    fn bitor(self, rhs: LobeKind) -> LobeKind {
        LobeKind(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for LobeKind {
    fn bitor_assign(&mut self, rhs: LobeKind) {
        self.0 |= rhs.0;
    }
}

/// One additive term of a composite BSDF.
///
/// Directions follow the usual convention: `wo` points toward the viewer,
/// `wi` toward the light, `wm` is the half/micro-normal vector. All
/// directions are unit length and world-space.
pub trait Lobe: Send + Sync {
    /// Reflectance weighted by the cosine term. Component-wise non-negative
    /// for physically valid inputs.
    fn evaluate_cos(&self, wo: Vec3, wm: Vec3, wi: Vec3) -> Vec3;

    /// Probability density of having sampled `wi` from `wo`.
    fn pdf(&self, wo: Vec3, wm: Vec3, wi: Vec3) -> f32;

    /// Importance-sample an incoming direction.
    fn sample(&self, wo: Vec3, rng: &mut dyn RngCore) -> Vec3;

    fn kind(&self) -> LobeKind;
}

/// Result of [`Bsdf::sample_evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct BsdfSample {
    /// Proposed incoming direction
    pub wi: Vec3,
    /// Cosine-weighted reflectance of the chosen lobe
    pub value: Vec3,
    /// Density of the sample under uniform lobe selection
    pub pdf: f32,
    /// Kind of the chosen lobe
    pub kind: LobeKind,
}

/// Maximum supported lobe alignment; the arena base is aligned to this.
const ARENA_ALIGN: usize = 16;

/// Arena storage chunk. Keeps the byte buffer 16-byte aligned.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct Chunk([u8; ARENA_ALIGN]);

/// Bookkeeping for one stored lobe. Offsets are relative to the arena base,
/// so entries survive a reallocation untouched.
struct LobeSlot {
    offset: usize,
    /// Rebuilds the fat trait-object pointer from base + offset.
    cast: fn(*mut u8) -> *mut dyn Lobe,
}

fn cast_lobe<T: Lobe + 'static>(p: *mut u8) -> *mut dyn Lobe {
    p as *mut T as *mut dyn Lobe
}

/// Per-shading-point container of heterogeneous BSDF lobes.
pub struct Bsdf {
    storage: Vec<Chunk>,
    /// Bytes used in `storage`
    cursor: usize,
    slots: Vec<LobeSlot>,
    kind: LobeKind,
}

impl Bsdf {
    /// Create a composer with enough capacity for typical materials.
    pub fn new() -> Self {
        Self {
            storage: vec![Chunk([0; ARENA_ALIGN]); 512 / ARENA_ALIGN],
            cursor: 0,
            slots: Vec::with_capacity(8),
            kind: LobeKind::NONE,
        }
    }

    #[inline]
    fn capacity_bytes(&self) -> usize {
        self.storage.len() * ARENA_ALIGN
    }

    /// Read-only arena base; writes and drops must go through [`Self::base_mut`]
    /// so the pointer carries write provenance.
    #[inline]
    fn base(&self) -> *mut u8 {
        self.storage.as_ptr() as *mut u8
    }

    #[inline]
    fn base_mut(&mut self) -> *mut u8 {
        self.storage.as_mut_ptr() as *mut u8
    }

    /// Drop all held lobes (reverse construction order) and reset the write
    /// cursor. The underlying buffer is retained for reuse.
    pub fn reset(&mut self) {
        let base = self.base_mut();
        for slot in self.slots.iter().rev() {
            // SAFETY: offset/cast were recorded when the lobe was placed and
            // the bytes have not been touched since; each lobe is dropped
            // exactly once because `slots` is cleared below.
            unsafe {
                std::ptr::drop_in_place((slot.cast)(base.add(slot.offset)));
            }
        }
        self.slots.clear();
        self.cursor = 0;
        self.kind = LobeKind::NONE;
    }

    /// Construct a lobe in place at the end of the arena.
    pub fn add<T: Lobe + 'static>(&mut self, lobe: T) {
        const {
            assert!(std::mem::align_of::<T>() <= ARENA_ALIGN);
        }

        let align = std::mem::align_of::<T>().max(1);
        let offset = (self.cursor + align - 1) & !(align - 1);
        let end = offset + std::mem::size_of::<T>();

        if end > self.capacity_bytes() {
            // Grow to double plus slack. Vec relocates the existing lobe
            // bytes; that is a plain move in Rust, and every entry is
            // re-addressed from the new base via its offset.
            let chunks = (end * 2).div_ceil(ARENA_ALIGN);
            self.storage.resize(chunks, Chunk([0; ARENA_ALIGN]));
        }

        self.kind |= lobe.kind();
        // SAFETY: the range [offset, end) is in bounds, properly aligned for
        // T, and disjoint from every previously placed lobe.
        unsafe {
            std::ptr::write(self.base_mut().add(offset) as *mut T, lobe);
        }
        self.slots.push(LobeSlot {
            offset,
            cast: cast_lobe::<T>,
        });
        self.cursor = end;
    }

    /// True if any lobe has been added since the last reset.
    #[inline]
    pub fn has_lobes(&self) -> bool {
        !self.slots.is_empty()
    }

    #[inline]
    pub fn lobe_count(&self) -> usize {
        self.slots.len()
    }

    /// Union of all held lobes' kind flags.
    #[inline]
    pub fn kind(&self) -> LobeKind {
        self.kind
    }

    #[inline]
    fn lobe(&self, index: usize) -> &dyn Lobe {
        let slot = &self.slots[index];
        // SAFETY: the slot addresses a live lobe inside the arena.
        unsafe { &*(slot.cast)(self.base().add(slot.offset)) }
    }

    /// Sum of all lobes' cosine-weighted reflectance.
    pub fn evaluate(&self, wo: Vec3, wm: Vec3, wi: Vec3) -> Vec3 {
        let mut result = Vec3::ZERO;
        for i in 0..self.slots.len() {
            result += self.lobe(i).evaluate_cos(wo, wm, wi);
        }
        result
    }

    /// Select one lobe uniformly at random, sample a direction from it, and
    /// return the sample with `pdf = lobe_pdf / lobe_count`.
    ///
    /// Selection is deliberately uniform rather than importance-weighted;
    /// the pdf normalization must stay consistent with that choice or the
    /// estimator becomes biased.
    pub fn sample_evaluate(&self, wo: Vec3, rng: &mut dyn RngCore) -> Option<BsdfSample> {
        if self.slots.is_empty() {
            return None;
        }

        let n = self.slots.len();
        let r = gen_f32(rng);
        let index = ((r * n as f32) as usize).min(n - 1);
        let lobe = self.lobe(index);

        let wi = lobe.sample(wo, rng);
        let v_dot_l = wi.dot(wo).abs();
        let wm = if v_dot_l > 1.0 - f32::EPSILON {
            wo
        } else {
            (wi + wo).normalize()
        };

        Some(BsdfSample {
            wi,
            value: lobe.evaluate_cos(wo, wm, wi),
            pdf: lobe.pdf(wo, wm, wi) / n as f32,
            kind: lobe.kind(),
        })
    }
}

impl Default for Bsdf {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Bsdf {
    fn drop(&mut self) {
        self.reset();
    }
}
