//! Deterministic per-pixel random number generation.
//!
//! Rendering needs reproducible results for a fixed seed scheme, so pixels
//! are seeded from their coordinates and the frame's sample index rather
//! than from entropy. The generator is a small multiply-xorshift hash chain;
//! quality is plenty for stratification-free Monte Carlo and the state is a
//! single u32 copied around freely.

use rand::{RngCore, SeedableRng};

/// Counter-free hash-advance generator.
#[derive(Debug, Clone, Copy)]
pub struct HashRng {
    state: u32,
}

impl HashRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn advance(&mut self) {
        let mut s = self.state.wrapping_add(1);
        s ^= s >> 17;
        s = s.wrapping_mul(0xed5a_d4bb);
        s ^= s >> 11;
        s = s.wrapping_mul(0xac4c_1b51);
        s ^= s >> 15;
        s = s.wrapping_mul(0x3184_8bab);
        s ^= s >> 14;
        self.state = s;
    }
}

impl RngCore for HashRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.advance();
        self.state
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for HashRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Seed for one pixel sample: mixes coordinates and the frame's sample index
/// so consecutive frames decorrelate while a fixed (x, y, sample) triple
/// always yields the same sequence.
#[inline]
pub fn pixel_seed(x: u32, y: u32, sample: u32) -> u32 {
    let mut h = x.wrapping_mul(0x9e37_79b9)
        ^ y.wrapping_mul(0x85eb_ca6b)
        ^ sample.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h
}
