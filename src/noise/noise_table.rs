//! Seeded table of random values with wraparound padding.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{NOISE_OVERSHOOT, NOISE_SIZE};

/// Table values stay inside this range so the spline kernel has headroom to overshoot.
pub const NOISE_RANGE: f32 = 0.8;

/// Seed used when nothing else has been requested.
pub const DEFAULT_SEED: i32 = 69420;

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTable {
    values: [f32; NOISE_SIZE + NOISE_OVERSHOOT],
    seed: i32,
}

impl Default for NoiseTable {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl NoiseTable {
    pub fn new(seed: i32) -> Self {
        let mut table = Self {
            values: [0.0; NOISE_SIZE + NOISE_OVERSHOOT],
            seed,
        };
        table.reseed(seed);

        table
    }

    /// Refills the table in place from `seed`.
    ///
    /// Every index gets its own generator seeded with `seed + index`, so a
    /// value only depends on the seed and its position.
    pub fn reseed(&mut self, seed: i32) {
        self.seed = seed;

        let mut index_seed = seed as u32;

        for value in self.values[..NOISE_SIZE].iter_mut() {
            let mut rng = Pcg32::seed_from_u64(index_seed as u64);
            *value = rng.random_range(-NOISE_RANGE..NOISE_RANGE);
            index_seed = index_seed.wrapping_add(1);
        }

        for i in 0..NOISE_OVERSHOOT {
            self.values[NOISE_SIZE + i] = self.values[i];
        }
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// All values including the wraparound padding.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
