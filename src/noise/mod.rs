//! Layered Perlin-style noise used as modulation source.
//!
//! A [`noise_table::NoiseTable`] holds one period of seeded random values.
//! [`perlin::Perlin`] reads that table at a given rate and sums several
//! octaves of it. [`perlin_engine::PerlinEngine`] owns two voices and
//! crossfades between them whenever the read position or rate has to change
//! discontinuously.

pub mod noise_table;
pub mod perlin;
pub mod perlin_engine;
pub mod seed;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::{interpolate_hermite, interpolate_linear, interpolate_nearest};

/// Number of octaves that can be layered on top of the base octave.
pub const NUM_OCTAVES: usize = 7;

/// Number of random values per table period.
pub const NOISE_SIZE: usize = 1 << NUM_OCTAVES;

/// Mask for wrapping table indices.
pub const NOISE_SIZE_MAX: usize = NOISE_SIZE - 1;

/// Wraparound padding appended to the table for the interpolation kernels.
pub const NOISE_OVERSHOOT: usize = 4;

/// Gain of each octave, halving per octave.
pub const OCTAVE_GAINS: [f32; NUM_OCTAVES + 2] = octave_gains();

const fn octave_gains() -> [f32; NUM_OCTAVES + 2] {
    let mut gains = [0.0; NUM_OCTAVES + 2];
    let mut o = 0;
    while o < gains.len() {
        gains[o] = 1.0 / (1u32 << o) as f32;
        o += 1;
    }
    gains
}

/// Interpolation kernel used to read the noise table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Nearest neighbour, stepped output.
    Steps,
    /// Linear ramps between table points.
    Lerp,
    /// Cubic Hermite spline.
    #[default]
    Spline,
}

impl Shape {
    /// Maps a rounded parameter value to a shape, clamping out-of-range values.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Steps,
            1 => Self::Lerp,
            _ => Self::Spline,
        }
    }

    #[inline]
    pub fn interpolate(self, table: &[f32], phase: f32) -> f32 {
        match self {
            Self::Steps => interpolate_nearest(table, phase),
            Self::Lerp => interpolate_linear(table, phase),
            Self::Spline => interpolate_hermite(table, phase),
        }
    }
}

/// Scales a table phase to octave `o` and wraps it back into `[0, NOISE_SIZE)`.
#[inline]
pub fn phase_octaved(phase: f32, o: usize) -> f32 {
    let octave_phase = phase * (1u32 << o) as f32;
    let octave_phase_floor = octave_phase.floor();
    let octave_phase_int = (octave_phase_floor as i64) & NOISE_SIZE_MAX as i64;

    octave_phase - octave_phase_floor + octave_phase_int as f32
}
