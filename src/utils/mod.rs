//! Utility functions.
//!
//! Small building blocks shared by the noise engine and the mixing stage:
//! interpolation kernels, unit conversions and the phase/ramp generators.

pub mod phasor;
pub mod smoothed_parameter;

#[allow(unused_imports)]
use num_traits::float::Float;

use core::f32::consts::PI;

/// Reads `table` between `table[i + 1]` and `table[i + 2]` with nearest-neighbour rounding.
///
/// `index` must be in `[0, len - 2)`.
#[inline]
pub fn interpolate_nearest(table: &[f32], index: f32) -> f32 {
    table[index.round() as usize + 1]
}

/// Linear interpolation with a half-sample offset, so that the ramp crosses
/// the same table points as the spline kernel.
#[inline]
pub fn interpolate_linear(table: &[f32], index: f32) -> f32 {
    let index = index + 1.5;
    let index_integral = index as usize;
    let index_fractional = index - (index_integral as f32);
    let a = table[index_integral];
    let b = table[index_integral + 1];

    a + (b - a) * index_fractional
}

/// 4-point cubic Hermite spline between `table[i + 1]` and `table[i + 2]`.
#[inline]
pub fn interpolate_hermite(table: &[f32], index: f32) -> f32 {
    let index_integral = index as usize;
    let index_fractional = index - (index_integral as f32);
    let xm1 = table[index_integral];
    let x0 = table[index_integral + 1];
    let x1 = table[index_integral + 2];
    let x2 = table[index_integral + 3];
    let c = (x1 - xm1) * 0.5;
    let v = x0 - x1;
    let w = c + v;
    let a = w + v + (x2 - x0) * 0.5;
    let b_neg = w + a;
    let f = index_fractional;

    (((a * f) - b_neg) * f + c) * f + x0
}

/// Raised-cosine crossfade from `a` (fade = 0) to `b` (fade = 1).
#[inline]
pub fn crossfade_cosine(a: f32, b: f32, fade: f32) -> f32 {
    let x = fade * PI;
    let gain_a = x.cos() + 1.0;
    let gain_b = (x + PI).cos() + 1.0;

    (a * gain_a + b * gain_b) * 0.5
}

/// Number of whole samples in `ms` milliseconds.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> usize {
    (ms as f64 * 0.001 * sample_rate as f64).round() as usize
}

/// Converts decibels to linear gain.
#[inline]
pub fn decibels_to_gain(db: f32) -> f32 {
    10.0f32.powf(db * 0.05)
}

/// Converts decibels to linear gain, mapping everything at or below `floor_db` to silence.
#[inline]
pub fn decibels_to_gain_with_floor(db: f32, floor_db: f32) -> f32 {
    if db <= floor_db {
        0.0
    } else {
        decibels_to_gain(db)
    }
}
