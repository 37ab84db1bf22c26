//! Exponential smoothing of parameters in rendering loops.
//!
//! A [`SmoothedParameter`] turns the block-rate target of a parameter into a
//! sample-accurate ramp. When the parameter already sits at its target the
//! ramp is skipped and [`SmoothedParameter::is_smoothing`] reports `false`, so
//! callers can apply the scalar [`SmoothedParameter::value`] instead of
//! reading the buffer sample by sample.

use alloc::vec;
use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::float::Float;

/// Residual gap below which the ramp snaps onto its target.
const SNAP_THRESHOLD: f32 = 1e-6;

/// Attenuation of the remaining gap after the configured decay time (-60 dB).
const DECAY_ATTENUATION: f32 = 0.001;

#[derive(Debug, Clone)]
pub struct SmoothedParameter {
    value: f32,
    coefficient: f32,
    buffer: Vec<f32>,
    smoothing: bool,
}

impl Default for SmoothedParameter {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SmoothedParameter {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            coefficient: 1.0,
            buffer: Vec::new(),
            smoothing: false,
        }
    }

    /// Sizes the ramp buffer and derives the per-sample coefficient so that
    /// the gap to a new target shrinks by 60 dB within `decay_ms`.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize, decay_ms: f32) {
        self.buffer = vec![self.value; block_size];
        self.coefficient = coefficient_from_decay(decay_ms, sample_rate);
    }

    /// Jumps to `value` without ramping.
    pub fn reset(&mut self, value: f32) {
        self.value = value;
        self.smoothing = false;
        self.buffer.fill(value);
    }

    /// Advances the ramp by `num_samples` towards `target` and returns the
    /// block of smoothed values.
    #[inline]
    pub fn process(&mut self, target: f32, num_samples: usize) -> &[f32] {
        debug_assert!(num_samples <= self.buffer.len());

        let buffer = &mut self.buffer[..num_samples];

        if self.value == target {
            self.smoothing = false;
            buffer.fill(target);
            return buffer;
        }

        let mut value = self.value;

        for sample in buffer.iter_mut() {
            value += (target - value) * self.coefficient;
            if (target - value).abs() < SNAP_THRESHOLD {
                value = target;
            }
            *sample = value;
        }

        self.value = value;
        self.smoothing = true;

        buffer
    }

    /// Whether the last block was a ramp rather than a constant.
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.smoothing
    }

    /// Value reached at the end of the last block.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Ramp produced by the last call to [`SmoothedParameter::process`].
    #[inline]
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }
}

fn coefficient_from_decay(decay_ms: f32, sample_rate: f32) -> f32 {
    let decay_samples = decay_ms * 0.001 * sample_rate;
    if decay_samples <= 1.0 {
        return 1.0;
    }

    1.0 - DECAY_ATTENUATION.powf(1.0 / decay_samples)
}
