//! Single Perlin noise voice.
//!
//! Reads the noise table at the phasor rate, layering octaves by doubling
//! the read phase per octave. The right channel is the same stream read at a
//! phase offset given by the width parameter.

use alloc::vec;
use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::float::Float;

use super::{phase_octaved, Shape, NOISE_SIZE_MAX, NUM_OCTAVES, OCTAVE_GAINS};
use crate::transport::TransportPosition;
use crate::utils::phasor::Phasor;

/// Block-rate values of the voice parameters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VoiceParameters {
    /// Number of octaves in the range from `1.0` to `8.0` (exclusive).
    pub octaves: f32,
    /// Phase offset of the right channel in table steps.
    pub width: f32,
    /// Phase offset of both channels in table steps.
    pub phase: f32,
    pub shape: Shape,
}

/// Smoothed per-sample values of the voice parameters for one block.
///
/// When a `*_smoothing` flag is `false` the matching slice is constant and
/// the scalar from [`VoiceParameters`] is used instead.
#[derive(Debug, Clone, Copy)]
pub struct ParameterRamps<'a> {
    pub octaves: &'a [f32],
    pub octaves_smoothing: bool,
    pub width: &'a [f32],
    pub width_smoothing: bool,
    pub phase: &'a [f32],
    pub phase_smoothing: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Perlin {
    phasor: Phasor,
    phase_buffer: Vec<f32>,
    noise_index: usize,
    parameters: VoiceParameters,
}

impl Perlin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self) {
        self.phasor.init();
        self.noise_index = 0;
    }

    pub fn prepare(&mut self, block_size: usize) {
        self.phase_buffer = vec![0.0; block_size];
    }

    #[inline]
    pub fn set_parameters(&mut self, parameters: &VoiceParameters) {
        self.parameters = *parameters;
    }

    /// Sets the phasor increment in table steps per sample.
    #[inline]
    pub fn set_speed(&mut self, increment: f64) {
        self.phasor.set_increment(increment);
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.phasor.increment()
    }

    #[inline]
    pub fn noise_index(&self) -> usize {
        self.noise_index
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phasor.phase()
    }

    /// Locks the read position to the host time at `rate_hz` table steps per second.
    pub fn update_position(
        &mut self,
        transport: &TransportPosition,
        rate_hz: f64,
        sample_rate_inv: f64,
    ) {
        let time_in_secs = transport.time_in_samples as f64 * sample_rate_inv;
        self.set_position(time_in_secs * rate_hz);
    }

    /// Locks the read position to the host beat position.
    pub fn update_position_sync(&mut self, transport: &TransportPosition, rate_beats_inv: f64) {
        self.set_position(transport.ppq_position * rate_beats_inv + 0.5);
    }

    fn set_position(&mut self, position: f64) {
        let position_floor = position.floor();
        self.noise_index = ((position_floor as i64) & NOISE_SIZE_MAX as i64) as usize;
        self.phasor.set_phase(position - position_floor);
    }

    /// Renders one block into `samples` (one or two channels of equal length).
    pub fn render(&mut self, noise: &[f32], ramps: &ParameterRamps, samples: &mut [&mut [f32]]) {
        let num_samples = match samples.first() {
            Some(channel) => channel.len(),
            None => return,
        };
        debug_assert!(num_samples <= self.phase_buffer.len());

        self.synthesize_phase(ramps, num_samples);

        match samples {
            [left] => self.process_octaves(left, noise, ramps),
            [left, right, ..] => {
                self.process_octaves(left, noise, ramps);
                self.process_width(left, right, noise, ramps);
            }
            [] => {}
        }
    }

    fn synthesize_phase(&mut self, ramps: &ParameterRamps, num_samples: usize) {
        let phase_buffer = &mut self.phase_buffer[..num_samples];

        if ramps.phase_smoothing {
            for (phase, offset) in phase_buffer.iter_mut().zip(ramps.phase.iter()) {
                let info = self.phasor.next();
                if info.retrig {
                    self.noise_index = (self.noise_index + 1) & NOISE_SIZE_MAX;
                }
                *phase = info.phase as f32 + offset + self.noise_index as f32;
            }
        } else {
            let offset = self.parameters.phase;
            for phase in phase_buffer.iter_mut() {
                let info = self.phasor.next();
                if info.retrig {
                    self.noise_index = (self.noise_index + 1) & NOISE_SIZE_MAX;
                }
                *phase = info.phase as f32 + offset + self.noise_index as f32;
            }
        }
    }

    fn process_octaves(&self, out: &mut [f32], noise: &[f32], ramps: &ParameterRamps) {
        let shape = self.parameters.shape;
        let phase_buffer = &self.phase_buffer[..out.len()];

        if ramps.octaves_smoothing {
            for ((sample, phase), octaves) in out
                .iter_mut()
                .zip(phase_buffer.iter())
                .zip(ramps.octaves.iter())
            {
                *sample = octave_sample(noise, *phase, *octaves, shape);
            }
            return;
        }

        let octaves = self.parameters.octaves;
        let octaves_floor = octaves.floor();
        let octaves_int = (octaves_floor as usize).min(NUM_OCTAVES);
        let octaves_frac = octaves - octaves_floor;

        for (sample, phase) in out.iter_mut().zip(phase_buffer.iter()) {
            let mut sum = 0.0f32;
            for (o, gain) in OCTAVE_GAINS[..octaves_int].iter().enumerate() {
                sum += shape.interpolate(noise, phase_octaved(*phase, o)) * gain;
            }
            *sample = sum;
        }

        let mut gain: f32 = OCTAVE_GAINS[..octaves_int].iter().sum();

        if octaves_frac != 0.0 {
            let octave_gain = octaves_frac * OCTAVE_GAINS[octaves_int];

            for (sample, phase) in out.iter_mut().zip(phase_buffer.iter()) {
                let phase = phase_octaved(*phase, octaves_int);
                *sample += shape.interpolate(noise, phase) * octave_gain;
            }

            gain += octave_gain;
        }

        if gain > 0.0 {
            let normalize = 1.0 / gain.sqrt();
            for sample in out.iter_mut() {
                *sample *= normalize;
            }
        } else {
            out.fill(0.0);
        }
    }

    fn process_width(
        &mut self,
        left: &[f32],
        right: &mut [f32],
        noise: &[f32],
        ramps: &ParameterRamps,
    ) {
        let phase_buffer = &mut self.phase_buffer[..right.len()];

        if ramps.width_smoothing {
            for (phase, width) in phase_buffer.iter_mut().zip(ramps.width.iter()) {
                *phase += width;
            }
        } else {
            let width = self.parameters.width;
            if width == 0.0 {
                right.copy_from_slice(left);
                return;
            }
            for phase in phase_buffer.iter_mut() {
                *phase += width;
            }
        }

        self.process_octaves(right, noise, ramps);
    }
}

/// Octave sum for a single sample with its own octave count.
#[inline]
fn octave_sample(noise: &[f32], phase: f32, octaves: f32, shape: Shape) -> f32 {
    let octaves_floor = octaves.floor();
    let octaves_int = (octaves_floor as usize).min(NUM_OCTAVES);
    let octaves_frac = octaves - octaves_floor;

    let mut sum = 0.0f32;
    let mut gain = 0.0f32;

    for (o, octave_gain) in OCTAVE_GAINS[..octaves_int].iter().enumerate() {
        sum += shape.interpolate(noise, phase_octaved(phase, o)) * octave_gain;
        gain += octave_gain;
    }

    if octaves_frac != 0.0 {
        let octave_gain = octaves_frac * OCTAVE_GAINS[octaves_int];
        sum += shape.interpolate(noise, phase_octaved(phase, octaves_int)) * octave_gain;
        gain += octave_gain;
    }

    if gain > 0.0 {
        sum / gain.sqrt()
    } else {
        0.0
    }
}
