//! Dry/wet mixer with input gain, output gain, polarity and delta monitoring.
//!
//! Per block the caller runs [`DryWetMixer::save_dry`] first, then processes
//! the wet signal in place and finishes with [`DryWetMixer::process_out_gain`]
//! and [`DryWetMixer::process_mix`]. When the effect is switched off,
//! [`DryWetMixer::process_bypass`] replaces the whole chain.

use alloc::vec;
use alloc::vec::Vec;

use super::latency_compensation::LatencyCompensation;
use crate::config::{MixLaw, MixerConfig, Parameters, MAX_CHANNELS};
use crate::utils::smoothed_parameter::SmoothedParameter;
use crate::utils::{decibels_to_gain, decibels_to_gain_with_floor};

/// Smoothing time of the gain and mix ramps.
pub const GAIN_SMOOTHING_MS: f32 = 20.0;

/// Dry gain at or below this level is muted ([`MixLaw::GainDry`]).
pub const DRY_GAIN_FLOOR_DB: f32 = -80.0;

#[derive(Debug, Clone)]
pub struct DryWetMixer {
    config: MixerConfig,
    latency_compensation: LatencyCompensation,
    dry: [Vec<f32>; MAX_CHANNELS],

    gain_in: SmoothedParameter,
    mix: SmoothedParameter,
    gain_out: SmoothedParameter,

    mix_value: f32,
    gain_out_value: f32,
}

impl Default for DryWetMixer {
    fn default() -> Self {
        Self::new(MixerConfig::default())
    }
}

impl DryWetMixer {
    pub fn new(config: MixerConfig) -> Self {
        Self {
            config,
            latency_compensation: LatencyCompensation::new(),
            dry: [Vec::new(), Vec::new()],
            gain_in: SmoothedParameter::new(0.0),
            mix: SmoothedParameter::new(1.0),
            gain_out: SmoothedParameter::new(1.0),
            mix_value: 1.0,
            gain_out_value: 1.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, block_size: usize, latency: usize) {
        self.latency_compensation.prepare(block_size, latency);
        self.dry = [vec![0.0; block_size], vec![0.0; block_size]];

        self.gain_in.prepare(sample_rate, block_size, GAIN_SMOOTHING_MS);
        self.mix.prepare(sample_rate, block_size, GAIN_SMOOTHING_MS);
        self.gain_out.prepare(sample_rate, block_size, GAIN_SMOOTHING_MS);
    }

    #[inline]
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    #[inline]
    pub fn latency(&self) -> usize {
        self.latency_compensation.latency()
    }

    /// Latency-aligned input of the current block.
    #[inline]
    pub fn dry(&self, channel: usize) -> &[f32] {
        &self.dry[channel]
    }

    /// Captures the dry signal, applies the input gain to `samples` and
    /// computes the mix and output gain ramps of this block.
    pub fn save_dry(&mut self, samples: &mut [&mut [f32]], parameters: &Parameters) {
        let num_samples = match samples.first() {
            Some(channel) => channel.len(),
            None => return,
        };
        debug_assert!(num_samples <= self.dry[0].len());

        self.latency_compensation.process(&mut self.dry[..], &*samples);

        let mut gain_out = parameters.gain_out;

        if self.config.gain_in {
            let gain_in = if self.config.gain_in_decibels {
                decibels_to_gain(parameters.gain_in)
            } else {
                parameters.gain_in
            };

            self.gain_in.process(gain_in, num_samples);

            if self.gain_in.is_smoothing() {
                let ramp = &self.gain_in.buffer()[..num_samples];
                for channel in samples.iter_mut() {
                    for (sample, gain) in channel.iter_mut().zip(ramp.iter()) {
                        *sample *= gain;
                    }
                }
            } else {
                for channel in samples.iter_mut() {
                    for sample in channel.iter_mut() {
                        *sample *= gain_in;
                    }
                }
            }

            if self.config.unity_gain {
                gain_out -= parameters.gain_in * parameters.unity_gain;
            }
        }

        self.mix_value = match self.config.mix_law {
            MixLaw::Equal => parameters.mix,
            MixLaw::GainDry => decibels_to_gain_with_floor(parameters.mix, DRY_GAIN_FLOOR_DB),
        };
        self.mix.process(self.mix_value, num_samples);

        if self.config.gain_out {
            if self.config.gain_in_decibels {
                gain_out = decibels_to_gain(gain_out);
            }
            if self.config.polarity && parameters.polarity {
                gain_out = -gain_out;
            }
            self.gain_out_value = gain_out;
            self.gain_out.process(gain_out, num_samples);
        }
    }

    /// Replaces `samples` with the latency-aligned input.
    pub fn process_bypass(&mut self, samples: &mut [&mut [f32]]) {
        self.latency_compensation.process(&mut self.dry[..], &*samples);
        self.copy_dry(samples);
    }

    /// Overwrites `samples` with the dry signal captured by the last
    /// [`DryWetMixer::save_dry`] or [`DryWetMixer::process_bypass`].
    pub fn copy_dry(&self, samples: &mut [&mut [f32]]) {
        for (channel, dry) in samples.iter_mut().zip(self.dry.iter()) {
            let num_samples = channel.len();
            channel.copy_from_slice(&dry[..num_samples]);
        }
    }

    pub fn process_out_gain(&self, samples: &mut [&mut [f32]]) {
        if !self.config.gain_out {
            return;
        }

        if self.gain_out.is_smoothing() {
            for channel in samples.iter_mut() {
                for (sample, gain) in channel.iter_mut().zip(self.gain_out.buffer().iter()) {
                    *sample *= gain;
                }
            }
            return;
        }

        let gain = self.gain_out_value;
        for channel in samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Blends the dry signal into the wet `samples`.
    ///
    /// With `delta` set (and enabled in the config) the output is the blend
    /// minus the dry signal.
    pub fn process_mix(&self, samples: &mut [&mut [f32]], delta: bool) {
        let mix_law = self.config.mix_law;

        for (channel, dry) in samples.iter_mut().zip(self.dry.iter()) {
            if self.mix.is_smoothing() {
                for ((sample, d), m) in channel
                    .iter_mut()
                    .zip(dry.iter())
                    .zip(self.mix.buffer().iter())
                {
                    *sample = mix_sample(mix_law, *d, *sample, *m);
                }
            } else {
                let m = self.mix_value;
                for (sample, d) in channel.iter_mut().zip(dry.iter()) {
                    *sample = mix_sample(mix_law, *d, *sample, m);
                }
            }
        }

        if delta && self.config.delta {
            for (channel, dry) in samples.iter_mut().zip(self.dry.iter()) {
                for (sample, d) in channel.iter_mut().zip(dry.iter()) {
                    *sample -= d;
                }
            }
        }
    }
}

#[inline]
fn mix_sample(mix_law: MixLaw, dry: f32, wet: f32, mix: f32) -> f32 {
    match mix_law {
        // Exact at both ends of the range.
        MixLaw::Equal => dry * (1.0 - mix) + wet * mix,
        MixLaw::GainDry => mix * dry + wet,
    }
}
