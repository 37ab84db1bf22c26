//! Block processor tying the noise engine, the oversampler, the scope and
//! the dry/wet mixer together.
//!
//! Signal flow per block:
//!
//! 1. Dry capture and input gain.
//! 2. Upsampling, noise synthesis and orientation mapping at the oversampled rate.
//! 3. Scope capture, downsampling.
//! 4. Either MIDI CC encoding (audio passes through dry) or output gain and mix.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::config::{
    validate_host_settings, ConfigError, MixLaw, Orientation, OutputType, Parameters,
    ProcessorConfig, MAX_CHANNELS,
};
use crate::fx::dry_wet_mix::DryWetMixer;
use crate::noise::perlin_engine::{EngineParameters, PerlinEngine};
use crate::noise::seed::SeedHandle;
use crate::oversampler::{NoOversampling, Oversampler};
use crate::scope::{Oscilloscope, ScopeReader};
use crate::transport::TransportPosition;

/// Samples between two MIDI CC messages.
pub const CC_STEP: usize = 8;

/// Controller number the modulation is sent on (mod wheel).
pub const CC_CONTROLLER: u8 = 1;

/// Oscilloscope capacity per channel.
pub const SCOPE_CAPACITY: usize = 1 << 18;

/// Hard limit of the output in debug builds.
const DEBUG_CLAMP: f32 = 2.0;

/// A MIDI control change produced in CC output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcEvent {
    /// Offset in samples from the start of the block.
    pub sample_offset: usize,
    /// MIDI channel, 1 - 16.
    pub channel: u8,
    pub controller: u8,
    /// Range: 0 - 127
    pub value: u8,
}

impl CcEvent {
    /// Raw MIDI bytes of the message.
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            0xb0 | (self.channel.saturating_sub(1) & 0x0f),
            self.controller & 0x7f,
            self.value & 0x7f,
        ]
    }
}

/// Top-level DSP processor.
///
/// A clone is a separate instance: it gets its own seed handle and scope
/// buffers, starting from the current seed and captured data.
#[derive(Clone)]
pub struct Processor {
    config: ProcessorConfig,
    parameters: Parameters,

    engine: PerlinEngine,
    mixer: DryWetMixer,
    oversampler: Box<dyn Oversampler>,
    scopes: [Oscilloscope; MAX_CHANNELS],

    up_buffers: [Vec<f32>; MAX_CHANNELS],
    cc_events: Vec<CcEvent>,

    sample_rate: f32,
    max_block_size: usize,
    latency: usize,
    prepared: bool,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(ProcessorConfig::default())
    }
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self::with_oversampler(config, Box::new(NoOversampling::new()))
    }

    pub fn with_oversampler(config: ProcessorConfig, oversampler: Box<dyn Oversampler>) -> Self {
        Self {
            config,
            parameters: Parameters::default(),
            engine: PerlinEngine::new(SeedHandle::default()),
            mixer: DryWetMixer::new(config.mixer),
            oversampler,
            scopes: [
                Oscilloscope::new(SCOPE_CAPACITY),
                Oscilloscope::new(SCOPE_CAPACITY),
            ],
            up_buffers: [Vec::new(), Vec::new()],
            cc_events: Vec::new(),
            sample_rate: 0.0,
            max_block_size: 0,
            latency: 0,
            prepared: false,
        }
    }

    /// (Re)allocates all buffers for the given host settings.
    ///
    /// Must be called before the first [`Processor::process`] and whenever
    /// sample rate, block size or [`Processor::needs_prepare`] change.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> Result<(), ConfigError> {
        self.config.validate()?;
        validate_host_settings(sample_rate, max_block_size)?;

        self.oversampler.set_enabled(self.parameters.hq);
        self.oversampler.prepare(sample_rate, max_block_size);

        let factor = self.oversampler.factor();
        if factor == 0 {
            return Err(ConfigError::InvalidOversamplingFactor(factor));
        }

        let sample_rate_up = sample_rate * factor as f32;
        let block_size_up = max_block_size * factor;
        self.latency = self.oversampler.latency();

        self.engine.prepare(sample_rate_up, block_size_up);
        for scope in self.scopes.iter_mut() {
            scope.prepare(sample_rate_up);
        }
        self.mixer.prepare(sample_rate, max_block_size, self.latency);

        self.up_buffers = [vec![0.0; block_size_up], vec![0.0; block_size_up]];
        self.cc_events = Vec::with_capacity(MAX_CHANNELS * max_block_size.div_ceil(CC_STEP));

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.prepared = true;

        log::debug!(
            "Processor prepared: sample rate {}, block size {}, oversampling {}x, latency {}",
            sample_rate,
            max_block_size,
            factor,
            self.latency
        );

        Ok(())
    }

    #[inline]
    pub fn set_parameters(&mut self, parameters: &Parameters) {
        self.parameters = *parameters;
    }

    #[inline]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[inline]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Requests a new noise seed, applied at the next block.
    pub fn set_seed(&self, seed: i32) {
        self.engine.set_seed(seed);
    }

    pub fn seed(&self) -> i32 {
        self.engine.seed()
    }

    /// Handle for the control thread.
    pub fn seed_handle(&self) -> SeedHandle {
        self.engine.seed_handle()
    }

    /// Latency the host has to compensate, valid after [`Processor::prepare`].
    #[inline]
    pub fn reported_latency_samples(&self) -> usize {
        self.latency
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Whether the oversampling request changed since the last prepare.
    ///
    /// Meant to be polled from a low-rate timer on a non-realtime thread.
    pub fn needs_prepare(&self) -> bool {
        let changed = self.oversampler.is_enabled() != self.parameters.hq;
        if changed {
            log::debug!("Oversampling changed to {}, prepare required", self.parameters.hq);
        }
        changed
    }

    /// MIDI CC messages produced by the last block.
    #[inline]
    pub fn cc_events(&self) -> &[CcEvent] {
        &self.cc_events
    }

    pub fn scope_reader(&self, channel: usize) -> ScopeReader {
        self.scopes[channel].reader()
    }

    #[inline]
    pub fn engine(&self) -> &PerlinEngine {
        &self.engine
    }

    /// Processes one block in place.
    pub fn process(&mut self, samples: &mut [&mut [f32]], transport: &TransportPosition) {
        self.cc_events.clear();

        let num_samples = match samples.first() {
            Some(channel) => channel.len(),
            None => return,
        };
        if num_samples == 0 {
            return;
        }
        debug_assert!(self.prepared);
        debug_assert!(num_samples <= self.max_block_size);
        debug_assert!(samples.len() <= self.config.num_channels);

        let parameters = self.parameters;

        if !parameters.power {
            self.mixer.process_bypass(samples);
            return;
        }

        self.mixer.save_dry(samples, &parameters);

        let factor = self.oversampler.factor();
        let num_samples_up = num_samples * factor;
        let num_channels = samples.len();

        for (ch, (channel, up)) in samples.iter().zip(self.up_buffers.iter_mut()).enumerate() {
            self.oversampler.upsample(ch, channel, &mut up[..num_samples_up]);
        }

        let [up_left, up_right] = &mut self.up_buffers;
        let mut up: [&mut [f32]; MAX_CHANNELS] = [
            &mut up_left[..num_samples_up],
            &mut up_right[..num_samples_up],
        ];
        let up = &mut up[..num_channels];

        let transport_up = TransportPosition {
            time_in_samples: transport.time_in_samples * factor as i64,
            ..*transport
        };

        self.engine.set_parameters(&engine_parameters(&parameters));
        self.engine.process(up, &transport_up);

        if parameters.orientation == Orientation::Omnidirectional {
            for channel in up.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample = *sample * 0.5 + 0.5;
                }
            }
        }

        for (scope, channel) in self.scopes.iter_mut().zip(up.iter()) {
            scope.process(channel, transport);
        }

        for (ch, (channel, up)) in samples.iter_mut().zip(up.iter()).enumerate() {
            self.oversampler.downsample(ch, up, channel);
        }

        match parameters.output_type {
            OutputType::Midi => {
                self.encode_cc(samples, parameters.orientation);
                self.mixer.copy_dry(samples);
            }
            OutputType::Audio => {
                self.mixer.process_out_gain(samples);

                let mute_dry =
                    parameters.mute_dry && self.config.mixer.mix_law == MixLaw::GainDry;
                if !mute_dry {
                    self.mixer.process_mix(samples, parameters.delta);
                }
            }
        }

        if cfg!(debug_assertions) {
            for channel in samples.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample = sample.clamp(-DEBUG_CLAMP, DEBUG_CLAMP);
                }
            }
        }
    }

    fn encode_cc(&mut self, samples: &[&mut [f32]], orientation: Orientation) {
        let num_samples = samples.first().map_or(0, |channel| channel.len());

        for s in (0..num_samples).step_by(CC_STEP) {
            match orientation {
                Orientation::Omnidirectional => {
                    self.push_cc(s, 1, samples[0][s]);
                }
                Orientation::Bidirectional => {
                    for (ch, channel) in samples.iter().enumerate() {
                        self.push_cc(s, ch as u8 + 1, channel[s] * 0.5 + 0.5);
                    }
                }
            }
        }
    }

    #[inline]
    fn push_cc(&mut self, sample_offset: usize, channel: u8, value: f32) {
        // Capacity is fixed in prepare.
        if self.cc_events.len() == self.cc_events.capacity() {
            return;
        }

        self.cc_events.push(CcEvent {
            sample_offset,
            channel,
            controller: CC_CONTROLLER,
            value: cc_value(value),
        });
    }
}

/// Maps a unipolar value to a 7-bit controller value.
#[inline]
pub fn cc_value(value: f32) -> u8 {
    (value * 127.0).round().clamp(0.0, 127.0) as u8
}

fn engine_parameters(parameters: &Parameters) -> EngineParameters {
    EngineParameters {
        rate_hz: parameters.rate_hz,
        rate_beats: parameters.rate_beats,
        octaves: parameters.octaves,
        width: parameters.width,
        phase: parameters.phase,
        shape: parameters.shape,
        temposync: parameters.temposync,
        procedural: parameters.procedural,
    }
}
