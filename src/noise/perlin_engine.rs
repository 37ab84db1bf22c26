//! Two-voice Perlin noise engine.
//!
//! Changing the rate or the table read position of a running voice would
//! click. Instead the engine flips to its standby voice, primes it with the
//! new values and crossfades from the old voice to the new one over a fixed
//! time. While a crossfade is running, further changes wait until it is done.

use alloc::vec;
use alloc::vec::Vec;

use super::noise_table::NoiseTable;
use super::perlin::{ParameterRamps, Perlin, VoiceParameters};
use super::seed::SeedHandle;
use super::Shape;
use crate::transport::TransportPosition;
use crate::utils::smoothed_parameter::SmoothedParameter;
use crate::utils::{crossfade_cosine, ms_to_samples};

/// Length of a voice crossfade.
pub const CROSSFADE_MS: f32 = 420.0;

/// Host position deviation, in samples, that counts as a transport jump.
pub const JUMP_THRESHOLD: i64 = 2;

const OCTAVES_SMOOTHING_MS: f32 = 10.0;
const WIDTH_SMOOTHING_MS: f32 = 20.0;
const PHASE_SMOOTHING_MS: f32 = 20.0;

/// Parameters of the noise engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParameters {
    /// Free-running rate in table steps per second.
    pub rate_hz: f64,
    /// Temposync rate as note length in whole notes (`0.25` = one beat).
    pub rate_beats: f64,
    /// Number of octaves in the range from `1.0` to `8.0` (exclusive).
    pub octaves: f32,
    /// Right channel phase offset in table steps.
    pub width: f32,
    /// Phase offset in table steps.
    pub phase: f32,
    pub shape: Shape,
    /// Use `rate_beats` against the host tempo instead of `rate_hz`.
    pub temposync: bool,
    /// Derive the read position from the host transport while it is playing.
    pub procedural: bool,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            rate_hz: 1.0,
            rate_beats: 0.25,
            octaves: 1.0,
            width: 0.0,
            phase: 0.0,
            shape: Shape::Spline,
            temposync: false,
            procedural: true,
        }
    }
}

/// Clones get their own [`SeedHandle`], so reseeding one engine leaves the
/// other untouched.
#[derive(Debug)]
pub struct PerlinEngine {
    sample_rate_inv: f64,

    table: NoiseTable,
    seed: SeedHandle,

    voices: [Perlin; 2],
    voice_index: usize,
    prev_buffer: [Vec<f32>; 2],

    parameters: EngineParameters,
    octaves: SmoothedParameter,
    width: SmoothedParameter,
    phase: SmoothedParameter,

    rate_hz: f64,
    rate_beats: f64,
    rate_inv: f64,
    temposync: bool,

    xfade_buffer: Vec<f32>,
    xfade_position: usize,
    xfade_length: usize,
    crossfading: bool,

    position_estimate: Option<i64>,
}

impl Clone for PerlinEngine {
    fn clone(&self) -> Self {
        Self {
            sample_rate_inv: self.sample_rate_inv,
            table: self.table.clone(),
            seed: self.seed.detach(),
            voices: self.voices.clone(),
            voice_index: self.voice_index,
            prev_buffer: self.prev_buffer.clone(),
            parameters: self.parameters,
            octaves: self.octaves.clone(),
            width: self.width.clone(),
            phase: self.phase.clone(),
            rate_hz: self.rate_hz,
            rate_beats: self.rate_beats,
            rate_inv: self.rate_inv,
            temposync: self.temposync,
            xfade_buffer: self.xfade_buffer.clone(),
            xfade_position: self.xfade_position,
            xfade_length: self.xfade_length,
            crossfading: self.crossfading,
            position_estimate: self.position_estimate,
        }
    }
}

impl Default for PerlinEngine {
    fn default() -> Self {
        Self::new(SeedHandle::default())
    }
}

impl PerlinEngine {
    pub fn new(seed: SeedHandle) -> Self {
        let table = NoiseTable::new(seed.seed());

        Self {
            sample_rate_inv: 1.0,
            table,
            seed,
            voices: [Perlin::new(), Perlin::new()],
            voice_index: 0,
            prev_buffer: [Vec::new(), Vec::new()],
            parameters: EngineParameters::default(),
            octaves: SmoothedParameter::new(1.0),
            width: SmoothedParameter::new(0.0),
            phase: SmoothedParameter::new(0.0),
            rate_hz: -1.0,
            rate_beats: -1.0,
            rate_inv: 0.0,
            temposync: false,
            xfade_buffer: Vec::new(),
            xfade_position: 0,
            xfade_length: 1,
            crossfading: false,
            position_estimate: None,
        }
    }

    /// Allocates the block buffers and puts both voices back to their start.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        self.sample_rate_inv = 1.0 / sample_rate as f64;

        self.prev_buffer = [vec![0.0; block_size], vec![0.0; block_size]];
        for voice in self.voices.iter_mut() {
            voice.init();
            voice.prepare(block_size);
        }
        self.voice_index = 0;
        self.rate_hz = -1.0;
        self.rate_beats = -1.0;
        self.position_estimate = None;

        self.xfade_length = ms_to_samples(CROSSFADE_MS, sample_rate).max(1);
        self.xfade_position = 0;
        self.crossfading = false;
        self.xfade_buffer = vec![0.0; block_size];

        self.octaves.prepare(sample_rate, block_size, OCTAVES_SMOOTHING_MS);
        self.width.prepare(sample_rate, block_size, WIDTH_SMOOTHING_MS);
        self.phase.prepare(sample_rate, block_size, PHASE_SMOOTHING_MS);
    }

    #[inline]
    pub fn set_parameters(&mut self, parameters: &EngineParameters) {
        self.parameters = *parameters;
    }

    #[inline]
    pub fn parameters(&self) -> &EngineParameters {
        &self.parameters
    }

    /// Requests a new seed. Thread-safe through the shared [`SeedHandle`].
    pub fn set_seed(&self, seed: i32) {
        self.seed.set_seed(seed);
    }

    pub fn seed(&self) -> i32 {
        self.seed.seed()
    }

    pub fn seed_handle(&self) -> SeedHandle {
        self.seed.clone()
    }

    #[inline]
    pub fn table(&self) -> &NoiseTable {
        &self.table
    }

    #[inline]
    pub fn is_crossfading(&self) -> bool {
        self.crossfading
    }

    #[inline]
    pub fn active_voice(&self) -> &Perlin {
        &self.voices[self.voice_index]
    }

    /// Renders one block of noise into one or two channels.
    pub fn process(&mut self, samples: &mut [&mut [f32]], transport: &TransportPosition) {
        let num_samples = match samples.first() {
            Some(channel) => channel.len(),
            None => return,
        };
        debug_assert!(samples.len() <= 2);
        debug_assert!(num_samples <= self.xfade_buffer.len());

        if let Some(seed) = self.seed.take_pending() {
            self.table.reseed(seed);
        }

        let parameters = self.parameters;

        // A running procedural crossfade keeps the rate mode it started with.
        let temposync = if self.crossfading && parameters.procedural && transport.is_playing {
            self.temposync
        } else {
            parameters.temposync
        };

        if temposync {
            self.process_sync(
                transport,
                num_samples,
                parameters.rate_beats,
                parameters.procedural,
            );
        } else {
            self.process_free(
                transport,
                num_samples,
                parameters.rate_hz,
                parameters.procedural,
            );
        }

        self.octaves.process(parameters.octaves, num_samples);
        self.width.process(parameters.width, num_samples);
        self.phase.process(parameters.phase, num_samples);

        let ramps = ParameterRamps {
            octaves: &self.octaves.buffer()[..num_samples],
            octaves_smoothing: self.octaves.is_smoothing(),
            width: &self.width.buffer()[..num_samples],
            width_smoothing: self.width.is_smoothing(),
            phase: &self.phase.buffer()[..num_samples],
            phase_smoothing: self.phase.is_smoothing(),
        };

        let voice_parameters = VoiceParameters {
            octaves: parameters.octaves,
            width: parameters.width,
            phase: parameters.phase,
            shape: parameters.shape,
        };

        let noise = self.table.values();

        let voice = &mut self.voices[self.voice_index];
        voice.set_parameters(&voice_parameters);
        voice.render(noise, &ramps, samples);

        if !self.crossfading {
            return;
        }

        let prev_voice = &mut self.voices[1 - self.voice_index];
        prev_voice.set_parameters(&voice_parameters);

        let [prev_left, prev_right] = &mut self.prev_buffer;
        let mut prev: [&mut [f32]; 2] =
            [&mut prev_left[..num_samples], &mut prev_right[..num_samples]];
        let prev = &mut prev[..samples.len()];
        prev_voice.render(noise, &ramps, prev);

        // Counted in whole samples so the fade length does not drift.
        let length_inv = 1.0 / self.xfade_length as f64;
        let xfade = &mut self.xfade_buffer[..num_samples];
        for x in xfade.iter_mut() {
            *x = (self.xfade_position as f64 * length_inv) as f32;
            if self.xfade_position < self.xfade_length {
                self.xfade_position += 1;
            } else {
                self.crossfading = false;
            }
        }

        for (channel, prev_channel) in samples.iter_mut().zip(prev.iter()) {
            for ((sample, prev_sample), x) in channel
                .iter_mut()
                .zip(prev_channel.iter())
                .zip(xfade.iter())
            {
                *sample = crossfade_cosine(*prev_sample, *sample, *x);
            }
        }
    }

    fn process_free(
        &mut self,
        transport: &TransportPosition,
        num_samples: usize,
        rate_hz: f64,
        procedural: bool,
    ) {
        if procedural && transport.is_playing {
            self.process_free_procedural(transport, rate_hz, num_samples);
        } else {
            self.rate_hz = rate_hz;
            self.rate_inv = rate_hz * self.sample_rate_inv;
            self.temposync = false;
            self.voices[self.voice_index].set_speed(self.rate_inv);
        }
    }

    fn process_free_procedural(
        &mut self,
        transport: &TransportPosition,
        rate_hz: f64,
        num_samples: usize,
    ) {
        if !self.crossfading {
            let mut shall_crossfade = self.transport_jumps(transport) || self.temposync;

            if self.rate_hz != rate_hz {
                self.rate_hz = rate_hz;
                self.rate_inv = rate_hz * self.sample_rate_inv;
                shall_crossfade = true;
            }

            if shall_crossfade {
                self.temposync = false;
                self.init_crossfade();
                self.voices[self.voice_index].set_speed(self.rate_inv);
            }
        }

        self.voices[self.voice_index].update_position(
            transport,
            self.rate_hz,
            self.sample_rate_inv,
        );

        self.update_position_estimate(transport, num_samples);
    }

    fn process_sync(
        &mut self,
        transport: &TransportPosition,
        num_samples: usize,
        rate_beats: f64,
        procedural: bool,
    ) {
        if procedural && transport.is_playing {
            self.process_sync_procedural(transport, rate_beats, num_samples);
        } else {
            self.set_rate_beats(rate_beats);
            self.temposync = true;
            self.update_sync_speed(transport);
        }
    }

    fn process_sync_procedural(
        &mut self,
        transport: &TransportPosition,
        rate_beats: f64,
        num_samples: usize,
    ) {
        if !self.crossfading {
            let mut shall_crossfade = self.transport_jumps(transport) || !self.temposync;

            if self.rate_beats != rate_beats {
                self.set_rate_beats(rate_beats);
                shall_crossfade = true;
            }

            if shall_crossfade {
                self.temposync = true;
                self.init_crossfade();
                self.update_sync_speed(transport);
            }
        }

        self.voices[self.voice_index].update_position_sync(transport, self.rate_inv);

        self.update_position_estimate(transport, num_samples);
    }

    fn set_rate_beats(&mut self, rate_beats: f64) {
        self.rate_beats = rate_beats;
        self.rate_inv = if rate_beats > 0.0 {
            0.25 / rate_beats
        } else {
            0.0
        };
    }

    fn update_sync_speed(&mut self, transport: &TransportPosition) {
        let beats_per_sample = transport.bpm / 60.0 * self.sample_rate_inv;
        self.voices[self.voice_index].set_speed(self.rate_inv * beats_per_sample);
    }

    fn transport_jumps(&self, transport: &TransportPosition) -> bool {
        match self.position_estimate {
            Some(estimate) => (transport.time_in_samples - estimate).abs() > JUMP_THRESHOLD,
            None => true,
        }
    }

    fn update_position_estimate(&mut self, transport: &TransportPosition, num_samples: usize) {
        self.position_estimate = Some(transport.time_in_samples + num_samples as i64);
    }

    fn init_crossfade(&mut self) {
        self.xfade_position = 0;
        self.crossfading = true;
        self.voice_index = 1 - self.voice_index;
    }
}
