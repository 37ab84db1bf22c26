//! Runtime configuration of the processing chain.
//!
//! Which mixing stages exist is decided once at construction through
//! [`MixerConfig`]. Everything that changes per block lives in
//! [`Parameters`].

use thiserror::Error;

use crate::noise::Shape;

/// Maximum number of audio channels.
pub const MAX_CHANNELS: usize = 2;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),
    #[error("Maximum block size must not be zero")]
    InvalidBlockSize,
    #[error("Unsupported channel count: {0}")]
    TooManyChannels(usize),
    #[error("Invalid oversampling factor: {0}")]
    InvalidOversamplingFactor(usize),
}

/// How the dry signal is combined with the wet signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MixLaw {
    /// Linear blend, `mix = 0` is fully dry, `mix = 1` fully wet.
    #[default]
    Equal,
    /// The wet signal stays at full level, mix sets the dry gain in decibels.
    GainDry,
}

/// Stages of the dry/wet mixer that are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerConfig {
    /// Input gain stage before processing.
    pub gain_in: bool,
    /// Subtract the input gain from the output gain.
    pub unity_gain: bool,
    /// Gain values are given in decibels.
    pub gain_in_decibels: bool,
    /// Output gain stage after processing.
    pub gain_out: bool,
    /// Output polarity switch.
    pub polarity: bool,
    /// Delta (wet minus dry) monitoring.
    pub delta: bool,
    pub mix_law: MixLaw,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            gain_in: true,
            unity_gain: true,
            gain_in_decibels: true,
            gain_out: true,
            polarity: true,
            delta: true,
            mix_law: MixLaw::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub mixer: MixerConfig,
    /// Number of audio channels, 1 or 2.
    pub num_channels: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            mixer: MixerConfig::default(),
            num_channels: MAX_CHANNELS,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels(self.num_channels));
        }
        Ok(())
    }
}

/// Checks host settings handed to `prepare`.
pub fn validate_host_settings(sample_rate: f32, max_block_size: usize) -> Result<(), ConfigError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ConfigError::InvalidSampleRate(sample_rate));
    }
    if max_block_size == 0 {
        return Err(ConfigError::InvalidBlockSize);
    }
    Ok(())
}

/// Polarity of the modulation signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Unipolar, mapped to `0.0..1.0`.
    Omnidirectional,
    /// Bipolar, `-1.0..1.0`.
    #[default]
    Bidirectional,
}

/// Where the modulation goes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Written into the audio buffer.
    #[default]
    Audio,
    /// Encoded as MIDI CC, audio passes through.
    Midi,
}

/// Block-rate parameter values supplied by the host parameter layer.
///
/// All values are expected to be clamped to their documented ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    /// Effect enabled. When `false` the input passes through latency-aligned.
    pub power: bool,
    /// Free-running rate in table steps per second.
    pub rate_hz: f64,
    /// Temposync rate as note length in whole notes.
    pub rate_beats: f64,
    pub temposync: bool,
    pub procedural: bool,
    /// Range: 1.0 - 8.0 (exclusive)
    pub octaves: f32,
    /// Range: 0.0 - 1.0
    pub width: f32,
    /// Phase offset in table steps.
    pub phase: f32,
    pub shape: Shape,
    pub orientation: Orientation,
    pub output_type: OutputType,
    /// Input gain, in decibels if configured so.
    pub gain_in: f32,
    /// Range: 0.0 - 1.0
    pub unity_gain: f32,
    /// Linear mix for [`MixLaw::Equal`], dry gain in decibels for [`MixLaw::GainDry`].
    pub mix: f32,
    /// Output gain, in decibels if configured so.
    pub gain_out: f32,
    /// Invert output polarity.
    pub polarity: bool,
    pub delta: bool,
    /// Skip the dry signal entirely ([`MixLaw::GainDry`] only).
    pub mute_dry: bool,
    /// Oversampling requested.
    pub hq: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            power: true,
            rate_hz: 1.0,
            rate_beats: 0.25,
            temposync: false,
            procedural: true,
            octaves: 1.0,
            width: 0.0,
            phase: 0.0,
            shape: Shape::Spline,
            orientation: Orientation::Bidirectional,
            output_type: OutputType::Audio,
            gain_in: 0.0,
            unity_gain: 1.0,
            mix: 1.0,
            gain_out: 0.0,
            polarity: false,
            delta: false,
            mute_dry: false,
            hq: false,
        }
    }
}
