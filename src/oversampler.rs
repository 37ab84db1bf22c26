//! Black-box contract of the oversampling stage.
//!
//! The filters themselves live outside this crate. The processor only needs
//! to know the rate multiplier and the latency they add, and to push samples
//! through them.

use dyn_clone::DynClone;

pub trait Oversampler: DynClone + Send {
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Called from `Processor::prepare` after the enabled state is set.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);

    /// Current rate multiplier, `1` while disabled.
    fn factor(&self) -> usize;

    /// Current latency in samples at the host rate, `0` while disabled.
    fn latency(&self) -> usize;

    /// Upsamples one channel. `output` holds `input.len() * factor()` samples.
    fn upsample(&mut self, channel: usize, input: &[f32], output: &mut [f32]);

    /// Downsamples one channel. `input` holds `output.len() * factor()` samples.
    fn downsample(&mut self, channel: usize, input: &[f32], output: &mut [f32]);
}

dyn_clone::clone_trait_object!(Oversampler);

/// Pass-through used when no oversampling filters are plugged in.
#[derive(Debug, Default, Clone)]
pub struct NoOversampling {
    enabled: bool,
}

impl NoOversampling {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Oversampler for NoOversampling {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    fn factor(&self) -> usize {
        1
    }

    fn latency(&self) -> usize {
        0
    }

    fn upsample(&mut self, _channel: usize, input: &[f32], output: &mut [f32]) {
        output[..input.len()].copy_from_slice(input);
    }

    fn downsample(&mut self, _channel: usize, input: &[f32], output: &mut [f32]) {
        let num_samples = output.len();
        output.copy_from_slice(&input[..num_samples]);
    }
}
