//! Fixed delay that keeps the dry signal aligned with the processed one.

use alloc::vec::Vec;

use crate::config::MAX_CHANNELS;

#[derive(Debug, Default, Clone)]
pub struct LatencyCompensation {
    lines: [Vec<f32>; MAX_CHANNELS],
    write_ptr: usize,
    latency: usize,
}

impl LatencyCompensation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes the delay lines to `latency` samples and clears them.
    pub fn prepare(&mut self, _block_size: usize, latency: usize) {
        for line in self.lines.iter_mut() {
            line.resize(latency, 0.0);
        }
        self.latency = latency;
        self.reset();
    }

    /// Clears the delay lines without resizing them.
    pub fn reset(&mut self) {
        for line in self.lines.iter_mut() {
            line.fill(0.0);
        }
        self.write_ptr = 0;
    }

    #[inline]
    pub fn latency(&self) -> usize {
        self.latency
    }

    /// Writes `input` delayed by the configured latency into `output`, channel by channel.
    ///
    /// Each output channel must hold at least as many samples as its input channel.
    pub fn process<O, I>(&mut self, output: &mut [O], input: &[I])
    where
        O: AsMut<[f32]>,
        I: AsRef<[f32]>,
    {
        debug_assert!(input.len() <= MAX_CHANNELS);

        if self.latency == 0 {
            for (out, in_) in output.iter_mut().zip(input.iter()) {
                let in_ = in_.as_ref();
                out.as_mut()[..in_.len()].copy_from_slice(in_);
            }
            return;
        }

        let mut write_ptr = self.write_ptr;

        for ((out, in_), line) in output
            .iter_mut()
            .zip(input.iter())
            .zip(self.lines.iter_mut())
        {
            write_ptr = self.write_ptr;

            for (out_sample, in_sample) in out.as_mut().iter_mut().zip(in_.as_ref().iter()) {
                *out_sample = line[write_ptr];
                line[write_ptr] = *in_sample;
                write_ptr += 1;
                if write_ptr == self.latency {
                    write_ptr = 0;
                }
            }
        }

        self.write_ptr = write_ptr;
    }
}
