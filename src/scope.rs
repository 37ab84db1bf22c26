//! Oscilloscope capture of the generated modulation.
//!
//! The audio thread writes into a fixed buffer of atomically stored samples.
//! The UI thread holds a [`ScopeReader`] and copies the current window out
//! whenever it repaints. Neither side locks.
//!
//! The window spans one bar at the current tempo. While the host is playing
//! the write head follows the bar position, so the picture stays locked to
//! the bar.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::transport::TransportPosition;

pub const BEATS_PER_BAR: f64 = 4.0;

#[derive(Debug)]
struct ScopeBuffer {
    data: Box<[AtomicU32]>,
    window_length: AtomicUsize,
    beat_length: AtomicU32,
}

impl ScopeBuffer {
    fn new(capacity: usize) -> Self {
        let data: Vec<AtomicU32> = (0..capacity).map(|_| AtomicU32::new(0)).collect();

        Self {
            data: data.into_boxed_slice(),
            window_length: AtomicUsize::new(capacity),
            beat_length: AtomicU32::new(0.0f32.to_bits()),
        }
    }
}

/// Producer side, owned by the audio thread.
///
/// A clone starts from a copy of the captured data but writes into its own
/// buffer. Readers taken before the clone keep following the original.
#[derive(Debug)]
pub struct Oscilloscope {
    buffer: Arc<ScopeBuffer>,
    sample_rate: f64,
    write_head: usize,
}

impl Clone for Oscilloscope {
    fn clone(&self) -> Self {
        let source = &self.buffer;
        let data: Vec<AtomicU32> = source
            .data
            .iter()
            .map(|sample| AtomicU32::new(sample.load(Ordering::Relaxed)))
            .collect();

        Self {
            buffer: Arc::new(ScopeBuffer {
                data: data.into_boxed_slice(),
                window_length: AtomicUsize::new(source.window_length.load(Ordering::Relaxed)),
                beat_length: AtomicU32::new(source.beat_length.load(Ordering::Relaxed)),
            }),
            sample_rate: self.sample_rate,
            write_head: self.write_head,
        }
    }
}

impl Oscilloscope {
    /// Creates a scope holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(ScopeBuffer::new(capacity.max(1))),
            sample_rate: 44100.0,
            write_head: 0,
        }
    }

    /// Sets the rate of the samples that will be written.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate as f64;
        self.write_head = 0;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.data.len()
    }

    pub fn reader(&self) -> ScopeReader {
        ScopeReader {
            buffer: self.buffer.clone(),
        }
    }

    /// Writes one block of one channel.
    pub fn process(&mut self, samples: &[f32], transport: &TransportPosition) {
        let data = &self.buffer.data;

        let beat_length = transport.beat_length(self.sample_rate);
        let window_length = ((beat_length * BEATS_PER_BAR) as usize).clamp(1, data.len());

        if transport.is_playing {
            let bars = transport.ppq_position / BEATS_PER_BAR;
            let beat_in_bar = (bars - bars.floor()) * BEATS_PER_BAR;
            self.write_head = (beat_in_bar * beat_length) as usize % window_length;
        } else if self.write_head >= window_length {
            self.write_head = 0;
        }

        for sample in samples.iter() {
            data[self.write_head].store(sample.to_bits(), Ordering::Relaxed);
            self.write_head += 1;
            if self.write_head == window_length {
                self.write_head = 0;
            }
        }

        self.buffer
            .window_length
            .store(window_length, Ordering::Relaxed);
        self.buffer
            .beat_length
            .store((beat_length as f32).to_bits(), Ordering::Relaxed);
    }
}

/// Consumer side, cloneable and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct ScopeReader {
    buffer: Arc<ScopeBuffer>,
}

impl ScopeReader {
    /// Number of valid samples, one bar at the last seen tempo.
    pub fn window_length(&self) -> usize {
        self.buffer.window_length.load(Ordering::Relaxed)
    }

    /// Length of one beat in samples.
    pub fn beat_length(&self) -> f32 {
        f32::from_bits(self.buffer.beat_length.load(Ordering::Relaxed))
    }

    /// Copies the start of the current window into `out` and returns the
    /// number of samples written.
    pub fn snapshot(&self, out: &mut [f32]) -> usize {
        let num_samples = self.window_length().min(out.len());

        for (value, sample) in out[..num_samples].iter_mut().zip(self.buffer.data.iter()) {
            *value = f32::from_bits(sample.load(Ordering::Relaxed));
        }

        num_samples
    }
}
