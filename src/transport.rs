//! Host transport state as seen by the audio thread.

/// Snapshot of the host play head for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportPosition {
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Position in quarter notes.
    pub ppq_position: f64,
    pub is_playing: bool,
    /// Position in samples at the host sample rate.
    pub time_in_samples: i64,
}

impl Default for TransportPosition {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            ppq_position: 0.0,
            is_playing: false,
            time_in_samples: 0,
        }
    }
}

impl TransportPosition {
    /// Length of one beat in samples.
    #[inline]
    pub fn beat_length(&self, sample_rate: f64) -> f64 {
        if self.bpm > 0.0 {
            sample_rate * 60.0 / self.bpm
        } else {
            0.0
        }
    }

    /// Position advanced by `num_samples` at `sample_rate`, as the host would report it next block.
    pub fn advanced(&self, num_samples: usize, sample_rate: f64) -> Self {
        let mut next = *self;
        if self.is_playing {
            next.time_in_samples += num_samples as i64;
            next.ppq_position += num_samples as f64 * self.bpm / (60.0 * sample_rate);
        }
        next
    }
}
