//! Free-running phase accumulator.

/// Phase after one step and whether it wrapped around.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PhaseInfo {
    pub phase: f64,
    pub retrig: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Phasor {
    phase: f64,
    increment: f64,
}

impl Phasor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self) {
        self.phase = 0.0;
        self.increment = 0.0;
    }

    #[inline]
    pub fn set_increment(&mut self, increment: f64) {
        self.increment = increment;
    }

    #[inline]
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Sets the phase directly. `phase` must be in `[0, 1)`.
    #[inline]
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> PhaseInfo {
        self.phase += self.increment;

        if self.phase >= 1.0 {
            self.phase -= 1.0;
            PhaseInfo {
                phase: self.phase,
                retrig: true,
            }
        } else {
            PhaseInfo {
                phase: self.phase,
                retrig: false,
            }
        }
    }
}
