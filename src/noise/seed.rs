//! Hand-off of the noise seed from the control thread to the audio thread.
//!
//! The control side only touches atomics. The audio side picks the request up
//! at the start of the next block and refills the table there, so synthesis
//! never reads a half-written table.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use super::noise_table::DEFAULT_SEED;

#[derive(Debug)]
struct SeedState {
    requested: AtomicI32,
    pending: AtomicBool,
}

/// Shared, cloneable access to the seed of one noise engine.
#[derive(Debug, Clone)]
pub struct SeedHandle {
    state: Arc<SeedState>,
}

impl Default for SeedHandle {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SeedHandle {
    pub fn new(seed: i32) -> Self {
        Self {
            state: Arc::new(SeedState {
                requested: AtomicI32::new(seed),
                pending: AtomicBool::new(false),
            }),
        }
    }

    /// Requests a new seed. Applied at the next block boundary.
    pub fn set_seed(&self, seed: i32) {
        self.state.requested.store(seed, Ordering::Relaxed);
        self.state.pending.store(true, Ordering::Release);
        log::info!("Noise seed change requested: {}", seed);
    }

    /// Latest requested seed, for display and patch persistence.
    pub fn seed(&self) -> i32 {
        self.state.requested.load(Ordering::Relaxed)
    }

    /// Independent handle starting from this one's requested seed.
    ///
    /// A request that is still pending stays pending on both handles.
    pub fn detach(&self) -> Self {
        Self {
            state: Arc::new(SeedState {
                requested: AtomicI32::new(self.seed()),
                pending: AtomicBool::new(self.state.pending.load(Ordering::Acquire)),
            }),
        }
    }

    /// Takes a pending request, if any. Called from the audio thread.
    #[inline]
    pub fn take_pending(&self) -> Option<i32> {
        if self.state.pending.swap(false, Ordering::Acquire) {
            Some(self.state.requested.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}
