//! Seedable RNG handle for random image transforms.
//!
//! Random transforms (random crop, mirroring) hold a clone of one
//! [`TransformRng`] so that a `Transform` can stay `&self` and `Sync` while
//! every step of a pipeline draws from the same stream. Each pipeline owns
//! its handle, so two layers never share randomness. The data layer reseeds
//! the handle at setup.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to one `StdRng`. Clones draw from the same stream.
#[derive(Debug, Clone)]
pub struct TransformRng {
    inner: Arc<Mutex<StdRng>>,
}

impl TransformRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// A handle seeded from the OS RNG.
    pub fn from_os_rng() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// Restarts the stream of every clone of this handle from `seed`.
    pub fn reseed(&self, seed: u64) {
        *self.lock() = StdRng::seed_from_u64(seed);
    }

    pub fn gen_bool(&self, p: f64) -> bool {
        self.lock().random_bool(p)
    }

    pub fn gen_range(&self, range: RangeInclusive<u32>) -> u32 {
        self.lock().random_range(range)
    }

    // A panic while drawing cannot leave the generator in a bad state.
    fn lock(&self) -> MutexGuard<'_, StdRng> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TransformRng {
    fn default() -> Self {
        Self::from_os_rng()
    }
}
