//! Deterministic RNG streams derived from one master seed.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Golden-ratio increment used to spread stream indices across the seed space.
const STREAM_MIX: u64 = 0x9E3779B97F4A7C15;

/// Seed state for logging and reproducing a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedState {
    /// Seed the registry was created with.
    pub master_seed: u64,
    /// Number of RNG streams handed out so far.
    pub stream_counter: u64,
}

/// Hands out independent RNGs: stream N is seeded from `(master_seed, N)`.
///
/// The same master seed and the same order of [`SeedRegistry::next_rng`]
/// calls reproduce identical streams. Create one registry per simulation
/// and pass it to whatever builds the random sources.
#[derive(Debug)]
pub struct SeedRegistry {
    master_seed: u64,
    next_stream: AtomicU64,
}

impl SeedRegistry {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            next_stream: AtomicU64::new(0),
        }
    }

    /// Registry seeded from the current wall-clock time, for non-repeatable runs.
    pub fn from_time() -> Self {
        let now = chrono::Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().wrapping_mul(1_000));
        Self::new(nanos as u64)
    }

    /// Next independent RNG stream.
    pub fn next_rng(&self) -> StdRng {
        let stream = self.next_stream.fetch_add(1, Ordering::SeqCst);
        debug!(master_seed = self.master_seed, stream, "Allocated RNG stream");
        StdRng::seed_from_u64(stream_seed(self.master_seed, stream))
    }

    pub fn current(&self) -> SeedState {
        SeedState {
            master_seed: self.master_seed,
            stream_counter: self.next_stream.load(Ordering::SeqCst),
        }
    }
}

fn stream_seed(master_seed: u64, stream: u64) -> u64 {
    master_seed.wrapping_add(stream.wrapping_mul(STREAM_MIX))
}
