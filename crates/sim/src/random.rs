//! Injectable randomness for spawn timing and obstacle kinds.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// RNG algorithm identifier recorded in replay artifacts.
pub const RNG_ALGORITHM: &str = "ChaCha8Rng";

/// Source of uniform samples in `[0, 1)`.
///
/// Every randomized transition takes one of these explicitly; the core never
/// reaches for ambient randomness.
pub trait RandomSource {
    /// Next sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Seeded ChaCha8 source. Two instances with the same seed yield the same
/// sequence on every platform.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when exhausted.
///
/// Used where exact spawn intervals and kinds must be asserted. An empty
/// script always yields `0.0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(samples: impl Into<Vec<f64>>) -> Self {
        Self {
            samples: samples.into(),
            cursor: 0,
        }
    }

    /// Number of samples drawn so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.samples.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let sample = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        sample
    }
}
