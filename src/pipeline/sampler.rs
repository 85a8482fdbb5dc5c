//! Seedable uniform sampling without replacement.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

/// Draws files uniformly at random from a candidate list.
///
/// The same seed and candidate list always produce the same draw.
#[derive(Debug)]
pub struct Sampler {
    seed: u64,
    rng: StdRng,
}

impl Sampler {
    /// Sampler with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sampler seeded from the thread-local entropy source.
    pub fn from_entropy() -> Self {
        Self::with_seed(rand::thread_rng().r#gen())
    }

    /// Seed in use, for logging and the checkpoint.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw up to `count` distinct candidates. When fewer candidates exist,
    /// all of them are returned (in shuffled order).
    pub fn sample(&mut self, candidates: &[PathBuf], count: usize) -> Vec<PathBuf> {
        let amount = count.min(candidates.len());
        rand::seq::index::sample(&mut self.rng, candidates.len(), amount)
            .into_iter()
            .map(|i| candidates[i].clone())
            .collect()
    }
}
