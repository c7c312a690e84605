use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic data generator seeded for reproducible benchmarks.
pub struct DataGenerator {
    rng: StdRng,
}

impl DataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `count` keys grouped into runs whose lengths are uniform in
    /// `1..=2 * avg_run - 1`, so the mean run length is `avg_run`.
    /// Adjacent runs always carry different keys.
    pub fn run_keys(&mut self, count: usize, avg_run: usize) -> Vec<u32> {
        let max_run = (2 * avg_run.max(1)).saturating_sub(1).max(1);
        let mut keys = Vec::with_capacity(count);
        let mut key = self.rng.gen::<u32>();
        while keys.len() < count {
            let len = self.rng.gen_range(1..=max_run).min(count - keys.len());
            keys.extend(std::iter::repeat(key).take(len));
            key = key.wrapping_add(self.rng.gen_range(1..=16));
        }
        keys
    }

    /// `count` values uniform in `0..bound`.
    pub fn uniform_u32(&mut self, count: usize, bound: u32) -> Vec<u32> {
        (0..count).map(|_| self.rng.gen_range(0..bound)).collect()
    }

    /// `count` values uniform in [0.0, 1.0).
    pub fn uniform_f32(&mut self, count: usize) -> Vec<f32> {
        (0..count).map(|_| self.rng.gen::<f32>()).collect()
    }
}
