//! Seedable random source shared by path generators, sequences and builders

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How a [`Randomizer`] is seeded on every `initialize`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomizerConfig {
    /// Same sequence after every restart
    Seeded(u64),
    /// Fresh seed from the system clock
    #[default]
    TimeBased,
}

/// Deterministic random source, re-seeded from its config by [`initialize`](Self::initialize)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RandomizerConfig", into = "RandomizerConfig")]
pub struct Randomizer {
    config: RandomizerConfig,
    rng: ChaCha8Rng,
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new(RandomizerConfig::default())
    }
}

impl From<RandomizerConfig> for Randomizer {
    fn from(config: RandomizerConfig) -> Self {
        Self::new(config)
    }
}

impl From<Randomizer> for RandomizerConfig {
    fn from(randomizer: Randomizer) -> Self {
        randomizer.config
    }
}

impl Randomizer {
    pub fn new(config: RandomizerConfig) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(Self::seed_for(config)),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(RandomizerConfig::Seeded(seed))
    }

    fn seed_for(config: RandomizerConfig) -> u64 {
        match config {
            RandomizerConfig::Seeded(seed) => seed,
            RandomizerConfig::TimeBased => std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
        }
    }

    pub fn config(&self) -> RandomizerConfig {
        self.config
    }

    /// Restart the sequence from the configured seed
    pub fn initialize(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(Self::seed_for(self.config));
    }

    /// Uniform value in 0..1
    pub fn next(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    pub fn next_f32(&mut self) -> f32 {
        self.next() as f32
    }

    /// Uniform value between `min` and `max`
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        let t = self.next_f32();
        min + (max - min) * t
    }

    /// Integer in `min..max`, rounded from a float draw over `min..=max-1`
    ///
    /// Not uniform: rounding gives `min` and `max - 1` half the weight of each
    /// interior value. With `max - min == 2` the two results are equally likely.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        self.range(min as f32, (max - 1) as f32).round() as i32
    }
}
