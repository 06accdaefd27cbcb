use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;

pub trait RandomSource {
    fn rand_bits(&mut self, width: u32) -> u32;
    fn rand_bool(&mut self) -> bool;
    /// Uniform index in `0..len`. `len` must be non-zero.
    fn rand_index(&mut self, len: usize) -> usize;
    fn rand_range(&mut self, low: u32, high: u32) -> u32;
}

#[derive(Debug, Clone)]
pub struct StdRandom(StdRng);

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn for_component(seed: u64, component: u64) -> Self {
        Self::seeded(seed ^ component.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }
}

impl RandomSource for StdRandom {
    #[inline]
    fn rand_bits(&mut self, width: u32) -> u32 {
        match width {
            0 => 0,
            w if w >= 32 => self.0.gen(),
            w => self.0.gen::<u32>() & ((1 << w) - 1),
        }
    }

    #[inline]
    fn rand_bool(&mut self) -> bool {
        self.0.gen()
    }

    #[inline]
    fn rand_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }

    #[inline]
    fn rand_range(&mut self, low: u32, high: u32) -> u32 {
        self.0.gen_range(low..=high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RandomizerConfig {
    pub prob_low: u32,
    pub prob_high: u32,
    pub period: u32,
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            prob_low: 10,
            prob_high: 90,
            period: 100,
        }
    }
}

// True with `prob` percent. Every `period` draws `prob` is redrawn from prob_low..=prob_high.
#[derive(Debug, Clone)]
pub struct BoolRandomizer {
    cfg: RandomizerConfig,
    prob: u32,
    counter: u32,
}

impl BoolRandomizer {
    pub fn new(cfg: RandomizerConfig) -> Self {
        Self {
            cfg,
            prob: 100,
            counter: 0,
        }
    }

    pub fn always() -> Self {
        Self::new(RandomizerConfig {
            prob_low: 100,
            prob_high: 100,
            period: 1,
        })
    }

    pub fn prob(&self) -> u32 {
        self.prob
    }

    pub fn get<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.counter += 1;
        if self.counter >= self.cfg.period {
            self.counter = 0;
            self.prob = rng.rand_range(self.cfg.prob_low, self.cfg.prob_high);
        }
        rng.rand_range(0, 99) < self.prob
    }
}
