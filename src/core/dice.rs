//! Deterministic stochastic provider
//!
//! Every random draw in combat resolution goes through [`Dice`], so a saved
//! game replays bit-for-bit: the generator state (seed, stream and word
//! position) is part of the serialized theater.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Above this many trials binomial draws stop simulating individual trials
const DIRECT_BINOMIAL_LIMIT: u64 = 64;

/// Variance above which the normal approximation is used for binomials
const NORMAL_APPROX_VARIANCE: f64 = 9.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DiceState", into = "DiceState")]
pub struct Dice {
    seed: u64,
    rng: ChaCha8Rng,
}

/// Serialized form of the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceState {
    pub seed: u64,
    pub stream: u64,
    pub word_pos_hi: u64,
    pub word_pos_lo: u64,
}

impl From<DiceState> for Dice {
    fn from(state: DiceState) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(state.seed);
        rng.set_stream(state.stream);
        rng.set_word_pos(((state.word_pos_hi as u128) << 64) | state.word_pos_lo as u128);
        Self {
            seed: state.seed,
            rng,
        }
    }
}

impl From<Dice> for DiceState {
    fn from(dice: Dice) -> Self {
        dice.state()
    }
}

impl PartialEq for Dice {
    fn eq(&self, other: &Self) -> bool {
        self.state() == other.state()
    }
}

impl Dice {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the sequence from a new seed
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::new(seed);
    }

    pub fn state(&self) -> DiceState {
        let word_pos = self.rng.get_word_pos();
        DiceState {
            seed: self.seed,
            stream: self.rng.get_stream(),
            word_pos_hi: (word_pos >> 64) as u64,
            word_pos_lo: word_pos as u64,
        }
    }

    /// Uniform draw in [0, 1)
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Standard normal draw (Box-Muller, one value per call)
    pub fn normal(&mut self) -> f64 {
        let u1 = 1.0 - self.uniform(); // (0, 1]
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn normal_with(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.normal()
    }

    /// exp(N(mu, sigma))
    pub fn log_normal(&mut self, mu: f64, sigma: f64) -> f64 {
        self.normal_with(mu, sigma).exp()
    }

    /// Inclusive die roll
    pub fn die_roll(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform index into a collection of `len` items
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }

    /// Number of successes in `n` trials of probability `p`
    pub fn binomial(&mut self, n: u64, p: f64) -> u64 {
        if n == 0 || !(p > 0.0) {
            return 0;
        }
        if p >= 1.0 {
            return n;
        }
        if p > 0.5 {
            return n - self.binomial(n, 1.0 - p);
        }
        if n <= DIRECT_BINOMIAL_LIMIT {
            return (0..n).filter(|_| self.uniform() < p).count() as u64;
        }

        let mean = n as f64 * p;
        let variance = mean * (1.0 - p);
        if variance >= NORMAL_APPROX_VARIANCE {
            let draw = self.normal_with(mean, variance.sqrt()).round();
            return draw.clamp(0.0, n as f64) as u64;
        }

        // Small mean: skip between successes with geometric waiting times
        let log_q = (1.0 - p).ln();
        let mut successes = 0u64;
        let mut position = 0u64;
        loop {
            let u = 1.0 - self.uniform();
            let skip = (u.ln() / log_q).floor();
            if !skip.is_finite() {
                break;
            }
            position = position.saturating_add(skip as u64 + 1);
            if position > n {
                break;
            }
            successes += 1;
        }
        successes
    }
}
