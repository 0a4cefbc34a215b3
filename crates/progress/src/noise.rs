//! Interval jitter sources.
//!
//! The scheduler multiplies each new interval by `1 + u`, with `u` drawn from
//! a [`NoiseSource`], so topics reviewed together drift apart instead of
//! coming due on the same instant forever.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of interval jitter.
pub trait NoiseSource: Send {
    /// Draw `u` from `[-fraction, fraction]`.
    fn sample(&mut self, fraction: f64) -> f64;
}

/// Uniform jitter from a seedable ChaCha generator.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: ChaCha8Rng,
}

impl SeededNoise {
    /// Deterministic jitter from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Jitter seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self { rng: ChaCha8Rng::from_entropy() }
    }
}

impl Default for SeededNoise {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl NoiseSource for SeededNoise {
    fn sample(&mut self, fraction: f64) -> f64 {
        if fraction <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-fraction..=fraction)
    }
}

/// No jitter at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn sample(&mut self, _fraction: f64) -> f64 {
        0.0
    }
}

/// Always the same offset, clamped into `[-fraction, fraction]`.
#[derive(Debug, Clone, Copy)]
pub struct ConstantNoise(pub f64);

impl NoiseSource for ConstantNoise {
    fn sample(&mut self, fraction: f64) -> f64 {
        let bound = fraction.abs();
        self.0.clamp(-bound, bound)
    }
}
