//! Standard normal sampling for the asset multiplier.

use rand::Rng;
use std::f64::consts::PI;

/// Lower bound for the first uniform sample, so `ln(u1)` stays finite.
const MIN_UNIFORM: f64 = 1e-12;

/// Source of standard normal samples `Z ~ N(0, 1)`.
pub trait NormalGenerator: Send + Sync {
    fn next_z(&self) -> f64;
}

/// Box–Muller sampler over the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoxMullerGenerator;

impl NormalGenerator for BoxMullerGenerator {
    fn next_z(&self) -> f64 {
        let mut rng = rand::thread_rng();
        let mut u1: f64 = rng.gen();
        while u1 <= MIN_UNIFORM {
            u1 = rng.gen();
        }
        let u2: f64 = rng.gen();
        box_muller(u1, u2)
    }
}

/// Generator that always returns the same sample.
#[derive(Debug, Clone, Copy)]
pub struct FixedNormal(pub f64);

impl NormalGenerator for FixedNormal {
    fn next_z(&self) -> f64 {
        self.0
    }
}

/// `Z = sqrt(-2 ln u1) * cos(2π u2)` for `u1, u2` in (0, 1).
fn box_muller(u1: f64, u2: f64) -> f64 {
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
