//! Injected randomness for samplers
//!
//! Samplers never touch a global generator. Everything draws from a
//! [`UniformRng`] handed in by the caller, so a fixed seed replays a backtest
//! bit for bit.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform `[0, 1)` source
pub trait UniformRng {
    /// Next draw in `[0, 1)`
    fn next_f64(&mut self) -> f64;
}

impl<R: UniformRng + ?Sized> UniformRng for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Seeded ChaCha8 generator; stable across platforms
#[derive(Debug, Clone)]
pub struct SeededRng {
    inner: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl UniformRng for SeededRng {
    fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Replays a fixed list of draws, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceRng {
    values: Vec<f64>,
    pos: usize,
}

impl SequenceRng {
    /// Values are clamped into `[0, 1)`; an empty list always yields 0
    pub fn new(values: Vec<f64>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { values, pos: 0 }
    }
}

impl UniformRng for SequenceRng {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v
    }
}

/// Bernoulli trial
pub(crate) fn bernoulli<R: UniformRng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.next_f64() < probability
}

/// Approximate inverse standard-normal CDF (Tukey lambda fit)
pub(crate) fn inverse_normal(u: f64) -> f64 {
    4.91 * (u.powf(0.14) - (1.0 - u).powf(0.14))
}

pub(crate) fn standard_normal<R: UniformRng + ?Sized>(rng: &mut R) -> f64 {
    inverse_normal(rng.next_f64())
}

/// Gamma(shape, 1) by Marsaglia-Tsang
pub(crate) fn gamma<R: UniformRng + ?Sized>(rng: &mut R, shape: f64) -> f64 {
    const MAX_ROUNDS: usize = 256;

    if shape < 1.0 {
        // Boost: Gamma(a) = Gamma(a + 1) * U^(1/a)
        let u = rng.next_f64();
        return gamma(rng, shape + 1.0) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    for _ in 0..MAX_ROUNDS {
        let x = standard_normal(rng);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u = rng.next_f64();
        if u.ln() < 0.5 * x * x + d - d * v + d * v.ln() {
            return d * v;
        }
    }
    d
}

/// Beta(alpha, beta) as a ratio of gammas
pub(crate) fn beta<R: UniformRng + ?Sized>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
    let x = gamma(rng, alpha);
    let y = gamma(rng, beta);
    if x + y <= 0.0 {
        return alpha / (alpha + beta);
    }
    x / (x + y)
}

/// Triangular on `[low, high]` with mode `mode`
pub(crate) fn triangular<R: UniformRng + ?Sized>(rng: &mut R, low: f64, mode: f64, high: f64) -> f64 {
    if high <= low {
        return low;
    }
    let u = rng.next_f64();
    let split = (mode - low) / (high - low);
    if u < split {
        low + (u * (high - low) * (mode - low)).sqrt()
    } else {
        high - ((1.0 - u) * (high - low) * (high - mode)).sqrt()
    }
}
