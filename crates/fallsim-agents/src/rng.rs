//! Seeded random sampling for the simulation.
//!
//! Wraps a [`SmallRng`] seeded from configuration so that runs are
//! reproducible. Gaussian samples use the Box-Muller transform and Poisson
//! samples use Knuth's product method (with a normal approximation for
//! large means), avoiding a distribution-crate dependency.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Standard deviation of the jitter applied to every stochastic attribute
/// update.
pub const JITTER_SD: f64 = 0.05;

/// Means above this use the normal approximation for Poisson sampling;
/// Knuth's product method underflows beyond it.
const POISSON_NORMAL_CUTOFF: f64 = 30.0;

/// Floor a value at zero. Agent attributes never go negative.
pub fn positive(value: f64) -> f64 {
    value.max(0.0)
}

/// Deterministic random source for a simulation run.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: SmallRng,
    /// Cached second Box-Muller sample.
    spare: Option<f64>,
}

impl SimRng {
    /// Create a generator from a fixed seed.
    pub fn seed_from(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Uniform sample in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Uniform index in `[0, n)`. Returns `None` for `n == 0`.
    pub fn index(&mut self, n: usize) -> Option<usize> {
        if n == 0 {
            None
        } else {
            Some(self.inner.random_range(0..n))
        }
    }

    /// Gaussian sample via the Box-Muller transform.
    pub fn gaussian(&mut self, mean: f64, sd: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return sd.mul_add(z, mean);
        }
        // u1 must be strictly positive for the logarithm.
        let mut u1 = self.inner.random::<f64>();
        while u1 <= f64::MIN_POSITIVE {
            u1 = self.inner.random::<f64>();
        }
        let u2 = self.inner.random::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * PI * u2;
        self.spare = Some(radius * angle.sin());
        sd.mul_add(radius * angle.cos(), mean)
    }

    /// Gaussian perturbation around a configured mean with the standard
    /// jitter width.
    pub fn jitter(&mut self, mean: f64) -> f64 {
        self.gaussian(mean, JITTER_SD)
    }

    /// Poisson sample with the given mean.
    ///
    /// Knuth's product method for small means; a rounded normal
    /// approximation above [`POISSON_NORMAL_CUTOFF`].
    pub fn poisson(&mut self, mean: f64) -> u64 {
        if mean <= 0.0 {
            return 0;
        }
        if mean > POISSON_NORMAL_CUTOFF {
            let sample = self.gaussian(mean, mean.sqrt()).round();
            if sample <= 0.0 {
                return 0;
            }
            if sample >= 9_007_199_254_740_992.0 {
                return u64::MAX;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return sample as u64;
        }
        let limit = (-mean).exp();
        let mut count: u64 = 0;
        let mut product = self.inner.random::<f64>();
        while product > limit {
            count = count.saturating_add(1);
            product *= self.inner.random::<f64>();
        }
        count
    }

    /// Weighted random index over the given weights.
    ///
    /// Negative weights count as zero. If every weight is non-positive the
    /// draw falls back to uniform. Returns `None` for an empty slice.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().map(|w| positive(*w)).sum();
        if total <= 0.0 {
            return self.index(weights.len());
        }
        let mut remaining = self.inner.random::<f64>() * total;
        for (i, weight) in weights.iter().enumerate() {
            remaining -= positive(*weight);
            if remaining < 0.0 {
                return Some(i);
            }
        }
        // Floating-point slack: the draw landed exactly on the total.
        Some(weights.len().saturating_sub(1))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seeded_runs_are_reproducible() {
        let mut a = SimRng::seed_from(7);
        let mut b = SimRng::seed_from(7);
        for _ in 0..32 {
            assert!((a.uniform() - b.uniform()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn gaussian_centers_on_mean() {
        let mut rng = SimRng::seed_from(11);
        let n = 20_000;
        let sum: f64 = (0..n).map(|_| rng.gaussian(0.8, 0.05)).sum();
        let mean = sum / f64::from(n);
        assert!((mean - 0.8).abs() < 0.005, "sample mean was {mean}");
    }

    #[test]
    fn poisson_mean_tracks_parameter() {
        let mut rng = SimRng::seed_from(13);
        let n: u32 = 20_000;
        let total: u64 = (0..n).map(|_| rng.poisson(3.0)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total as f64 / f64::from(n);
        assert!((mean - 3.0).abs() < 0.1, "sample mean was {mean}");
    }

    #[test]
    fn poisson_zero_mean_is_zero() {
        let mut rng = SimRng::seed_from(17);
        assert_eq!(rng.poisson(0.0), 0);
        assert_eq!(rng.poisson(-1.0), 0);
    }

    #[test]
    fn weighted_pick_prefers_heavy_weight() {
        let mut rng = SimRng::seed_from(19);
        let weights = [100.0, 1.0, 1.0, 1.0];
        let mut heavy = 0_u32;
        let draws = 2_000;
        for _ in 0..draws {
            if rng.pick_weighted(&weights) == Some(0) {
                heavy = heavy.saturating_add(1);
            }
        }
        // Expected share is 100/103; allow generous slack.
        assert!(heavy > 1_800, "heavy option drawn {heavy}/{draws} times");
    }

    #[test]
    fn weighted_pick_uniform_fallback() {
        let mut rng = SimRng::seed_from(23);
        let weights = [0.0, 0.0, 0.0];
        let mut seen = [false; 3];
        for _ in 0..200 {
            if let Some(i) = rng.pick_weighted(&weights) {
                if let Some(slot) = seen.get_mut(i) {
                    *slot = true;
                }
            }
        }
        assert_eq!(seen, [true, true, true]);
    }
}
