//! Random sources for no-change perturbation

use crate::options::RandomBoostRange;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed reals
///
/// Pluggable so sequence generation can be replayed deterministically.
pub trait RandomSource {
    /// Uniform value in `[low, high]`
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// [`RandomSource`] backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// Freshly seeded from the OS
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Reproducible stream
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low.is_nan() || high.is_nan() || high <= low {
            return low;
        }
        self.0.gen_range(low..=high)
    }
}

impl RandomBoostRange {
    /// Random pulse width offset for a sample in a bucket `range` percent wide
    ///
    /// `falling` is whether the amplitude dropped since the previous sample.
    /// A non-finite `range` yields NaN without drawing from `rng`.
    pub fn perturb<R: RandomSource + ?Sized>(&self, range: f64, falling: bool, rng: &mut R) -> f64 {
        if !range.is_finite() {
            return f64::NAN;
        }
        match self {
            RandomBoostRange::ZeroToPositive => rng.uniform(0.0, range),
            RandomBoostRange::ZeroToNegative => -rng.uniform(0.0, range),
            RandomBoostRange::ByDirection => {
                let boost = rng.uniform(0.0, range);
                if falling {
                    -boost
                } else {
                    boost
                }
            }
            // Kept as-is: this lands in [-range, -range/2], not centred on zero
            RandomBoostRange::HalfRange => rng.uniform(0.0, range) / 2.0 - range,
            RandomBoostRange::FullRange => rng.uniform(0.0, 2.0 * range).round() - range,
        }
    }
}
