//! Injectable randomness for the reading generator.
//!
//! Every random draw the generator makes goes through [`RandomSource`], so a
//! session can be made fully deterministic by handing it a
//! [`SeededRandom`], a [`ConstantRandom`], or a [`ScriptedRandom`].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random doubles.
pub trait RandomSource: Send {
    /// Draw a value uniformly from `[low, high]`.
    ///
    /// Implementations must return a value inside the range; callers pass
    /// `low <= high`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        (**self).uniform(low, high)
    }
}

/// Pseudo-random source backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Create a reproducible source from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        if low == high {
            return low;
        }
        self.rng.random_range(low..=high)
    }
}

/// Returns the same value for every draw, clamped into the requested range.
///
/// `ConstantRandom::new(0.0)` removes all noise from the generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRandom {
    value: f64,
}

impl ConstantRandom {
    /// Create a constant source.
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// A source that always draws zero.
    pub fn zero() -> Self {
        Self::new(0.0)
    }
}

impl RandomSource for ConstantRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.value.clamp(low.min(high), high.max(low))
    }
}

/// Replays a fixed sequence of draws, then repeats a fallback value.
///
/// Each scripted value is clamped into the range of the draw that consumes it.
///
/// ```
/// use cgm_core::random::{RandomSource, ScriptedRandom};
///
/// let mut rng = ScriptedRandom::new([8.0, -7.0]);
/// assert_eq!(rng.uniform(-10.0, 10.0), 8.0);
/// assert_eq!(rng.uniform(-10.0, 10.0), -7.0);
/// assert_eq!(rng.uniform(-10.0, 10.0), 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    /// Create a scripted source with a fallback of zero.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback: 0.0,
        }
    }

    /// Set the value returned once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Append more draws to the end of the script.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
    }

    /// Number of scripted draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let value = self.values.pop_front().unwrap_or(self.fallback);
        value.clamp(low.min(high), high.max(low))
    }
}
