//! # Value generators.
//!
//! A [`Source`](crate::Source) asks its [`Generate`] implementation for one
//! value per production cycle. [`RandomGenerator`] draws uniformly from an
//! inclusive range; any `Fn() -> i64` closure is a generator too, which keeps
//! tests deterministic.

use std::ops::RangeInclusive;

use rand::Rng;

/// Opaque, infallible value source.
pub trait Generate: Send + Sync + 'static {
    /// Produces the next value.
    fn next_value(&self) -> i64;
}

impl<F> Generate for F
where
    F: Fn() -> i64 + Send + Sync + 'static,
{
    fn next_value(&self) -> i64 {
        self()
    }
}

/// Uniform random values in an inclusive range.
#[derive(Clone, Debug)]
pub struct RandomGenerator {
    range: RangeInclusive<i64>,
}

impl RandomGenerator {
    /// Creates a generator over `range`.
    pub fn new(range: RangeInclusive<i64>) -> Self {
        Self { range }
    }
}

impl Default for RandomGenerator {
    /// Values in `1..=100`.
    fn default() -> Self {
        Self::new(1..=100)
    }
}

impl Generate for RandomGenerator {
    fn next_value(&self) -> i64 {
        if self.range.is_empty() {
            return *self.range.start();
        }
        rand::rng().random_range(self.range.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_values_stay_in_range() {
        let g = RandomGenerator::new(5..=7);
        for _ in 0..200 {
            let v = g.next_value();
            assert!((5..=7).contains(&v), "{v} out of range");
        }
    }

    #[test]
    fn closures_are_generators() {
        let g = || 42_i64;
        assert_eq!(g.next_value(), 42);
    }
}
